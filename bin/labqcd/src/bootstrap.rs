use std::collections::BTreeSet;

use tracing::info;

use labqc_auth::model::{CreateUser, Role};
use labqc_auth::service::AuthService;

use crate::config::BootstrapConfig;

/// Create the first admin account if it does not exist yet. The configured
/// password is only consulted on creation.
pub fn ensure_admin(auth: &AuthService, cfg: &BootstrapConfig) -> anyhow::Result<()> {
    if auth.find_user_by_username(&cfg.admin_username)?.is_some() {
        info!(username = %cfg.admin_username, "bootstrap admin already exists");
        return Ok(());
    }
    let user = auth.create_user(CreateUser {
        username: cfg.admin_username.clone(),
        name: cfg.admin_username.clone(),
        email: None,
        password: cfg.admin_password.clone(),
        role: Role::FullAdmin,
        permissions: None,
        machine_access: BTreeSet::from([
            "G1".to_string(),
            "G2".to_string(),
            "G3".to_string(),
        ]),
    })?;
    info!(username = %user.username, "bootstrap admin created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use labqc_auth::service::{AuthConfig, AuthService};
    use labqc_sql::sqlite::SqliteStore;

    use super::*;

    fn service() -> Arc<AuthService> {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        AuthService::new(sql, AuthConfig::default()).unwrap()
    }

    #[test]
    fn creates_admin_once() {
        let auth = service();
        let cfg = BootstrapConfig {
            admin_username: "admin".into(),
            admin_password: "first-boot-pass".into(),
        };

        ensure_admin(&auth, &cfg).unwrap();
        let admin = auth.find_user_by_username("admin").unwrap().unwrap();
        assert_eq!(admin.role, Role::FullAdmin);

        // Second boot is a no-op even with a different password.
        let cfg2 = BootstrapConfig {
            admin_username: "admin".into(),
            admin_password: "changed".into(),
        };
        ensure_admin(&auth, &cfg2).unwrap();
        assert!(auth.authenticate("admin", "first-boot-pass").is_ok());
        assert!(auth.authenticate("admin", "changed").is_err());
    }
}
