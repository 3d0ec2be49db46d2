use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use labqc_auth::service::AuthConfig;
use labqc_core::ServiceConfig;

/// Daemon configuration, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub listen: Option<String>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub jwt: JwtConfig,

    /// First-boot admin account. Ignored once the user exists.
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    #[serde(default)]
    pub kv_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub access_token_ttl: Option<i64>,
    #[serde(default)]
    pub refresh_token_ttl: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_password: String,
}

impl DaemonConfig {
    /// Load from `path`. A missing file yields defaults so a bare
    /// `labqcd` run works out of the box.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            data_dir: self.storage.data_dir.clone(),
            sqlite_path: self.storage.sqlite_path.clone(),
            kv_path: self.storage.kv_path.clone(),
            listen: self
                .listen
                .clone()
                .unwrap_or_else(|| ServiceConfig::default().listen),
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        let defaults = AuthConfig::default();
        AuthConfig {
            jwt_secret: self.jwt.secret.clone().unwrap_or(defaults.jwt_secret),
            access_token_ttl: self.jwt.access_token_ttl.unwrap_or(defaults.access_token_ttl),
            refresh_token_ttl: self
                .jwt
                .refresh_token_ttl
                .unwrap_or(defaults.refresh_token_ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let cfg: DaemonConfig = toml::from_str(
            r#"
            listen = "127.0.0.1:9000"

            [storage]
            data_dir = "/var/lib/labqc"

            [jwt]
            secret = "super-secret"
            access_token_ttl = 3600

            [bootstrap]
            admin_username = "admin"
            admin_password = "first-boot-pass"
            "#,
        )
        .unwrap();

        let svc = cfg.service_config();
        assert_eq!(svc.listen, "127.0.0.1:9000");
        assert_eq!(
            svc.resolve_sqlite_path(),
            PathBuf::from("/var/lib/labqc/data.sqlite")
        );

        let auth = cfg.auth_config();
        assert_eq!(auth.jwt_secret, "super-secret");
        assert_eq!(auth.access_token_ttl, 3600);
        // Unset fields fall back to defaults.
        assert_eq!(auth.refresh_token_ttl, AuthConfig::default().refresh_token_ttl);

        assert_eq!(cfg.bootstrap.unwrap().admin_username, "admin");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.service_config().listen, "0.0.0.0:8080");
        assert!(cfg.bootstrap.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = DaemonConfig::load(Path::new("/nonexistent/labqcd.toml")).unwrap();
        assert!(cfg.listen.is_none());
    }
}
