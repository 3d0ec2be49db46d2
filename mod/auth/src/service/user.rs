use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use tracing::{info, warn};

use labqc_core::{ListParams, ListResult, merge_patch, new_id, now_rfc3339};
use labqc_sql::Value;

use crate::model::{CreateUser, PermissionRecord, User};
use crate::service::{AuthError, AuthService};

/// Hash a password with argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

impl AuthService {
    /// Create a new user. The password is hashed before storage.
    pub fn create_user(&self, input: CreateUser) -> Result<User, AuthError> {
        if input.username.trim().is_empty() {
            return Err(AuthError::Validation("username must not be empty".into()));
        }
        if input.password.len() < 8 {
            return Err(AuthError::Validation(
                "password must be at least 8 characters".into(),
            ));
        }
        for station in &input.machine_access {
            if !matches!(station.as_str(), "G1" | "G2" | "G3") {
                return Err(AuthError::Validation(format!(
                    "unknown station '{}' in machineAccess",
                    station
                )));
            }
        }

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            username: input.username.clone(),
            name: input.name,
            email: input.email,
            password_hash: hash_password(&input.password)?,
            role: input.role,
            permissions: input.permissions,
            machine_access: input.machine_access,
            active: true,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let role_str = role_wire_name(&user)?;
        self.insert_record(
            "users",
            &user.id,
            &StoredUser::from(&user),
            &[
                ("username", Value::Text(user.username.clone())),
                ("role", Value::Text(role_str)),
                ("active", Value::Integer(1)),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )?;

        info!(username = %user.username, role = ?user.role, "user created");
        Ok(user)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: &str) -> Result<User, AuthError> {
        let stored: StoredUser = self.get_record("users", id)?;
        Ok(stored.into_user())
    }

    /// Find a user by login name.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM users WHERE username = ?1",
                &[Value::Text(username.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        match rows.first().and_then(|r| r.get_str("data")) {
            Some(data) => {
                let stored: StoredUser = serde_json::from_str(data)
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
                Ok(Some(stored.into_user()))
            }
            None => Ok(None),
        }
    }

    /// List users with pagination.
    pub fn list_users(&self, params: &ListParams) -> Result<ListResult<User>, AuthError> {
        let (items, total): (Vec<StoredUser>, usize) =
            self.list_records("users", &[], params.limit.min(500), params.offset)?;
        Ok(ListResult {
            items: items.into_iter().map(StoredUser::into_user).collect(),
            total,
        })
    }

    /// Update a user with JSON merge-patch semantics.
    ///
    /// `id`, `createdAt` and the password hash cannot be patched;
    /// passwords change through [`AuthService::set_password`].
    pub fn update_user(&self, id: &str, patch: serde_json::Value) -> Result<User, AuthError> {
        let current = self.get_user(id)?;
        let now = now_rfc3339();

        let mut base = serde_json::to_value(StoredUser::from(&current))
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("createdAt");
            obj.remove("passwordHash");
            obj.remove("password");
        }
        merge_patch(&mut base, &patch);
        base["id"] = serde_json::json!(current.id);
        base["createdAt"] = serde_json::json!(current.created_at);
        base["updatedAt"] = serde_json::json!(now);
        base["passwordHash"] = serde_json::json!(current.password_hash);

        let stored: StoredUser =
            serde_json::from_value(base).map_err(|e| AuthError::Validation(e.to_string()))?;
        let updated = stored.into_user();

        let role_str = role_wire_name(&updated)?;
        self.update_record(
            "users",
            id,
            &StoredUser::from(&updated),
            &[
                ("username", Value::Text(updated.username.clone())),
                ("role", Value::Text(role_str)),
                (
                    "active",
                    Value::Integer(if updated.active { 1 } else { 0 }),
                ),
                ("updated_at", Value::Text(now)),
            ],
        )?;

        Ok(updated)
    }

    /// Replace a user's permission override record (or clear it).
    pub fn set_user_permissions(
        &self,
        id: &str,
        record: Option<PermissionRecord>,
    ) -> Result<User, AuthError> {
        let mut user = self.get_user(id)?;
        user.permissions = record;
        user.updated_at = now_rfc3339();
        self.update_record(
            "users",
            id,
            &StoredUser::from(&user),
            &[("updated_at", Value::Text(user.updated_at.clone()))],
        )?;
        Ok(user)
    }

    /// Change a user's password.
    pub fn set_password(&self, id: &str, password: &str) -> Result<(), AuthError> {
        if password.len() < 8 {
            return Err(AuthError::Validation(
                "password must be at least 8 characters".into(),
            ));
        }
        let mut user = self.get_user(id)?;
        user.password_hash = hash_password(password)?;
        user.updated_at = now_rfc3339();
        self.update_record(
            "users",
            id,
            &StoredUser::from(&user),
            &[("updated_at", Value::Text(user.updated_at.clone()))],
        )
    }

    /// Delete a user and their sessions.
    pub fn delete_user(&self, id: &str) -> Result<(), AuthError> {
        self.sql
            .exec(
                "DELETE FROM sessions WHERE user_id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.delete_record("users", id)
    }

    /// Verify login credentials. Returns the user on success.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .find_user_by_username(username)?
            .ok_or_else(|| AuthError::Unauthorized("invalid credentials".into()))?;

        if !user.active {
            return Err(AuthError::Unauthorized("account is disabled".into()));
        }
        if !verify_password(password, &user.password_hash) {
            warn!(username, "failed login attempt");
            return Err(AuthError::Unauthorized("invalid credentials".into()));
        }
        Ok(user)
    }
}

fn role_wire_name(user: &User) -> Result<String, AuthError> {
    serde_json::to_value(user.role)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .ok_or_else(|| AuthError::Internal("role serialization failed".into()))
}

/// Storage shape of a user — identical to [`User`] except the password
/// hash is persisted (the API shape skips it).
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredUser {
    pub id: String,
    pub username: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub password_hash: String,
    pub role: crate::model::Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionRecord>,
    #[serde(default)]
    pub machine_access: std::collections::BTreeSet<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

impl From<&User> for StoredUser {
    fn from(u: &User) -> Self {
        StoredUser {
            id: u.id.clone(),
            username: u.username.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            password_hash: u.password_hash.clone(),
            role: u.role,
            permissions: u.permissions.clone(),
            machine_access: u.machine_access.clone(),
            active: u.active,
            created_at: u.created_at.clone(),
            updated_at: u.updated_at.clone(),
        }
    }
}

impl StoredUser {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            permissions: self.permissions,
            machine_access: self.machine_access,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::service::AuthConfig;
    use labqc_sql::sqlite::SqliteStore;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn test_service() -> Arc<AuthService> {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        AuthService::new(sql, AuthConfig::default()).unwrap()
    }

    fn operator_input() -> CreateUser {
        CreateUser {
            username: "op1".into(),
            name: "Operator One".into(),
            email: None,
            password: "secret-pass".into(),
            role: Role::MachineOperator,
            permissions: None,
            machine_access: BTreeSet::from(["G1".to_string()]),
        }
    }

    #[test]
    fn test_user_crud() {
        let svc = test_service();

        let user = svc.create_user(operator_input()).unwrap();
        assert_eq!(user.username, "op1");
        assert!(user.active);
        assert!(user.password_hash.starts_with("$argon2"));

        let fetched = svc.get_user(&user.id).unwrap();
        assert_eq!(fetched.role, Role::MachineOperator);
        assert_eq!(fetched.password_hash, user.password_hash);

        let updated = svc
            .update_user(&user.id, serde_json::json!({"name": "Operator 1"}))
            .unwrap();
        assert_eq!(updated.name, "Operator 1");
        assert_eq!(updated.id, user.id);
        // Password hash survives patching.
        assert_eq!(updated.password_hash, user.password_hash);

        let list = svc.list_users(&ListParams::default()).unwrap();
        assert_eq!(list.total, 1);

        svc.delete_user(&user.id).unwrap();
        assert!(svc.get_user(&user.id).is_err());
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let svc = test_service();
        svc.create_user(operator_input()).unwrap();
        let err = svc.create_user(operator_input()).unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[test]
    fn test_unknown_station_rejected() {
        let svc = test_service();
        let mut input = operator_input();
        input.machine_access = BTreeSet::from(["G9".to_string()]);
        assert!(matches!(
            svc.create_user(input),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_authenticate() {
        let svc = test_service();
        let user = svc.create_user(operator_input()).unwrap();

        let ok = svc.authenticate("op1", "secret-pass").unwrap();
        assert_eq!(ok.id, user.id);

        assert!(matches!(
            svc.authenticate("op1", "wrong"),
            Err(AuthError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.authenticate("nobody", "secret-pass"),
            Err(AuthError::Unauthorized(_))
        ));

        // Disabled accounts cannot log in.
        svc.update_user(&user.id, serde_json::json!({"active": false}))
            .unwrap();
        assert!(matches!(
            svc.authenticate("op1", "secret-pass"),
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_set_password() {
        let svc = test_service();
        let user = svc.create_user(operator_input()).unwrap();
        svc.set_password(&user.id, "new-password").unwrap();
        assert!(svc.authenticate("op1", "new-password").is_ok());
        assert!(svc.authenticate("op1", "secret-pass").is_err());
    }

    #[test]
    fn test_set_permissions_override() {
        use crate::model::{PermissionMatrix, PermissionRecord};

        let svc = test_service();
        let user = svc.create_user(operator_input()).unwrap();

        let mut matrix = PermissionMatrix::deny_all();
        matrix.hold_management.can_view = true;
        matrix.hold_management.can_edit = true;
        let updated = svc
            .set_user_permissions(&user.id, Some(PermissionRecord::V2(matrix.clone())))
            .unwrap();
        assert_eq!(updated.effective_permissions(), matrix);

        // Clearing the override falls back to the role grid.
        let cleared = svc.set_user_permissions(&user.id, None).unwrap();
        assert_eq!(
            cleared.effective_permissions(),
            Role::MachineOperator.default_permissions()
        );
    }
}
