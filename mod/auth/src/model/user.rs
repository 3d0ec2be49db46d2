use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use labqc_core::ServiceError;

use super::permission::{
    Action, Page, PermissionMatrix, PermissionRecord, Role, resolve_permissions,
};

/// A lab user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Login name (unique).
    pub username: String,

    /// Display name.
    pub name: String,

    /// Email address (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Argon2id password hash. Never exposed through the API.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub password_hash: String,

    /// Role the default permission grid derives from.
    pub role: Role,

    /// Optional per-user override; takes precedence over the role grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionRecord>,

    /// Test stations this user may submit measurements for ("G1".."G3").
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub machine_access: BTreeSet<String>,

    /// Whether the account is active.
    #[serde(default = "default_true")]
    pub active: bool,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

impl User {
    /// Effective permission matrix: override record first, role default
    /// otherwise.
    pub fn effective_permissions(&self) -> PermissionMatrix {
        resolve_permissions(self.permissions.as_ref(), self.role)
    }
}

/// Input for creating a new user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Option<PermissionRecord>,
    #[serde(default)]
    pub machine_access: BTreeSet<String>,
}

fn default_true() -> bool {
    true
}

/// The authenticated caller, as resolved by the server middleware:
/// identity plus the effective permission matrix and station access.
/// Business services check this before every mutating operation.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub matrix: PermissionMatrix,
    pub machine_access: BTreeSet<String>,
}

impl CurrentUser {
    /// Build the resolved caller view from a stored user.
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            matrix: user.effective_permissions(),
            machine_access: user.machine_access.clone(),
        }
    }

    /// Deny with PermissionDenied unless the resolved matrix grants
    /// `action` on `page`. Called before any mutating operation.
    pub fn require(&self, page: Page, action: Action) -> Result<(), ServiceError> {
        if self.matrix.allows(page, action) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "user {} may not {} on {}",
                self.id,
                action.as_str(),
                page.as_str(),
            )))
        }
    }

    /// Deny unless the user may submit measurements for `station`.
    pub fn require_station(&self, station: &str) -> Result<(), ServiceError> {
        if self.machine_access.contains(station) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "user {} has no access to station {}",
                self.id, station,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_never_serialized() {
        let user = User {
            id: "u1".into(),
            username: "op1".into(),
            name: "Operator One".into(),
            email: None,
            password_hash: "$argon2id$secret".into(),
            role: Role::MachineOperator,
            permissions: None,
            machine_access: BTreeSet::from(["G1".to_string()]),
            active: true,
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("\"machineAccess\":[\"G1\"]"));
    }

    #[test]
    fn effective_permissions_fall_back_to_role() {
        let user = User {
            id: "u1".into(),
            username: "viewer".into(),
            name: "Viewer".into(),
            email: None,
            password_hash: String::new(),
            role: Role::ViewOnly,
            permissions: None,
            machine_access: BTreeSet::new(),
            active: true,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(user.effective_permissions(), Role::ViewOnly.default_permissions());
    }
}
