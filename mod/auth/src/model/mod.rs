pub mod permission;
pub mod session;
pub mod user;

pub use permission::{
    Action, LegacyPageActions, LegacyPermissions, Page, PageActions, PermissionMatrix,
    PermissionRecord, Role, LANDING_PRIORITY, migrate_legacy, resolve_permissions,
};
pub use session::{Claims, Session, TokenPair};
pub use user::{CreateUser, CurrentUser, User};
