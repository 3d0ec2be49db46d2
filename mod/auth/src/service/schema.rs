use labqc_sql::SQLStore;

use super::AuthError;

/// Create auth tables if they don't exist.
///
/// Records live in the JSON `data` column; the other columns are
/// indexes for filtering and sorting.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), AuthError> {
    sql.exec_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            username TEXT UNIQUE NOT NULL,
            role TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT,
            updated_at TEXT
        );
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            user_id TEXT NOT NULL,
            revoked INTEGER NOT NULL DEFAULT 0,
            issued_at TEXT,
            expires_at TEXT,
            created_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);",
    )
    .map_err(|e| AuthError::Storage(e.to_string()))
}
