use labqc_sql::SQLStore;

use super::LabError;

/// Create lab tables if they don't exist.
///
/// Records live in the JSON `data` column; the other columns are
/// indexes for filtering and sorting.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), LabError> {
    sql.exec_batch(
        "CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            code TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT,
            updated_at TEXT
        );
        CREATE TABLE IF NOT EXISTS batches (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            reference_no TEXT UNIQUE NOT NULL,
            product_id TEXT NOT NULL,
            is_hold INTEGER NOT NULL DEFAULT 0,
            complete INTEGER NOT NULL DEFAULT 0,
            hold_at TEXT,
            edited_at TEXT,
            released_at TEXT,
            created_at TEXT,
            updated_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_batches_product ON batches(product_id);
        CREATE INDEX IF NOT EXISTS idx_batches_hold ON batches(is_hold);
        CREATE TABLE IF NOT EXISTS certificates (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            batch_id TEXT NOT NULL,
            reference_no TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT,
            updated_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_certificates_batch ON certificates(batch_id);",
    )
    .map_err(|e| LabError::Storage(e.to_string()))
}
