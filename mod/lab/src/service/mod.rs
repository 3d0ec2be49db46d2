pub mod batch;
pub mod certificate;
pub mod product;
pub mod report;
pub mod schema;
pub mod settings;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use labqc_kv::KVStore;
use labqc_sql::{SQLStore, Value};

/// Lab service error type.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    /// Specification data missing or unloadable where validation needs it.
    #[error("{0}")]
    SpecMissing(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl From<LabError> for labqc_core::ServiceError {
    fn from(e: LabError) -> Self {
        match e {
            LabError::NotFound(m) => labqc_core::ServiceError::NotFound(m),
            LabError::Conflict(m) => labqc_core::ServiceError::Conflict(m),
            LabError::Validation(m) => labqc_core::ServiceError::Validation(m),
            LabError::SpecMissing(m) => labqc_core::ServiceError::SpecMissing(m),
            LabError::Storage(m) => labqc_core::ServiceError::Storage(m),
            LabError::Internal(m) => labqc_core::ServiceError::Internal(m),
        }
    }
}

/// The Lab service. Holds the SQL backend for records and the KV backend
/// for settings.
pub struct LabService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) kv: Arc<dyn KVStore>,
}

impl LabService {
    /// Create a new LabService, initializing the DB schema.
    pub fn new(sql: Arc<dyn SQLStore>, kv: Arc<dyn KVStore>) -> Result<Arc<Self>, LabError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql, kv }))
    }

    // ── Generic CRUD helpers ──

    /// Insert a record as JSON into a table with indexed columns.
    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), LabError> {
        let json =
            serde_json::to_string(record).map_err(|e| LabError::Internal(e.to_string()))?;

        let mut cols = vec!["id", "data"];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
        let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            let idx = i + 3;
            cols.push(col);
            placeholders.push(format!("?{}", idx));
            params.push(val.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );

        self.sql.exec(&sql, &params).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE constraint") {
                LabError::Conflict(msg)
            } else {
                LabError::Storage(msg)
            }
        })?;

        Ok(())
    }

    /// Get a record by id, deserializing the JSON `data` column.
    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<T, LabError> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1", table);
        let rows = self
            .sql
            .query(&sql, &[Value::Text(id.to_string())])
            .map_err(|e| LabError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| LabError::NotFound(format!("{}/{}", table, id)))?;
        let data = row
            .get_str("data")
            .ok_or_else(|| LabError::Internal("missing data column".into()))?;
        serde_json::from_str(data).map_err(|e| LabError::Internal(e.to_string()))
    }

    /// Update a record's JSON data and indexed columns.
    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), LabError> {
        let json =
            serde_json::to_string(record).map_err(|e| LabError::Internal(e.to_string()))?;

        let mut sets = vec!["data = ?1".to_string()];
        let mut params: Vec<Value> = vec![Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            let idx = i + 2;
            sets.push(format!("{} = ?{}", col, idx));
            params.push(val.clone());
        }

        let id_idx = params.len() + 1;
        params.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            sets.join(", "),
            id_idx,
        );

        let affected = self.sql.exec(&sql, &params).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE constraint") {
                LabError::Conflict(msg)
            } else {
                LabError::Storage(msg)
            }
        })?;

        if affected == 0 {
            return Err(LabError::NotFound(format!("{}/{}", table, id)));
        }

        Ok(())
    }

    /// Delete a record by id.
    pub(crate) fn delete_record(&self, table: &str, id: &str) -> Result<(), LabError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let affected = self
            .sql
            .exec(&sql, &[Value::Text(id.to_string())])
            .map_err(|e| LabError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(LabError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }

    /// List records with optional filters and pagination.
    pub(crate) fn list_records<T: DeserializeOwned + Serialize>(
        &self,
        table: &str,
        filters: &[(&str, Value)],
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<T>, usize), LabError> {
        let mut where_clauses = Vec::new();
        let mut params = Vec::new();

        for (i, (col, val)) in filters.iter().enumerate() {
            let idx = i + 1;
            where_clauses.push(format!("{} = ?{}", col, idx));
            params.push(val.clone());
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        // Count
        let count_sql = format!("SELECT COUNT(*) as cnt FROM {}{}", table, where_sql);
        let count_rows = self
            .sql
            .query(&count_sql, &params)
            .map_err(|e| LabError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        // Items
        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let sql = format!(
            "SELECT data FROM {}{} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            table, where_sql, limit_idx, offset_idx,
        );

        let rows = self
            .sql
            .query(&sql, &params)
            .map_err(|e| LabError::Storage(e.to_string()))?;

        let mut items = Vec::new();
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| LabError::Internal("missing data column".into()))?;
            let item: T =
                serde_json::from_str(data).map_err(|e| LabError::Internal(e.to_string()))?;
            items.push(item);
        }

        Ok((items, total))
    }

    /// Query `data` rows with a raw WHERE/ORDER clause.
    pub(crate) fn query_records<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, LabError> {
        let rows = self
            .sql
            .query(sql, params)
            .map_err(|e| LabError::Storage(e.to_string()))?;
        let mut items = Vec::new();
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| LabError::Internal("missing data column".into()))?;
            let item: T =
                serde_json::from_str(data).map_err(|e| LabError::Internal(e.to_string()))?;
            items.push(item);
        }
        Ok(items)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use labqc_kv::RedbStore;
    use labqc_sql::SqliteStore;

    use super::LabService;

    /// In-memory service for tests. The temp dir must outlive the service.
    pub fn service() -> (Arc<LabService>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        let kv = Arc::new(RedbStore::open(&dir.path().join("kv.redb")).unwrap());
        let svc = LabService::new(sql, kv).unwrap();
        (svc, dir)
    }
}
