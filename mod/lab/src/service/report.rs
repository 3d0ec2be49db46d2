use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use labqc_sql::Value;

use crate::model::{MeasurementKey, TestBatch};
use super::{LabError, LabService};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub product_id: String,
    /// Inclusive RFC 3339 bounds on batch creation time.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Aggregates for one measurement over eligible batches.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatistics {
    pub product_id: String,
    /// Batches considered: all stations reported and not on hold.
    pub batch_count: usize,
    pub properties: BTreeMap<MeasurementKey, PropertyStats>,
}

impl LabService {
    /// Aggregate measured values per property over eligible batches.
    /// Eligibility is evaluated at query time: complete and not held.
    pub fn batch_statistics(&self, query: &StatsQuery) -> Result<BatchStatistics, LabError> {
        // Product must exist, even if it has no eligible batches yet.
        self.get_product(&query.product_id)?;

        let mut sql = String::from(
            "SELECT data FROM batches
             WHERE product_id = ?1 AND complete = 1 AND is_hold = 0",
        );
        let mut params = vec![Value::Text(query.product_id.clone())];
        if let Some(from) = &query.from {
            params.push(Value::Text(from.clone()));
            sql.push_str(&format!(" AND created_at >= ?{}", params.len()));
        }
        if let Some(to) = &query.to {
            params.push(Value::Text(to.clone()));
            sql.push_str(&format!(" AND created_at <= ?{}", params.len()));
        }

        let batches: Vec<TestBatch> = self.query_records(&sql, &params)?;
        let batch_count = batches.len();

        let mut samples: BTreeMap<MeasurementKey, Vec<f64>> = BTreeMap::new();
        for batch in &batches {
            for (key, raw) in batch.all_values() {
                if let Ok(v) = raw.trim().parse::<f64>() {
                    samples.entry(key).or_default().push(v);
                }
            }
        }

        let properties = samples
            .into_iter()
            .map(|(key, values)| {
                let count = values.len();
                let sum: f64 = values.iter().sum();
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (
                    key,
                    PropertyStats {
                        count,
                        mean: sum / count as f64,
                        min,
                        max,
                    },
                )
            })
            .collect();

        Ok(BatchStatistics {
            product_id: query.product_id.clone(),
            batch_count,
            properties,
        })
    }
}
