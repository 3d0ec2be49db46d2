use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use labqc_core::{ListParams, ListResult, new_id, now_rfc3339};
use labqc_sql::Value;

use crate::hold::{self, EditOutcome};
use crate::model::{
    make_reference_no, MeasurementKey, Product, Station, StationGroup, TestBatch,
};
use super::{LabError, LabService};

/// One station's result entry for a batch. The batch is keyed by
/// product + shift + batch number; the first station to report creates it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStation {
    pub product_id: String,
    pub shift: String,
    pub batch_no: String,
    pub station: Station,
    pub values: BTreeMap<MeasurementKey, String>,
}

/// Batch list filters on top of the common paging params.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFilter {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub is_hold: Option<bool>,
    #[serde(default)]
    pub complete: Option<bool>,
}

/// A batch still waiting on one or more stations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingBatch {
    #[serde(flatten)]
    pub batch: TestBatch,
    pub missing: Vec<Station>,
}

fn batch_indexes(b: &TestBatch) -> Vec<(&'static str, Value)> {
    vec![
        ("reference_no", Value::Text(b.reference_no.clone())),
        ("product_id", Value::Text(b.product_id.clone())),
        ("is_hold", Value::Integer(b.is_hold as i64)),
        ("complete", Value::Integer(b.is_complete() as i64)),
        ("hold_at", opt_text(&b.hold_at)),
        ("edited_at", opt_text(&b.edited_at)),
        ("released_at", opt_text(&b.released_at)),
        (
            "created_at",
            Value::Text(b.created_at.clone().unwrap_or_default()),
        ),
        (
            "updated_at",
            Value::Text(b.updated_at.clone().unwrap_or_default()),
        ),
    ]
}

fn opt_text(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

/// Load the product's specification table, failing loud when there is
/// nothing to validate against.
fn require_specs(product: &Product) -> Result<&[crate::model::ProductSpecification], LabError> {
    if product.specifications.is_empty() {
        return Err(LabError::SpecMissing(format!(
            "product '{}' has no specifications",
            product.code
        )));
    }
    Ok(&product.specifications)
}

impl LabService {
    /// Record one station's results. Creates the batch on first contact,
    /// validates every value present so far, and holds the batch when
    /// anything is out of range.
    pub fn submit_station(&self, req: SubmitStation, actor: &str) -> Result<TestBatch, LabError> {
        if req.shift.trim().is_empty() || req.batch_no.trim().is_empty() {
            return Err(LabError::Validation("shift and batchNo are required".into()));
        }
        for key in req.values.keys() {
            if key.station() != req.station {
                return Err(LabError::Validation(format!(
                    "measurement '{}' does not belong to station {}",
                    key.as_str(),
                    req.station.as_str()
                )));
            }
        }

        let product = self.get_product(&req.product_id)?;
        let specs = require_specs(&product)?;
        let now = now_rfc3339();
        let reference_no = make_reference_no(&product.code, req.shift.trim(), req.batch_no.trim());

        let (mut batch, existing) = match self.find_batch_by_reference(&reference_no) {
            Ok(b) => (b, true),
            Err(LabError::NotFound(_)) => (
                TestBatch {
                    id: new_id(),
                    reference_no: reference_no.clone(),
                    batch_no: req.batch_no.trim().to_string(),
                    shift: req.shift.trim().to_string(),
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    g1: None,
                    g2: None,
                    g3: None,
                    is_hold: false,
                    hold_reason: None,
                    hold_by: None,
                    hold_at: None,
                    out_of_range: BTreeMap::new(),
                    edited_by: None,
                    edited_at: None,
                    released_by: None,
                    released_at: None,
                    created_at: Some(now.clone()),
                    updated_at: None,
                },
                false,
            ),
            Err(e) => return Err(e),
        };

        // A re-submission overwrites the station's previous group.
        *batch.station_group_mut(req.station) = Some(StationGroup {
            values: req.values,
            completed_by: actor.to_string(),
            completed_at: now.clone(),
        });

        let eval = hold::evaluate(specs, &batch.all_values());
        hold::apply_submission(&mut batch, &eval, actor, &now);
        if batch.is_hold {
            warn!(reference = %batch.reference_no, failures = batch.out_of_range.len(),
                  "batch on hold after submission");
        }

        batch.updated_at = Some(now);
        if existing {
            self.update_record("batches", &batch.id, &batch, &batch_indexes(&batch))?;
        } else {
            self.insert_record("batches", &batch.id, &batch, &batch_indexes(&batch))?;
            info!(reference = %batch.reference_no, "batch created");
        }
        Ok(batch)
    }

    pub fn get_batch(&self, id: &str) -> Result<TestBatch, LabError> {
        self.get_record("batches", id)
    }

    pub fn find_batch_by_reference(&self, reference_no: &str) -> Result<TestBatch, LabError> {
        let items: Vec<TestBatch> = self.query_records(
            "SELECT data FROM batches WHERE reference_no = ?1",
            &[Value::Text(reference_no.to_string())],
        )?;
        items
            .into_iter()
            .next()
            .ok_or_else(|| LabError::NotFound(format!("batches/reference/{}", reference_no)))
    }

    pub fn list_batches(
        &self,
        filter: &BatchFilter,
        params: &ListParams,
    ) -> Result<ListResult<TestBatch>, LabError> {
        let mut filters: Vec<(&str, Value)> = Vec::new();
        if let Some(product_id) = &filter.product_id {
            filters.push(("product_id", Value::Text(product_id.clone())));
        }
        if let Some(is_hold) = filter.is_hold {
            filters.push(("is_hold", Value::Integer(is_hold as i64)));
        }
        if let Some(complete) = filter.complete {
            filters.push(("complete", Value::Integer(complete as i64)));
        }
        let (items, total) = self.list_records("batches", &filters, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    pub fn delete_batch(&self, id: &str) -> Result<(), LabError> {
        self.delete_record("batches", id)
    }

    /// Privileged correction of recorded values on a held batch. All
    /// present values are re-validated; if everything passes the hold is
    /// lifted automatically.
    pub fn edit_measurements(
        &self,
        id: &str,
        edits: BTreeMap<MeasurementKey, String>,
        actor: &str,
    ) -> Result<TestBatch, LabError> {
        if edits.is_empty() {
            return Err(LabError::Validation("no measurements to edit".into()));
        }
        let mut batch = self.get_batch(id)?;
        if !batch.is_hold {
            return Err(LabError::Validation(format!(
                "batch '{}' is not on hold",
                batch.reference_no
            )));
        }

        // Specs must load before any value changes; the batch stays held
        // untouched otherwise.
        let product = self.get_product(&batch.product_id).map_err(|e| match e {
            LabError::NotFound(m) => LabError::SpecMissing(m),
            other => other,
        })?;
        let specs = require_specs(&product)?;

        for (key, value) in &edits {
            let group = batch.station_group_mut(key.station());
            let Some(group) = group.as_mut() else {
                return Err(LabError::Validation(format!(
                    "station {} has not reported for this batch",
                    key.station().as_str()
                )));
            };
            group.values.insert(*key, value.clone());
        }

        let now = now_rfc3339();
        let eval = hold::evaluate(specs, &batch.all_values());
        let outcome = hold::apply_edit(&mut batch, &eval, actor, &now);
        match outcome {
            EditOutcome::Released => {
                info!(reference = %batch.reference_no, "hold cleared by edit")
            }
            EditOutcome::StillOnHold => {
                warn!(reference = %batch.reference_no, failures = batch.out_of_range.len(),
                      "batch still on hold after edit")
            }
        }

        batch.updated_at = Some(now);
        self.update_record("batches", id, &batch, &batch_indexes(&batch))?;
        Ok(batch)
    }

    /// Manual override release. Leaves the out-of-range evidence in place.
    pub fn release_batch(&self, id: &str, actor: &str) -> Result<TestBatch, LabError> {
        let mut batch = self.get_batch(id)?;
        if !batch.is_hold {
            return Err(LabError::Validation(format!(
                "batch '{}' is not on hold",
                batch.reference_no
            )));
        }

        let now = now_rfc3339();
        hold::apply_release(&mut batch, actor, &now);
        info!(reference = %batch.reference_no, by = actor, "batch released manually");

        batch.updated_at = Some(now);
        self.update_record("batches", id, &batch, &batch_indexes(&batch))?;
        Ok(batch)
    }

    /// Change a batch's printable reference. Gated by a dedicated
    /// permission at the API layer.
    pub fn set_reference_no(
        &self,
        id: &str,
        reference_no: &str,
        _actor: &str,
    ) -> Result<TestBatch, LabError> {
        let reference_no = reference_no.trim();
        if reference_no.is_empty() {
            return Err(LabError::Validation("referenceNo is required".into()));
        }
        let mut batch = self.get_batch(id)?;
        batch.reference_no = reference_no.to_string();
        batch.updated_at = Some(now_rfc3339());
        self.update_record("batches", id, &batch, &batch_indexes(&batch))?;
        Ok(batch)
    }

    /// Batches that have ever been held and have since seen an edit or a
    /// release, most recent activity first.
    pub fn hold_history(&self, params: &ListParams) -> Result<ListResult<TestBatch>, LabError> {
        let items: Vec<TestBatch> = self.query_records(
            "SELECT data FROM batches
             WHERE hold_at IS NOT NULL
               AND (edited_at IS NOT NULL OR released_at IS NOT NULL)
             ORDER BY max(coalesce(hold_at, ''), coalesce(edited_at, ''), coalesce(released_at, '')) DESC
             LIMIT ?1 OFFSET ?2",
            &[
                Value::Integer(params.limit as i64),
                Value::Integer(params.offset as i64),
            ],
        )?;
        let total_rows = self
            .sql
            .query(
                "SELECT COUNT(*) as cnt FROM batches
                 WHERE hold_at IS NOT NULL
                   AND (edited_at IS NOT NULL OR released_at IS NOT NULL)",
                &[],
            )
            .map_err(|e| LabError::Storage(e.to_string()))?;
        let total = total_rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as usize;
        Ok(ListResult { items, total })
    }

    /// Batches still missing at least one station.
    pub fn pending_tests(&self, params: &ListParams) -> Result<ListResult<PendingBatch>, LabError> {
        let (items, total): (Vec<TestBatch>, usize) = self.list_records(
            "batches",
            &[("complete", Value::Integer(0))],
            params.limit,
            params.offset,
        )?;
        let items = items
            .into_iter()
            .map(|batch| PendingBatch {
                missing: batch.missing_stations(),
                batch,
            })
            .collect();
        Ok(ListResult { items, total })
    }

    /// Currently held batches.
    pub fn held_batches(&self, params: &ListParams) -> Result<ListResult<TestBatch>, LabError> {
        let (items, total) = self.list_records(
            "batches",
            &[("is_hold", Value::Integer(1))],
            params.limit,
            params.offset,
        )?;
        Ok(ListResult { items, total })
    }
}
