use tracing::info;

use labqc_core::{ListParams, ListResult, new_id, now_rfc3339};
use labqc_sql::Value;

use crate::model::{
    Certificate, CertificateLine, CertificateStatus, MeasurementKey, TestBatch,
};
use super::{LabError, LabService};

fn certificate_indexes(c: &Certificate) -> Vec<(&'static str, Value)> {
    vec![
        ("batch_id", Value::Text(c.batch_id.clone())),
        ("reference_no", Value::Text(c.reference_no.clone())),
        ("status", Value::Text(c.status.as_str().to_string())),
        (
            "created_at",
            Value::Text(c.created_at.clone().unwrap_or_default()),
        ),
        (
            "updated_at",
            Value::Text(c.updated_at.clone().unwrap_or_default()),
        ),
    ]
}

/// Find the batch value printed for a specification row, going through the
/// same property-name matching used during validation.
fn result_for(batch: &TestBatch, property: &str) -> String {
    let values = batch.all_values();
    let row = crate::model::ProductSpecification {
        property: property.to_string(),
        unit: String::new(),
        standard: String::new(),
        specification: String::new(),
        typical_value: None,
    };
    let specs = std::slice::from_ref(&row);
    MeasurementKey::ALL
        .iter()
        .find(|key| key.find_specification(specs).is_some())
        .and_then(|key| values.get(key).cloned())
        .unwrap_or_else(|| "-".to_string())
}

impl LabService {
    /// Draft a certificate for an eligible batch: every station reported
    /// and the batch is not on hold.
    pub fn generate_certificate(
        &self,
        batch_id: &str,
        actor: &str,
    ) -> Result<Certificate, LabError> {
        let batch = self.get_batch(batch_id)?;
        if !batch.certificate_ready() {
            let why = if batch.is_hold {
                "on hold".to_string()
            } else {
                format!(
                    "missing stations: {}",
                    batch
                        .missing_stations()
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            return Err(LabError::Validation(format!(
                "batch '{}' is not eligible for a certificate ({})",
                batch.reference_no, why
            )));
        }

        let product = self.get_product(&batch.product_id)?;
        let lines = product
            .specifications
            .iter()
            .map(|row| CertificateLine {
                property: row.property.clone(),
                unit: row.unit.clone(),
                standard: row.standard.clone(),
                specification: row.specification.clone(),
                result: result_for(&batch, &row.property),
            })
            .collect();

        let now = now_rfc3339();
        let cert = Certificate {
            id: new_id(),
            batch_id: batch.id.clone(),
            reference_no: batch.reference_no.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            lines,
            status: CertificateStatus::Draft,
            created_by: actor.to_string(),
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejected_reason: None,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        self.insert_record("certificates", &cert.id, &cert, &certificate_indexes(&cert))?;
        info!(reference = %cert.reference_no, "certificate drafted");
        Ok(cert)
    }

    pub fn get_certificate(&self, id: &str) -> Result<Certificate, LabError> {
        self.get_record("certificates", id)
    }

    pub fn list_certificates(
        &self,
        status: Option<CertificateStatus>,
        params: &ListParams,
    ) -> Result<ListResult<Certificate>, LabError> {
        let mut filters: Vec<(&str, Value)> = Vec::new();
        if let Some(status) = status {
            filters.push(("status", Value::Text(status.as_str().to_string())));
        }
        let (items, total) =
            self.list_records("certificates", &filters, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    pub fn submit_certificate(&self, id: &str) -> Result<Certificate, LabError> {
        self.transition(id, CertificateStatus::Draft, |cert, now| {
            cert.status = CertificateStatus::PendingApproval;
            cert.submitted_at = Some(now.to_string());
        })
    }

    pub fn approve_certificate(&self, id: &str, actor: &str) -> Result<Certificate, LabError> {
        self.transition(id, CertificateStatus::PendingApproval, |cert, now| {
            cert.status = CertificateStatus::Approved;
            cert.approved_by = Some(actor.to_string());
            cert.approved_at = Some(now.to_string());
        })
    }

    pub fn reject_certificate(&self, id: &str, reason: &str) -> Result<Certificate, LabError> {
        self.transition(id, CertificateStatus::PendingApproval, |cert, _now| {
            cert.status = CertificateStatus::Rejected;
            cert.rejected_reason = Some(reason.to_string());
        })
    }

    /// Drafts can be discarded; anything further along stays on record.
    pub fn delete_certificate(&self, id: &str) -> Result<(), LabError> {
        let cert = self.get_certificate(id)?;
        if cert.status != CertificateStatus::Draft {
            return Err(LabError::Validation(format!(
                "certificate '{}' is {} and cannot be deleted",
                cert.reference_no,
                cert.status.as_str()
            )));
        }
        self.delete_record("certificates", id)
    }

    fn transition(
        &self,
        id: &str,
        from: CertificateStatus,
        apply: impl FnOnce(&mut Certificate, &str),
    ) -> Result<Certificate, LabError> {
        let mut cert = self.get_certificate(id)?;
        if cert.status != from {
            return Err(LabError::Conflict(format!(
                "certificate '{}' is {}, expected {}",
                cert.reference_no,
                cert.status.as_str(),
                from.as_str()
            )));
        }
        let now = now_rfc3339();
        apply(&mut cert, &now);
        cert.updated_at = Some(now);
        self.update_record("certificates", id, &cert, &certificate_indexes(&cert))?;
        Ok(cert)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::super::batch::SubmitStation;
    use super::super::testutil::service;
    use super::*;
    use crate::model::{CreateProduct, ProductSpecification, Station};

    fn spec(property: &str, specification: &str) -> ProductSpecification {
        ProductSpecification {
            property: property.into(),
            unit: "Shore A".into(),
            standard: "ASTM D2240".into(),
            specification: specification.into(),
            typical_value: None,
        }
    }

    fn seed(svc: &LabService) -> crate::model::Product {
        svc.create_product(CreateProduct {
            code: "NBR-70".into(),
            name: "Nitrile 70 Shore A".into(),
            compound: None,
            specifications: vec![
                spec("ML", "10-20"),
                spec("Hardness (Shore A)", "68±7"),
                spec("Tensile Strength", ">=4"),
                spec("Elongation", ">=250"),
            ],
        })
        .unwrap()
    }

    fn fill_batch(svc: &LabService, product_id: &str, hardness: &str) -> String {
        let submit = |station: Station, pairs: &[(MeasurementKey, &str)]| {
            svc.submit_station(
                SubmitStation {
                    product_id: product_id.into(),
                    shift: "A".into(),
                    batch_no: "1001".into(),
                    station,
                    values: pairs
                        .iter()
                        .map(|(k, v)| (*k, v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                },
                "operator",
            )
            .unwrap()
        };
        submit(Station::G1, &[(MeasurementKey::Ml, "12")]);
        submit(
            Station::G3,
            &[
                (MeasurementKey::TensileStrength, "5"),
                (MeasurementKey::Elongation, "400"),
            ],
        );
        submit(Station::G2, &[(MeasurementKey::Hardness, hardness)]).id
    }

    #[test]
    fn draft_carries_spec_rows_and_results() {
        let (svc, _dir) = service();
        let p = seed(&svc);
        let batch_id = fill_batch(&svc, &p.id, "70");

        let cert = svc.generate_certificate(&batch_id, "officer").unwrap();
        assert_eq!(cert.status, CertificateStatus::Draft);
        assert_eq!(cert.lines.len(), 4);
        let hardness = cert
            .lines
            .iter()
            .find(|l| l.property == "Hardness (Shore A)")
            .unwrap();
        assert_eq!(hardness.result, "70");
        assert_eq!(hardness.specification, "68±7");
    }

    #[test]
    fn held_batch_is_not_eligible() {
        let (svc, _dir) = service();
        let p = seed(&svc);
        let batch_id = fill_batch(&svc, &p.id, "80");
        let err = svc.generate_certificate(&batch_id, "officer").unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn incomplete_batch_is_not_eligible() {
        let (svc, _dir) = service();
        let p = seed(&svc);
        let b = svc
            .submit_station(
                SubmitStation {
                    product_id: p.id.clone(),
                    shift: "A".into(),
                    batch_no: "2001".into(),
                    station: Station::G2,
                    values: [(MeasurementKey::Hardness, "70".to_string())].into(),
                },
                "operator",
            )
            .unwrap();
        let err = svc.generate_certificate(&b.id, "officer").unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn approval_flow() {
        let (svc, _dir) = service();
        let p = seed(&svc);
        let batch_id = fill_batch(&svc, &p.id, "70");
        let cert = svc.generate_certificate(&batch_id, "officer").unwrap();

        // Cannot approve a draft directly.
        assert!(matches!(
            svc.approve_certificate(&cert.id, "incharge").unwrap_err(),
            LabError::Conflict(_)
        ));

        let pending = svc.submit_certificate(&cert.id).unwrap();
        assert_eq!(pending.status, CertificateStatus::PendingApproval);
        assert!(pending.submitted_at.is_some());

        let approved = svc.approve_certificate(&cert.id, "incharge").unwrap();
        assert_eq!(approved.status, CertificateStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("incharge"));
    }

    #[test]
    fn rejection_records_the_reason() {
        let (svc, _dir) = service();
        let p = seed(&svc);
        let batch_id = fill_batch(&svc, &p.id, "70");
        let cert = svc.generate_certificate(&batch_id, "officer").unwrap();
        svc.submit_certificate(&cert.id).unwrap();

        let rejected = svc.reject_certificate(&cert.id, "wrong batch").unwrap();
        assert_eq!(rejected.status, CertificateStatus::Rejected);
        assert_eq!(rejected.rejected_reason.as_deref(), Some("wrong batch"));
    }

    #[test]
    fn only_drafts_can_be_deleted() {
        let (svc, _dir) = service();
        let p = seed(&svc);
        let batch_id = fill_batch(&svc, &p.id, "70");
        let cert = svc.generate_certificate(&batch_id, "officer").unwrap();
        svc.submit_certificate(&cert.id).unwrap();
        assert!(matches!(
            svc.delete_certificate(&cert.id).unwrap_err(),
            LabError::Validation(_)
        ));

        let draft = svc.generate_certificate(&batch_id, "officer").unwrap();
        svc.delete_certificate(&draft.id).unwrap();
        assert!(svc.get_certificate(&draft.id).is_err());
    }

    #[test]
    fn list_filters_by_status() {
        let (svc, _dir) = service();
        let p = seed(&svc);
        let batch_id = fill_batch(&svc, &p.id, "70");
        let cert = svc.generate_certificate(&batch_id, "officer").unwrap();
        svc.submit_certificate(&cert.id).unwrap();
        svc.generate_certificate(&batch_id, "officer").unwrap();

        let drafts = svc
            .list_certificates(Some(CertificateStatus::Draft), &ListParams::default())
            .unwrap();
        assert_eq!(drafts.total, 1);
        let all = svc.list_certificates(None, &ListParams::default()).unwrap();
        assert_eq!(all.total, 2);
    }
}
