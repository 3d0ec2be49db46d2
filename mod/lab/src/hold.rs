//! Hold/release state machine for test batches.
//!
//! A batch is either in normal flow or on hold. Out-of-range submissions
//! put it on hold; a privileged edit that brings every value back in range
//! releases it automatically, and a manual release overrides without
//! touching the recorded evidence.

use std::collections::BTreeMap;

use crate::model::{MeasurementKey, OutOfRangeEntry, ProductSpecification, TestBatch};
use crate::specrule::{self, Outcome};

/// Result of validating a set of measured values against a product's
/// specification table.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub failures: BTreeMap<MeasurementKey, OutOfRangeEntry>,
}

impl Evaluation {
    pub fn all_pass(&self) -> bool {
        self.failures.is_empty()
    }
}

/// What an edit did to the hold state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    StillOnHold,
    Released,
}

/// Validate every value against its matching specification row.
///
/// Keys with no matching row are skipped. Timings entered in minutes are
/// converted to seconds before validation, and a failure is mirrored onto
/// the paired seconds display key so both fields show the same state.
pub fn evaluate(
    specs: &[ProductSpecification],
    values: &BTreeMap<MeasurementKey, String>,
) -> Evaluation {
    let mut failures = BTreeMap::new();
    for (key, raw) in values {
        if key.is_derived() {
            continue;
        }
        let Some(spec) = key.find_specification(specs) else {
            continue;
        };
        let candidate = if key.entered_in_minutes() {
            match raw.trim().parse::<f64>() {
                Ok(minutes) => format!("{}", minutes * 60.0),
                Err(_) => raw.clone(),
            }
        } else {
            raw.clone()
        };
        if let Outcome::Fail { expected, actual } =
            specrule::validate(&candidate, &spec.specification)
        {
            let entry = OutOfRangeEntry {
                value: raw.clone(),
                expected,
                actual,
            };
            if let Some(pair) = key.seconds_pair() {
                failures.insert(pair, entry.clone());
            }
            failures.insert(*key, entry);
        }
    }
    Evaluation { failures }
}

/// Apply a station submission's validation result.
///
/// Failures put the batch on hold; the hold marker is written once per
/// episode, so later failing submissions only refresh the evidence.
/// Submissions never release a held batch.
pub fn apply_submission(batch: &mut TestBatch, eval: &Evaluation, actor: &str, now: &str) {
    if eval.all_pass() {
        return;
    }
    batch.out_of_range = eval.failures.clone();
    batch.hold_reason = Some(format!(
        "{} measurement(s) out of specification",
        eval.failures.len()
    ));
    if !batch.is_hold {
        batch.is_hold = true;
        batch.hold_by = Some(actor.to_string());
        batch.hold_at = Some(now.to_string());
    }
}

/// Apply a privileged edit's validation result.
///
/// The edit audit trail is written either way. If everything now passes the
/// batch is released and the evidence cleared; otherwise the evidence is
/// refreshed and the batch stays on hold.
pub fn apply_edit(
    batch: &mut TestBatch,
    eval: &Evaluation,
    actor: &str,
    now: &str,
) -> EditOutcome {
    batch.edited_by = Some(actor.to_string());
    batch.edited_at = Some(now.to_string());
    if eval.all_pass() {
        batch.is_hold = false;
        batch.out_of_range.clear();
        EditOutcome::Released
    } else {
        batch.out_of_range = eval.failures.clone();
        batch.hold_reason = Some(format!(
            "{} measurement(s) still out of specification after edit",
            eval.failures.len()
        ));
        EditOutcome::StillOnHold
    }
}

/// Manual release. Clears the hold flag only; the out-of-range evidence and
/// any edit trail stay on record.
pub fn apply_release(batch: &mut TestBatch, actor: &str, now: &str) {
    batch.is_hold = false;
    batch.released_by = Some(actor.to_string());
    batch.released_at = Some(now.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StationGroup;

    fn spec(property: &str, specification: &str) -> ProductSpecification {
        ProductSpecification {
            property: property.into(),
            unit: "".into(),
            standard: "".into(),
            specification: specification.into(),
            typical_value: None,
        }
    }

    fn specs() -> Vec<ProductSpecification> {
        vec![
            spec("Hardness (Shore A)", "68±7"),
            spec("Specific Gravity", "1.1-1.3"),
            spec("TS2", "60-180"),
            spec("Tensile Strength", ">=4"),
        ]
    }

    fn batch() -> TestBatch {
        TestBatch {
            id: "b1".into(),
            reference_no: "NBR-70-A-1001".into(),
            batch_no: "1001".into(),
            shift: "A".into(),
            product_id: "p1".into(),
            product_name: "NBR 70".into(),
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
            created_at: None,
            updated_at: None,
        }
    }

    fn values(pairs: &[(MeasurementKey, &str)]) -> BTreeMap<MeasurementKey, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn in_range_values_pass() {
        let eval = evaluate(
            &specs(),
            &values(&[
                (MeasurementKey::Hardness, "70"),
                (MeasurementKey::SpecificGravity, "1.18"),
            ]),
        );
        assert!(eval.all_pass());
    }

    #[test]
    fn out_of_range_value_is_reported_with_interval() {
        let eval = evaluate(&specs(), &values(&[(MeasurementKey::Hardness, "80")]));
        let entry = &eval.failures[&MeasurementKey::Hardness];
        assert_eq!(entry.value, "80");
        assert_eq!(entry.expected, "61-75");
        assert_eq!(entry.actual, "80");
    }

    #[test]
    fn keys_without_specification_row_are_skipped() {
        let eval = evaluate(&specs(), &values(&[(MeasurementKey::Elongation, "9999")]));
        assert!(eval.all_pass());
    }

    #[test]
    fn minutes_are_validated_in_seconds() {
        // 1.5 min = 90 s, inside 60-180.
        let eval = evaluate(&specs(), &values(&[(MeasurementKey::Ts2Min, "1.5")]));
        assert!(eval.all_pass());

        // 0.5 min = 30 s, below range; failure mirrored to the display key.
        let eval = evaluate(&specs(), &values(&[(MeasurementKey::Ts2Min, "0.5")]));
        let entry = &eval.failures[&MeasurementKey::Ts2Min];
        assert_eq!(entry.value, "0.5");
        assert_eq!(entry.actual, "30");
        assert_eq!(entry.expected, "60-180");
        assert_eq!(
            eval.failures[&MeasurementKey::Ts2Sec],
            eval.failures[&MeasurementKey::Ts2Min]
        );
    }

    #[test]
    fn derived_seconds_keys_are_not_validated_directly() {
        let eval = evaluate(&specs(), &values(&[(MeasurementKey::Ts2Sec, "30")]));
        assert!(eval.all_pass());
    }

    #[test]
    fn failing_submission_holds_the_batch() {
        let mut b = batch();
        let eval = evaluate(&specs(), &values(&[(MeasurementKey::Hardness, "80")]));
        apply_submission(&mut b, &eval, "operator", "t1");
        assert!(b.is_hold);
        assert_eq!(b.hold_by.as_deref(), Some("operator"));
        assert_eq!(b.hold_at.as_deref(), Some("t1"));
        assert_eq!(b.out_of_range.len(), 1);
        assert!(b.hold_reason.as_deref().unwrap().contains("out of specification"));
    }

    #[test]
    fn hold_marker_is_written_once_per_episode() {
        let mut b = batch();
        let eval = evaluate(&specs(), &values(&[(MeasurementKey::Hardness, "80")]));
        apply_submission(&mut b, &eval, "first", "t1");

        let eval2 = evaluate(
            &specs(),
            &values(&[
                (MeasurementKey::Hardness, "80"),
                (MeasurementKey::SpecificGravity, "2.0"),
            ]),
        );
        apply_submission(&mut b, &eval2, "second", "t2");
        // Evidence refreshed, episode marker unchanged.
        assert_eq!(b.hold_by.as_deref(), Some("first"));
        assert_eq!(b.hold_at.as_deref(), Some("t1"));
        assert_eq!(b.out_of_range.len(), 2);
    }

    #[test]
    fn clean_submission_never_releases() {
        let mut b = batch();
        apply_submission(
            &mut b,
            &evaluate(&specs(), &values(&[(MeasurementKey::Hardness, "80")])),
            "op",
            "t1",
        );
        apply_submission(
            &mut b,
            &evaluate(&specs(), &values(&[(MeasurementKey::SpecificGravity, "1.2")])),
            "op",
            "t2",
        );
        assert!(b.is_hold);
        assert_eq!(b.out_of_range.len(), 1);
    }

    #[test]
    fn edit_that_fixes_everything_releases() {
        let mut b = batch();
        apply_submission(
            &mut b,
            &evaluate(&specs(), &values(&[(MeasurementKey::Hardness, "80")])),
            "op",
            "t1",
        );

        let eval = evaluate(&specs(), &values(&[(MeasurementKey::Hardness, "70")]));
        let outcome = apply_edit(&mut b, &eval, "supervisor", "t2");
        assert_eq!(outcome, EditOutcome::Released);
        assert!(!b.is_hold);
        assert!(b.out_of_range.is_empty());
        assert_eq!(b.edited_by.as_deref(), Some("supervisor"));
        assert_eq!(b.edited_at.as_deref(), Some("t2"));
        // Episode start stays on record.
        assert_eq!(b.hold_by.as_deref(), Some("op"));
        assert_eq!(b.hold_at.as_deref(), Some("t1"));
    }

    #[test]
    fn edit_with_remaining_failures_stays_on_hold() {
        let mut b = batch();
        apply_submission(
            &mut b,
            &evaluate(
                &specs(),
                &values(&[
                    (MeasurementKey::Hardness, "80"),
                    (MeasurementKey::SpecificGravity, "2.0"),
                ]),
            ),
            "op",
            "t1",
        );

        let eval = evaluate(
            &specs(),
            &values(&[
                (MeasurementKey::Hardness, "70"),
                (MeasurementKey::SpecificGravity, "2.0"),
            ]),
        );
        let outcome = apply_edit(&mut b, &eval, "supervisor", "t2");
        assert_eq!(outcome, EditOutcome::StillOnHold);
        assert!(b.is_hold);
        assert_eq!(b.out_of_range.len(), 1);
        assert!(b.out_of_range.contains_key(&MeasurementKey::SpecificGravity));
        assert_eq!(b.edited_by.as_deref(), Some("supervisor"));
    }

    #[test]
    fn manual_release_keeps_evidence() {
        let mut b = batch();
        apply_submission(
            &mut b,
            &evaluate(&specs(), &values(&[(MeasurementKey::Hardness, "80")])),
            "op",
            "t1",
        );

        apply_release(&mut b, "incharge", "t2");
        assert!(!b.is_hold);
        assert_eq!(b.released_by.as_deref(), Some("incharge"));
        assert_eq!(b.released_at.as_deref(), Some("t2"));
        // Evidence and edit trail untouched.
        assert_eq!(b.out_of_range.len(), 1);
        assert!(b.edited_by.is_none());
    }

    #[test]
    fn hardness_hold_and_edit_release_end_to_end() {
        let mut b = batch();
        b.g2 = Some(StationGroup {
            values: values(&[(MeasurementKey::Hardness, "80")]),
            completed_by: "op".into(),
            completed_at: "t1".into(),
        });
        let eval = evaluate(&specs(), &b.all_values());
        apply_submission(&mut b, &eval, "op", "t1");
        assert!(b.is_hold);
        let entry = &b.out_of_range[&MeasurementKey::Hardness];
        assert_eq!((entry.value.as_str(), entry.expected.as_str(), entry.actual.as_str()),
                   ("80", "61-75", "80"));

        b.g2.as_mut().unwrap().values.insert(MeasurementKey::Hardness, "70".into());
        let eval = evaluate(&specs(), &b.all_values());
        let outcome = apply_edit(&mut b, &eval, "supervisor", "t2");
        assert_eq!(outcome, EditOutcome::Released);
        assert!(!b.is_hold);
        assert!(b.out_of_range.is_empty());
    }
}
