use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{MeasurementKey, Station};

/// One out-of-range finding, keyed by measurement in `TestBatch::out_of_range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutOfRangeEntry {
    /// Value exactly as entered by the operator.
    pub value: String,
    /// Human-readable acceptance range, e.g. "61-75".
    pub expected: String,
    /// Value actually validated (unit-converted where applicable).
    pub actual: String,
}

/// Results recorded by one station for a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationGroup {
    pub values: BTreeMap<MeasurementKey, String>,
    pub completed_by: String,
    pub completed_at: String,
}

/// A production batch under test. Collects results from the three stations
/// and carries the hold state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestBatch {
    pub id: String,
    /// Printable reference, unique across batches.
    pub reference_no: String,
    pub batch_no: String,
    pub shift: String,
    pub product_id: String,
    pub product_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g1: Option<StationGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g2: Option<StationGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g3: Option<StationGroup>,

    #[serde(default)]
    pub is_hold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_reason: Option<String>,
    /// Who/when the current hold episode started. Written once per episode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_at: Option<String>,
    #[serde(default)]
    pub out_of_range: BTreeMap<MeasurementKey, OutOfRangeEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TestBatch {
    pub fn station_group(&self, station: Station) -> Option<&StationGroup> {
        match station {
            Station::G1 => self.g1.as_ref(),
            Station::G2 => self.g2.as_ref(),
            Station::G3 => self.g3.as_ref(),
        }
    }

    pub fn station_group_mut(&mut self, station: Station) -> &mut Option<StationGroup> {
        match station {
            Station::G1 => &mut self.g1,
            Station::G2 => &mut self.g2,
            Station::G3 => &mut self.g3,
        }
    }

    /// All three stations have reported.
    pub fn is_complete(&self) -> bool {
        self.g1.is_some() && self.g2.is_some() && self.g3.is_some()
    }

    pub fn missing_stations(&self) -> Vec<Station> {
        Station::ALL
            .iter()
            .copied()
            .filter(|s| self.station_group(*s).is_none())
            .collect()
    }

    /// Eligible for certificates and statistics.
    pub fn certificate_ready(&self) -> bool {
        self.is_complete() && !self.is_hold
    }

    /// Merged view of every recorded value across stations.
    pub fn all_values(&self) -> BTreeMap<MeasurementKey, String> {
        let mut out = BTreeMap::new();
        for group in [&self.g1, &self.g2, &self.g3].into_iter().flatten() {
            for (key, value) in &group.values {
                out.insert(*key, value.clone());
            }
        }
        out
    }
}

/// Build the printable reference for a new batch.
pub fn make_reference_no(product_code: &str, shift: &str, batch_no: &str) -> String {
    format!("{product_code}-{shift}-{batch_no}")
}
