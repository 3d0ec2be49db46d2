use serde::{Deserialize, Serialize};

use super::ProductSpecification;

/// Test station. Each batch collects results from all three before it can
/// be certified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Station {
    G1,
    G2,
    G3,
}

impl Station {
    pub const ALL: [Station; 3] = [Station::G1, Station::G2, Station::G3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Station::G1 => "G1",
            Station::G2 => "G2",
            Station::G3 => "G3",
        }
    }

    pub fn parse(s: &str) -> Option<Station> {
        match s.trim().to_ascii_uppercase().as_str() {
            "G1" => Some(Station::G1),
            "G2" => Some(Station::G2),
            "G3" => Some(Station::G3),
            _ => None,
        }
    }
}

/// Every measurement a station can record. Keys are fixed per station; the
/// two rheometer timings are entered in minutes and carry a derived
/// seconds display field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementKey {
    Ml,
    Mh,
    Ts2Min,
    Ts2Sec,
    Tc90Min,
    Tc90Sec,
    Hardness,
    SpecificGravity,
    TensileStrength,
    Elongation,
}

impl MeasurementKey {
    pub const ALL: [MeasurementKey; 10] = [
        MeasurementKey::Ml,
        MeasurementKey::Mh,
        MeasurementKey::Ts2Min,
        MeasurementKey::Ts2Sec,
        MeasurementKey::Tc90Min,
        MeasurementKey::Tc90Sec,
        MeasurementKey::Hardness,
        MeasurementKey::SpecificGravity,
        MeasurementKey::TensileStrength,
        MeasurementKey::Elongation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKey::Ml => "ml",
            MeasurementKey::Mh => "mh",
            MeasurementKey::Ts2Min => "ts2Min",
            MeasurementKey::Ts2Sec => "ts2Sec",
            MeasurementKey::Tc90Min => "tc90Min",
            MeasurementKey::Tc90Sec => "tc90Sec",
            MeasurementKey::Hardness => "hardness",
            MeasurementKey::SpecificGravity => "specificGravity",
            MeasurementKey::TensileStrength => "tensileStrength",
            MeasurementKey::Elongation => "elongation",
        }
    }

    pub fn parse(s: &str) -> Option<MeasurementKey> {
        MeasurementKey::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Station that owns this key.
    pub fn station(&self) -> Station {
        match self {
            MeasurementKey::Ml
            | MeasurementKey::Mh
            | MeasurementKey::Ts2Min
            | MeasurementKey::Ts2Sec
            | MeasurementKey::Tc90Min
            | MeasurementKey::Tc90Sec => Station::G1,
            MeasurementKey::Hardness | MeasurementKey::SpecificGravity => Station::G2,
            MeasurementKey::TensileStrength | MeasurementKey::Elongation => Station::G3,
        }
    }

    pub fn station_keys(station: Station) -> &'static [MeasurementKey] {
        match station {
            Station::G1 => &[
                MeasurementKey::Ml,
                MeasurementKey::Mh,
                MeasurementKey::Ts2Min,
                MeasurementKey::Ts2Sec,
                MeasurementKey::Tc90Min,
                MeasurementKey::Tc90Sec,
            ],
            Station::G2 => &[MeasurementKey::Hardness, MeasurementKey::SpecificGravity],
            Station::G3 => &[MeasurementKey::TensileStrength, MeasurementKey::Elongation],
        }
    }

    /// True for timings entered in minutes but validated in seconds.
    pub fn entered_in_minutes(&self) -> bool {
        matches!(self, MeasurementKey::Ts2Min | MeasurementKey::Tc90Min)
    }

    /// Derived display keys never validated directly.
    pub fn is_derived(&self) -> bool {
        matches!(self, MeasurementKey::Ts2Sec | MeasurementKey::Tc90Sec)
    }

    /// The paired seconds display key for a minutes key.
    pub fn seconds_pair(&self) -> Option<MeasurementKey> {
        match self {
            MeasurementKey::Ts2Min => Some(MeasurementKey::Ts2Sec),
            MeasurementKey::Tc90Min => Some(MeasurementKey::Tc90Sec),
            _ => None,
        }
    }

    /// Substrings matched (case-insensitively, both directions) against
    /// specification property names.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            MeasurementKey::Ml => &["ml"],
            MeasurementKey::Mh => &["mh"],
            MeasurementKey::Ts2Min | MeasurementKey::Ts2Sec => &["ts2", "ts-2", "scorch"],
            MeasurementKey::Tc90Min | MeasurementKey::Tc90Sec => &["tc90", "tc-90", "cure time"],
            MeasurementKey::Hardness => &["hardness", "shore"],
            MeasurementKey::SpecificGravity => &["specific gravity", "density", "sp. gravity"],
            MeasurementKey::TensileStrength => &["tensile"],
            MeasurementKey::Elongation => &["elongation"],
        }
    }

    /// Resolve the specification row for this key by fuzzy property-name
    /// match. First row that matches wins.
    pub fn find_specification<'a>(
        &self,
        specs: &'a [ProductSpecification],
    ) -> Option<&'a ProductSpecification> {
        specs.iter().find(|s| {
            let prop = s.property.trim().to_lowercase();
            self.synonyms()
                .iter()
                .any(|syn| prop.contains(syn) || syn.contains(prop.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(property: &str) -> ProductSpecification {
        ProductSpecification {
            property: property.into(),
            unit: "".into(),
            standard: "".into(),
            specification: "1-2".into(),
            typical_value: None,
        }
    }

    #[test]
    fn station_ownership() {
        assert_eq!(MeasurementKey::Ml.station(), Station::G1);
        assert_eq!(MeasurementKey::Hardness.station(), Station::G2);
        assert_eq!(MeasurementKey::Elongation.station(), Station::G3);
        for key in MeasurementKey::station_keys(Station::G1) {
            assert_eq!(key.station(), Station::G1);
        }
    }

    #[test]
    fn minutes_keys_pair_with_seconds() {
        assert_eq!(
            MeasurementKey::Ts2Min.seconds_pair(),
            Some(MeasurementKey::Ts2Sec)
        );
        assert_eq!(
            MeasurementKey::Tc90Min.seconds_pair(),
            Some(MeasurementKey::Tc90Sec)
        );
        assert_eq!(MeasurementKey::Hardness.seconds_pair(), None);
        assert!(MeasurementKey::Ts2Sec.is_derived());
        assert!(!MeasurementKey::Ts2Sec.entered_in_minutes());
    }

    #[test]
    fn specification_lookup_is_case_insensitive() {
        let specs = vec![
            spec("Hardness (Shore A)"),
            spec("Specific Gravity"),
            spec("TS2 @ 160C"),
        ];
        assert_eq!(
            MeasurementKey::Hardness.find_specification(&specs).unwrap().property,
            "Hardness (Shore A)"
        );
        assert_eq!(
            MeasurementKey::SpecificGravity
                .find_specification(&specs)
                .unwrap()
                .property,
            "Specific Gravity"
        );
        assert_eq!(
            MeasurementKey::Ts2Min.find_specification(&specs).unwrap().property,
            "TS2 @ 160C"
        );
        assert!(MeasurementKey::TensileStrength.find_specification(&specs).is_none());
    }

    #[test]
    fn lookup_matches_when_property_is_shorter_than_synonym() {
        // "Density" row vs the "specific gravity" synonym list.
        let specs = vec![spec("Density")];
        assert!(MeasurementKey::SpecificGravity.find_specification(&specs).is_some());
    }

    #[test]
    fn key_serde_is_camel_case() {
        let json = serde_json::to_string(&MeasurementKey::SpecificGravity).unwrap();
        assert_eq!(json, "\"specificGravity\"");
        let back: MeasurementKey = serde_json::from_str("\"ts2Min\"").unwrap();
        assert_eq!(back, MeasurementKey::Ts2Min);
        assert_eq!(MeasurementKey::parse("tc90Sec"), Some(MeasurementKey::Tc90Sec));
    }

    #[test]
    fn station_serde_and_parse() {
        assert_eq!(serde_json::to_string(&Station::G2).unwrap(), "\"G2\"");
        assert_eq!(Station::parse("g3"), Some(Station::G3));
        assert_eq!(Station::parse("G4"), None);
    }
}
