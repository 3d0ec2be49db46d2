//! Acceptance-expression parsing and validation.
//!
//! Specification cells are free text entered by lab staff. The grammar is
//! matched in a fixed priority order so expressions like "≥4" are never
//! misread as ranges, while a leading minus ("-40") intentionally falls
//! through to exact matching.

use serde::Serialize;

/// A parsed acceptance expression. Parsing never fails; anything that is
/// not a recognized numeric form is treated as an exact match.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecRule {
    AtLeast(f64),
    AtMost(f64),
    GreaterThan(f64),
    LessThan(f64),
    /// "A±B", accepted as the closed interval [A-B, A+B].
    Tolerance { center: f64, delta: f64 },
    /// "A-B", closed interval.
    Range { lo: f64, hi: f64 },
    /// Categorical value, compared case-insensitively ("V-0", "Pass").
    Exact(String),
}

impl SpecRule {
    pub fn parse(spec: &str) -> SpecRule {
        let s = spec.trim();

        if let Some(n) = strip_number(s, &["≥", ">="]) {
            return SpecRule::AtLeast(n);
        }
        if let Some(n) = strip_number(s, &["≤", "<="]) {
            return SpecRule::AtMost(n);
        }
        if let Some(n) = strip_number(s, &[">"]) {
            return SpecRule::GreaterThan(n);
        }
        if let Some(n) = strip_number(s, &["<"]) {
            return SpecRule::LessThan(n);
        }
        if let Some((left, right)) = s.split_once('±') {
            if let (Ok(center), Ok(delta)) =
                (left.trim().parse::<f64>(), right.trim().parse::<f64>())
            {
                return SpecRule::Tolerance { center, delta };
            }
        }
        // Range is tried last among the numeric forms. The left side must
        // be non-empty, so "-40" is not a range and falls through.
        if let Some((left, right)) = s.split_once('-') {
            let left = left.trim();
            let right = right.trim();
            if !left.is_empty() {
                if let (Ok(lo), Ok(hi)) = (left.parse::<f64>(), right.parse::<f64>()) {
                    return SpecRule::Range { lo, hi };
                }
            }
        }
        SpecRule::Exact(s.to_string())
    }

    /// Human-readable form of the acceptance range, as shown in hold
    /// details and on certificates. Tolerances render as their interval.
    pub fn describe(&self) -> String {
        match self {
            SpecRule::AtLeast(n) => format!(">={n}"),
            SpecRule::AtMost(n) => format!("<={n}"),
            SpecRule::GreaterThan(n) => format!(">{n}"),
            SpecRule::LessThan(n) => format!("<{n}"),
            SpecRule::Tolerance { center, delta } => {
                format!("{}-{}", center - delta, center + delta)
            }
            SpecRule::Range { lo, hi } => format!("{lo}-{hi}"),
            SpecRule::Exact(s) => s.clone(),
        }
    }

    fn accepts_number(&self, v: f64) -> bool {
        match self {
            SpecRule::AtLeast(n) => v >= *n,
            SpecRule::AtMost(n) => v <= *n,
            SpecRule::GreaterThan(n) => v > *n,
            SpecRule::LessThan(n) => v < *n,
            SpecRule::Tolerance { center, delta } => {
                v >= center - delta && v <= center + delta
            }
            SpecRule::Range { lo, hi } => v >= *lo && v <= *hi,
            SpecRule::Exact(s) => match s.trim().parse::<f64>() {
                Ok(n) => v == n,
                // Numeric value against a categorical spec never matches.
                Err(_) => false,
            },
        }
    }
}

fn strip_number(s: &str, prefixes: &[&str]) -> Option<f64> {
    for p in prefixes {
        if let Some(rest) = s.strip_prefix(p) {
            return rest.trim().parse::<f64>().ok();
        }
    }
    None
}

/// Result of checking one measured value against one specification cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Pass,
    Fail {
        /// Rendered acceptance range.
        expected: String,
        /// The value as validated.
        actual: String,
    },
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }
}

/// Validate a measured value against a specification expression.
///
/// Non-numeric values are compared to the raw spec text case-insensitively;
/// numeric values go through the parsed rule.
pub fn validate(value: &str, spec: &str) -> Outcome {
    let rule = SpecRule::parse(spec);
    let value = value.trim();
    let pass = match value.parse::<f64>() {
        Ok(v) => rule.accepts_number(v),
        Err(_) => value.eq_ignore_ascii_case(spec.trim()),
    };
    if pass {
        Outcome::Pass
    } else {
        Outcome::Fail {
            expected: rule.describe(),
            actual: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(value: &str, spec: &str) -> (String, String) {
        match validate(value, spec) {
            Outcome::Fail { expected, actual } => (expected, actual),
            Outcome::Pass => panic!("expected {value:?} to fail {spec:?}"),
        }
    }

    #[test]
    fn at_least_and_at_most() {
        assert!(validate("4", ">=4").is_pass());
        assert!(validate("4.1", "≥4").is_pass());
        assert!(!validate("3.9", ">=4").is_pass());
        assert!(validate("90", "<=90").is_pass());
        assert!(validate("89", "≤90").is_pass());
        assert!(!validate("90.5", "<=90").is_pass());
    }

    #[test]
    fn strict_comparisons() {
        assert!(validate("4.1", ">4").is_pass());
        assert!(!validate("4", ">4").is_pass());
        assert!(validate("3.9", "<4").is_pass());
        assert!(!validate("4", "<4").is_pass());
    }

    #[test]
    fn tolerance_is_inclusive_interval() {
        assert!(validate("61", "68±7").is_pass());
        assert!(validate("75", "68±7").is_pass());
        assert!(validate("68", "68±7").is_pass());
        assert!(!validate("60.9", "68±7").is_pass());
        assert!(!validate("75.1", "68±7").is_pass());
    }

    #[test]
    fn tolerance_describes_as_interval() {
        let (expected, actual) = fail("80", "68±7");
        assert_eq!(expected, "61-75");
        assert_eq!(actual, "80");
    }

    #[test]
    fn plain_range() {
        assert!(validate("50", "50-90").is_pass());
        assert!(validate("90", "50-90").is_pass());
        assert!(validate("70.5", "50 - 90").is_pass());
        assert!(!validate("49.9", "50-90").is_pass());
        assert_eq!(fail("95", "50-90").0, "50-90");
    }

    #[test]
    fn comparison_wins_over_range_split() {
        // ">=1.10-ish" inputs must never be read as ranges.
        assert_eq!(SpecRule::parse(">=4"), SpecRule::AtLeast(4.0));
        assert_eq!(SpecRule::parse("<=90"), SpecRule::AtMost(90.0));
        assert_eq!(
            SpecRule::parse("68±7"),
            SpecRule::Tolerance { center: 68.0, delta: 7.0 }
        );
    }

    #[test]
    fn leading_minus_is_not_a_range() {
        // "-40" stays an exact match; "-40" entered verbatim passes, while
        // the numeric -40 also equals the parsed fallback.
        assert_eq!(SpecRule::parse("-40"), SpecRule::Exact("-40".into()));
        assert!(validate("-40", "-40").is_pass());
        assert!(!validate("-39", "-40").is_pass());
    }

    #[test]
    fn categorical_match_is_case_insensitive() {
        assert!(validate("V-0", "V-0").is_pass());
        assert!(validate("v-0", "V-0").is_pass());
        assert!(!validate("V-1", "V-0").is_pass());
        assert!(validate("Pass", "PASS").is_pass());
    }

    #[test]
    fn numeric_equality_fallback() {
        assert!(validate("1.18", "1.18").is_pass());
        assert!(validate("1.180", "1.18").is_pass());
        assert!(!validate("1.19", "1.18").is_pass());
    }

    #[test]
    fn numeric_value_against_categorical_spec_fails() {
        assert!(!validate("0", "V-0").is_pass());
    }

    #[test]
    fn whitespace_is_tolerated() {
        assert!(validate(" 70 ", " 68 ± 7 ").is_pass());
        assert!(validate("5", ">= 4").is_pass());
    }

    #[test]
    fn describe_renders_minimal_numbers() {
        assert_eq!(SpecRule::parse("68±7").describe(), "61-75");
        assert_eq!(SpecRule::parse(">=4").describe(), ">=4");
        assert_eq!(SpecRule::parse("V-0").describe(), "V-0");
    }
}
