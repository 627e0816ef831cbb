use std::fmt;

use mdk_schemas::SliceKey;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Which way a metric improves when compared against a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// One acceptance rule on one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Threshold {
    /// Absolute pass/fail bound on the candidate's value. Bounds are
    /// inclusive; either may be omitted (open-ended), but not both.
    Value {
        metric: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lower_bound: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upper_bound: Option<f64>,
    },
    /// Bound on the change versus the baseline's value for the same metric
    /// and slice. When both `absolute` and `relative` are configured, both
    /// must hold (AND semantics). Skipped when no baseline value exists.
    Change {
        metric: String,
        direction: Direction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        absolute: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative: Option<f64>,
    },
}

impl Threshold {
    pub fn metric(&self) -> &str {
        match self {
            Threshold::Value { metric, .. } | Threshold::Change { metric, .. } => metric,
        }
    }
}

// ---------------------------------------------------------------------------
// Gate spec
// ---------------------------------------------------------------------------

/// Thresholds to evaluate against one slice of the evaluation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceThresholds {
    /// Exact slice match: the overall slice is the empty mapping.
    #[serde(default)]
    pub slice: SliceKey,
    pub thresholds: Vec<Threshold>,
}

/// The declarative gate configuration: one group per slice, evaluated in
/// order. Supplied once per pipeline definition and static afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSpec {
    pub slices: Vec<SliceThresholds>,
}

impl GateSpec {
    /// Structural validation. Rejects thresholds that can never be evaluated
    /// meaningfully: a Value threshold with no bounds or inverted bounds, a
    /// Change threshold with neither an absolute nor a relative bound.
    pub fn validate(&self) -> Result<(), SpecError> {
        for group in &self.slices {
            for t in &group.thresholds {
                match t {
                    Threshold::Value {
                        metric,
                        lower_bound,
                        upper_bound,
                    } => {
                        if lower_bound.is_none() && upper_bound.is_none() {
                            return Err(SpecError::NoBounds {
                                metric: metric.clone(),
                                slice: group.slice.clone(),
                            });
                        }
                        if let (Some(lo), Some(hi)) = (lower_bound, upper_bound) {
                            if lo > hi {
                                return Err(SpecError::InvertedBounds {
                                    metric: metric.clone(),
                                    slice: group.slice.clone(),
                                    lower: *lo,
                                    upper: *hi,
                                });
                            }
                        }
                    }
                    Threshold::Change {
                        metric,
                        absolute,
                        relative,
                        ..
                    } => {
                        if absolute.is_none() && relative.is_none() {
                            return Err(SpecError::NoBounds {
                                metric: metric.clone(),
                                slice: group.slice.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Errors raised by [`GateSpec::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum SpecError {
    /// A threshold configures no usable bound at all.
    NoBounds { metric: String, slice: SliceKey },
    /// lower_bound > upper_bound on a Value threshold.
    InvertedBounds {
        metric: String,
        slice: SliceKey,
        lower: f64,
        upper: f64,
    },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::NoBounds { metric, slice } => {
                write!(f, "threshold on '{metric}' (slice {slice}) configures no bounds")
            }
            SpecError::InvertedBounds {
                metric,
                slice,
                lower,
                upper,
            } => write!(
                f,
                "threshold on '{metric}' (slice {slice}) has lower_bound {lower} > upper_bound {upper}"
            ),
        }
    }
}

impl std::error::Error for SpecError {}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdStatus {
    Pass,
    Fail,
    /// The threshold could not be compared (no baseline value) and does not
    /// block the candidate.
    Skipped,
}

/// Result of evaluating one threshold against one slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    pub slice: SliceKey,
    pub threshold: Threshold,
    pub status: ThresholdStatus,
    /// Candidate value, when present in the candidate result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
    /// candidate − baseline, for Change thresholds with a baseline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    /// delta / baseline, for Change thresholds with a nonzero baseline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_delta: Option<f64>,
    /// Human-readable explanation for FAIL and SKIPPED outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The gate verdict: blessed iff no threshold anywhere actively failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub blessed: bool,
    /// Ordered as in the spec: slice group order, then threshold order.
    pub outcomes: Vec<ThresholdOutcome>,
}

impl Decision {
    /// (pass, fail, skipped) counts over all outcomes.
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut pass = 0;
        let mut fail = 0;
        let mut skipped = 0;
        for o in &self.outcomes {
            match o.status {
                ThresholdStatus::Pass => pass += 1,
                ThresholdStatus::Fail => fail += 1,
                ThresholdStatus::Skipped => skipped += 1,
            }
        }
        (pass, fail, skipped)
    }

    /// Stable-ordered list of fail reasons (empty when blessed).
    pub fn fail_reasons(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ThresholdStatus::Fail)
            .filter_map(|o| o.reason.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(threshold: Threshold) -> GateSpec {
        GateSpec {
            slices: vec![SliceThresholds {
                slice: SliceKey::overall(),
                thresholds: vec![threshold],
            }],
        }
    }

    #[test]
    fn validate_rejects_value_threshold_without_bounds() {
        let spec = spec_with(Threshold::Value {
            metric: "AUC".into(),
            lower_bound: None,
            upper_bound: None,
        });
        assert!(matches!(spec.validate(), Err(SpecError::NoBounds { .. })));
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let spec = spec_with(Threshold::Value {
            metric: "AUC".into(),
            lower_bound: Some(0.9),
            upper_bound: Some(0.5),
        });
        assert!(matches!(
            spec.validate(),
            Err(SpecError::InvertedBounds { .. })
        ));
    }

    #[test]
    fn validate_rejects_change_threshold_without_bounds() {
        let spec = spec_with(Threshold::Change {
            metric: "BinaryAccuracy".into(),
            direction: Direction::HigherIsBetter,
            absolute: None,
            relative: None,
        });
        assert!(matches!(spec.validate(), Err(SpecError::NoBounds { .. })));
    }

    #[test]
    fn validate_accepts_single_sided_bounds() {
        let spec = spec_with(Threshold::Value {
            metric: "AUC".into(),
            lower_bound: Some(0.5),
            upper_bound: None,
        });
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn spec_round_trips_through_json() {
        let spec = GateSpec {
            slices: vec![SliceThresholds {
                slice: SliceKey::from_pairs([("gender", "Male")]),
                thresholds: vec![
                    Threshold::Value {
                        metric: "BinaryAccuracy".into(),
                        lower_bound: Some(0.5),
                        upper_bound: None,
                    },
                    Threshold::Change {
                        metric: "BinaryAccuracy".into(),
                        direction: Direction::HigherIsBetter,
                        absolute: Some(0.0001),
                        relative: None,
                    },
                ],
            }],
        };
        let json = serde_json::to_string(&spec).unwrap();
        let back: GateSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }

    #[test]
    fn direction_serializes_screaming_snake() {
        let json = serde_json::to_string(&Direction::HigherIsBetter).unwrap();
        assert_eq!(json, "\"HIGHER_IS_BETTER\"");
    }
}
