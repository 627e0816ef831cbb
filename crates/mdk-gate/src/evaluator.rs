use mdk_schemas::{EvaluationResult, SliceKey};

use crate::types::{
    Decision, Direction, GateSpec, Threshold, ThresholdOutcome, ThresholdStatus,
};

// ============================================================================
// Public API
// ============================================================================

/// Evaluate a candidate's metrics against the gate spec.
///
/// Pure over its inputs: identical (candidate, baseline, spec) always produce
/// an identical [`Decision`]. `baseline = None` is the cold-start sentinel —
/// every Change threshold degrades to SKIPPED instead of failing.
///
/// Outcomes are emitted in spec order (slice group order, then threshold
/// order within the group). A missing candidate metric fails that threshold
/// with a reason naming the slice and metric; evaluation of the remaining
/// thresholds continues.
pub fn evaluate(
    spec: &GateSpec,
    candidate: &EvaluationResult,
    baseline: Option<&EvaluationResult>,
) -> Decision {
    let mut outcomes = Vec::new();

    for group in &spec.slices {
        for threshold in &group.thresholds {
            let outcome = match threshold {
                Threshold::Value {
                    metric,
                    lower_bound,
                    upper_bound,
                } => check_value(
                    &group.slice,
                    threshold,
                    metric,
                    *lower_bound,
                    *upper_bound,
                    candidate.value(&group.slice, metric),
                ),
                Threshold::Change {
                    metric,
                    direction,
                    absolute,
                    relative,
                } => check_change(
                    &group.slice,
                    threshold,
                    metric,
                    *direction,
                    *absolute,
                    *relative,
                    candidate.value(&group.slice, metric),
                    baseline.and_then(|b| b.value(&group.slice, metric)),
                ),
            };
            outcomes.push(outcome);
        }
    }

    let blessed = outcomes
        .iter()
        .all(|o| o.status != ThresholdStatus::Fail);

    Decision { blessed, outcomes }
}

// ============================================================================
// Value thresholds
// ============================================================================

fn check_value(
    slice: &SliceKey,
    threshold: &Threshold,
    metric: &str,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
    observed: Option<f64>,
) -> ThresholdOutcome {
    let base = ThresholdOutcome {
        slice: slice.clone(),
        threshold: threshold.clone(),
        status: ThresholdStatus::Pass,
        observed,
        delta: None,
        relative_delta: None,
        reason: None,
    };

    let value = match observed {
        None => {
            return ThresholdOutcome {
                status: ThresholdStatus::Fail,
                reason: Some(format!(
                    "metric '{metric}' missing from candidate for slice {slice}"
                )),
                ..base
            }
        }
        Some(v) => v,
    };

    if value.is_nan() {
        return ThresholdOutcome {
            status: ThresholdStatus::Fail,
            reason: Some(format!("metric '{metric}' is NaN for slice {slice}")),
            ..base
        };
    }

    // Inclusive bounds; a NaN value never reaches these comparisons.
    if let Some(lo) = lower_bound {
        if value < lo {
            return ThresholdOutcome {
                status: ThresholdStatus::Fail,
                reason: Some(format!(
                    "metric '{metric}' = {value:.6} < lower_bound {lo:.6} (slice {slice})"
                )),
                ..base
            };
        }
    }
    if let Some(hi) = upper_bound {
        if value > hi {
            return ThresholdOutcome {
                status: ThresholdStatus::Fail,
                reason: Some(format!(
                    "metric '{metric}' = {value:.6} > upper_bound {hi:.6} (slice {slice})"
                )),
                ..base
            };
        }
    }

    base
}

// ============================================================================
// Change thresholds
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn check_change(
    slice: &SliceKey,
    threshold: &Threshold,
    metric: &str,
    direction: Direction,
    absolute: Option<f64>,
    relative: Option<f64>,
    observed: Option<f64>,
    baseline: Option<f64>,
) -> ThresholdOutcome {
    let base = ThresholdOutcome {
        slice: slice.clone(),
        threshold: threshold.clone(),
        status: ThresholdStatus::Pass,
        observed,
        delta: None,
        relative_delta: None,
        reason: None,
    };

    // The candidate must always carry the metric it is being gated on.
    let cand = match observed {
        None => {
            return ThresholdOutcome {
                status: ThresholdStatus::Fail,
                reason: Some(format!(
                    "metric '{metric}' missing from candidate for slice {slice}"
                )),
                ..base
            }
        }
        Some(v) => v,
    };

    // No comparison point: first model ever trained, or the baseline never
    // computed this metric for this slice. Non-blocking by design.
    let base_value = match baseline {
        None => {
            return ThresholdOutcome {
                status: ThresholdStatus::Skipped,
                reason: Some(format!(
                    "no baseline value for metric '{metric}' in slice {slice}"
                )),
                ..base
            }
        }
        Some(v) => v,
    };

    if cand.is_nan() || base_value.is_nan() {
        return ThresholdOutcome {
            status: ThresholdStatus::Fail,
            reason: Some(format!(
                "metric '{metric}' has a NaN operand (candidate {cand}, baseline {base_value}) for slice {slice}"
            )),
            ..base
        };
    }

    let delta = cand - base_value;
    let relative_delta = if base_value != 0.0 {
        Some(delta / base_value)
    } else {
        None
    };

    let enriched = ThresholdOutcome {
        delta: Some(delta),
        relative_delta,
        ..base
    };

    // AND semantics: every configured bound must hold.
    if let Some(abs_bound) = absolute {
        let ok = match direction {
            Direction::HigherIsBetter => delta >= abs_bound,
            Direction::LowerIsBetter => delta <= -abs_bound,
        };
        if !ok {
            return ThresholdOutcome {
                status: ThresholdStatus::Fail,
                reason: Some(format!(
                    "metric '{metric}' delta {delta:.6} misses absolute bound {abs_bound:.6} ({direction:?}, slice {slice})"
                )),
                ..enriched
            };
        }
    }

    if let Some(rel_bound) = relative {
        let rel = match relative_delta {
            // Relative change against a zero baseline is uncomputable;
            // fail closed rather than wave an unevaluable bound through.
            None => {
                return ThresholdOutcome {
                    status: ThresholdStatus::Fail,
                    reason: Some(format!(
                        "metric '{metric}' relative bound uncomputable: baseline is zero (slice {slice})"
                    )),
                    ..enriched
                }
            }
            Some(r) => r,
        };
        let ok = match direction {
            Direction::HigherIsBetter => rel >= rel_bound,
            Direction::LowerIsBetter => rel <= -rel_bound,
        };
        if !ok {
            return ThresholdOutcome {
                status: ThresholdStatus::Fail,
                reason: Some(format!(
                    "metric '{metric}' relative delta {rel:.6} misses relative bound {rel_bound:.6} ({direction:?}, slice {slice})"
                )),
                ..enriched
            };
        }
    }

    enriched
}
