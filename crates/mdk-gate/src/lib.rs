mod evaluator;
mod types;

pub use evaluator::evaluate;
pub use types::{
    Decision, Direction, GateSpec, SliceThresholds, SpecError, Threshold, ThresholdOutcome,
    ThresholdStatus,
};
