use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Slices
// ---------------------------------------------------------------------------

/// Identifies the evaluation-data subset a metric was computed over.
///
/// The empty mapping is the whole-dataset ("overall") slice. Feature-keyed
/// slices map feature name -> feature value, e.g. `{gender: Male}`. Keys are
/// kept sorted so two slices with the same bindings compare equal regardless
/// of construction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceKey(pub BTreeMap<String, String>);

impl SliceKey {
    /// The whole-dataset slice.
    pub fn overall() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_overall(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "overall");
        }
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// One named metric value computed over one slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Metric identifier, e.g. `"AUC"`, `"BinaryAccuracy"`.
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub slice: SliceKey,
}

/// Evaluation output for exactly one model artifact. Immutable once produced;
/// the pipeline records it as a JSON artifact before the gate runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub model_id: Uuid,
    /// Ordered collection, grouped by slice by convention of the evaluator
    /// that produced it. Order is preserved verbatim.
    pub metrics: Vec<MetricValue>,
}

impl EvaluationResult {
    pub fn new(model_id: Uuid, metrics: Vec<MetricValue>) -> Self {
        Self { model_id, metrics }
    }

    /// Look up a metric by exact slice + name. First match wins.
    pub fn value(&self, slice: &SliceKey, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.slice == *slice && m.name == name)
            .map(|m| m.value)
    }

    /// Distinct slices present in this result, in first-seen order.
    pub fn slices(&self) -> Vec<&SliceKey> {
        let mut seen: Vec<&SliceKey> = Vec::new();
        for m in &self.metrics {
            if !seen.contains(&&m.slice) {
                seen.push(&m.slice);
            }
        }
        seen
    }
}

// ---------------------------------------------------------------------------
// Model artifacts
// ---------------------------------------------------------------------------

/// Lifecycle of a trained model with respect to serving approval.
///
/// Every artifact starts `Unblessed`. The promotion gate moves it to
/// `Blessed` or `Rejected` exactly once; there are no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlessingStatus {
    Unblessed,
    Blessed,
    Rejected,
}

impl fmt::Display for BlessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlessingStatus::Unblessed => write!(f, "UNBLESSED"),
            BlessingStatus::Blessed => write!(f, "BLESSED"),
            BlessingStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A trained model artifact as tracked by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub id: Uuid,
    /// Human-readable model name, e.g. `"customer-churn"`.
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Where the trainer wrote the model, e.g. a directory path or URI.
    pub storage_uri: String,
    pub blessing: BlessingStatus,
}

impl ModelArtifact {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>, storage_uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at,
            storage_uri: storage_uri.into(),
            blessing: BlessingStatus::Unblessed,
        }
    }

    /// Apply a gate decision. Decide-once: errors without mutating unless the
    /// artifact is still `Unblessed`.
    pub fn decide(&mut self, blessed: bool) -> Result<(), AlreadyDecided> {
        if self.blessing != BlessingStatus::Unblessed {
            return Err(AlreadyDecided {
                id: self.id,
                status: self.blessing,
            });
        }
        self.blessing = if blessed {
            BlessingStatus::Blessed
        } else {
            BlessingStatus::Rejected
        };
        Ok(())
    }
}

/// Attempt to run the gate on an artifact whose blessing is already settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyDecided {
    pub id: Uuid,
    pub status: BlessingStatus,
}

impl fmt::Display for AlreadyDecided {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model {} already decided: status is {}, expected UNBLESSED",
            self.id, self.status
        )
    }
}

impl std::error::Error for AlreadyDecided {}

// ---------------------------------------------------------------------------
// Push records
// ---------------------------------------------------------------------------

/// Record that a blessed model was exported to a serving location.
/// Created only after a successful bless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRecord {
    pub model_id: Uuid,
    pub storage_uri: String,
    pub destination: String,
    pub pushed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_key_orders_pairs_deterministically() {
        let a = SliceKey::from_pairs([("gender", "Male"), ("Partner", "Yes")]);
        let b = SliceKey::from_pairs([("Partner", "Yes"), ("gender", "Male")]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Partner=Yes,gender=Male");
    }

    #[test]
    fn overall_slice_displays_as_overall() {
        assert_eq!(SliceKey::overall().to_string(), "overall");
        assert!(SliceKey::overall().is_overall());
    }

    #[test]
    fn evaluation_result_lookup_is_slice_exact() {
        let male = SliceKey::from_pairs([("gender", "Male")]);
        let result = EvaluationResult::new(
            Uuid::new_v4(),
            vec![
                MetricValue {
                    name: "AUC".into(),
                    value: 0.91,
                    slice: SliceKey::overall(),
                },
                MetricValue {
                    name: "AUC".into(),
                    value: 0.87,
                    slice: male.clone(),
                },
            ],
        );

        assert_eq!(result.value(&SliceKey::overall(), "AUC"), Some(0.91));
        assert_eq!(result.value(&male, "AUC"), Some(0.87));
        assert_eq!(result.value(&male, "Recall"), None);
        assert_eq!(result.slices().len(), 2);
    }

    #[test]
    fn decide_is_once_and_only_once() {
        let mut artifact = ModelArtifact::new("churn", Utc::now(), "/tmp/model");
        assert_eq!(artifact.blessing, BlessingStatus::Unblessed);

        artifact.decide(true).unwrap();
        assert_eq!(artifact.blessing, BlessingStatus::Blessed);

        let err = artifact.decide(false).unwrap_err();
        assert_eq!(err.status, BlessingStatus::Blessed);
        // No mutation on the failed attempt.
        assert_eq!(artifact.blessing, BlessingStatus::Blessed);
    }

    #[test]
    fn decide_rejected_stays_rejected() {
        let mut artifact = ModelArtifact::new("churn", Utc::now(), "/tmp/model");
        artifact.decide(false).unwrap();
        assert_eq!(artifact.blessing, BlessingStatus::Rejected);
        assert!(artifact.decide(true).is_err());
        assert_eq!(artifact.blessing, BlessingStatus::Rejected);
    }

    #[test]
    fn blessing_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&BlessingStatus::Unblessed).unwrap();
        assert_eq!(json, "\"UNBLESSED\"");
    }
}
