//! Process-wide threshold store.
//!
//! Readers always get a copy of the whole [`ThresholdConfig`]; writers
//! validate every supplied field before taking the write lock, so an update
//! is applied completely or not at all.

use crate::types::ThresholdConfig;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// Partial threshold update as received from an administrative request.
///
/// Values are kept as raw JSON so numeric strings can be accepted and
/// every offending field can be reported at once. `None` means the key was
/// absent; an explicit `null` is kept as `Some(Value::Null)` and rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdUpdate {
    #[serde(default, deserialize_with = "present")]
    pub eye_opening: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub mouth_open: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub squinting: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ThresholdUpdate {
    pub fn eye_opening(value: f64) -> Self {
        Self {
            eye_opening: Some(Value::from(value)),
            ..Self::default()
        }
    }

    pub fn mouth_open(value: f64) -> Self {
        Self {
            mouth_open: Some(Value::from(value)),
            ..Self::default()
        }
    }

    pub fn squinting(value: f64) -> Self {
        Self {
            squinting: Some(Value::from(value)),
            ..Self::default()
        }
    }
}

/// A single field that could not be converted to a finite float.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidThresholdValue {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for InvalidThresholdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} is not a number", self.field, self.value)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid threshold update: {}", join_invalid(.invalid))]
pub struct ThresholdUpdateError {
    pub invalid: Vec<InvalidThresholdValue>,
}

fn join_invalid(invalid: &[InvalidThresholdValue]) -> String {
    invalid
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Shared, internally synchronized threshold configuration.
#[derive(Debug)]
pub struct ThresholdStore {
    current: RwLock<ThresholdConfig>,
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

impl ThresholdStore {
    pub fn new(initial: ThresholdConfig) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Copy of the configuration as of this call.
    pub fn snapshot(&self) -> ThresholdConfig {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the supplied fields, leaving the others unchanged.
    ///
    /// Returns the configuration as it stands right after this update.
    pub fn update(
        &self,
        update: &ThresholdUpdate,
    ) -> Result<ThresholdConfig, ThresholdUpdateError> {
        let mut invalid = Vec::new();
        let mut parse = |field: &'static str, raw: &Option<Value>| -> Option<f64> {
            let raw = raw.as_ref()?;
            let parsed = to_float(raw);
            if parsed.is_none() {
                invalid.push(InvalidThresholdValue {
                    field,
                    value: raw.to_string(),
                });
            }
            parsed
        };

        let eye_opening = parse("eye_opening", &update.eye_opening);
        let mouth_open = parse("mouth_open", &update.mouth_open);
        let squinting = parse("squinting", &update.squinting);

        if !invalid.is_empty() {
            tracing::warn!(count = invalid.len(), "threshold update rejected");
            return Err(ThresholdUpdateError { invalid });
        }

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(v) = eye_opening {
            current.eye_opening = v;
        }
        if let Some(v) = mouth_open {
            current.mouth_open = v;
        }
        if let Some(v) = squinting {
            current.squinting = v;
        }

        let updated = *current;
        tracing::info!(
            eye_opening = updated.eye_opening,
            mouth_open = updated.mouth_open,
            squinting = updated.squinting,
            "thresholds updated"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Barrier};

    fn parse_update(body: Value) -> ThresholdUpdate {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_partial_update_leaves_other_fields() {
        let store = ThresholdStore::default();
        let updated = store.update(&ThresholdUpdate::eye_opening(0.04)).unwrap();
        assert_eq!(updated.eye_opening, 0.04);
        assert_eq!(updated.mouth_open, 0.03);
        assert_eq!(updated.squinting, 0.018);
        assert_eq!(store.snapshot(), updated);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let store = ThresholdStore::default();
        let updated = store
            .update(&parse_update(json!({ "squinting": " 0.01 " })))
            .unwrap();
        assert_eq!(updated.squinting, 0.01);
    }

    #[test]
    fn test_invalid_field_aborts_whole_update() {
        let store = ThresholdStore::default();
        let err = store
            .update(&parse_update(json!({
                "eye_opening": 0.05,
                "mouth_open": "wide",
                "squinting": null
            })))
            .unwrap_err();

        let fields: Vec<_> = err.invalid.iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["mouth_open", "squinting"]);
        assert_eq!(store.snapshot(), ThresholdConfig::default());
    }

    #[test]
    fn test_explicit_null_is_not_an_absent_key() {
        let update = parse_update(json!({ "eye_opening": 0.05, "squinting": null }));
        assert_eq!(update.squinting, Some(Value::Null));
        assert_eq!(update.mouth_open, None);

        let store = ThresholdStore::default();
        let err = store.update(&update).unwrap_err();
        assert_eq!(
            err.invalid,
            vec![InvalidThresholdValue {
                field: "squinting",
                value: "null".into()
            }]
        );
        assert_eq!(store.snapshot(), ThresholdConfig::default());
    }

    #[test]
    fn test_non_finite_rejected() {
        let store = ThresholdStore::default();
        assert!(store.update(&parse_update(json!({ "eye_opening": "NaN" }))).is_err());
        assert!(store.update(&parse_update(json!({ "eye_opening": "inf" }))).is_err());
        assert!(store.update(&parse_update(json!({ "eye_opening": true }))).is_err());
    }

    #[test]
    fn test_unknown_field_rejected_at_parse() {
        let result = serde_json::from_value::<ThresholdUpdate>(json!({ "eyebrows": 0.1 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_update_is_noop() {
        let store = ThresholdStore::default();
        let updated = store.update(&ThresholdUpdate::default()).unwrap();
        assert_eq!(updated, ThresholdConfig::default());
    }

    #[test]
    fn test_error_names_each_field() {
        let err = ThresholdUpdateError {
            invalid: vec![
                InvalidThresholdValue { field: "eye_opening", value: "\"x\"".into() },
                InvalidThresholdValue { field: "squinting", value: "null".into() },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("eye_opening"), "{msg}");
        assert!(msg.contains("squinting"), "{msg}");
    }

    #[test]
    fn test_concurrent_disjoint_updates_both_apply() {
        for _ in 0..50 {
            let store = Arc::new(ThresholdStore::default());
            let barrier = Arc::new(Barrier::new(2));

            let updates = [
                ThresholdUpdate::eye_opening(0.04),
                ThresholdUpdate::mouth_open(0.06),
            ];
            let handles: Vec<_> = updates
                .into_iter()
                .map(|update| {
                    let store = Arc::clone(&store);
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        store.update(&update).unwrap();
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }

            let snap = store.snapshot();
            assert_eq!(snap.eye_opening, 0.04);
            assert_eq!(snap.mouth_open, 0.06);
            assert_eq!(snap.squinting, 0.018);
        }
    }

    #[test]
    fn test_snapshot_never_observes_mixed_update() {
        let store = Arc::new(ThresholdStore::default());
        let a = ThresholdConfig { eye_opening: 1.0, mouth_open: 1.0, squinting: 1.0 };
        let b = ThresholdConfig { eye_opening: 2.0, mouth_open: 2.0, squinting: 2.0 };

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..2000 {
                    let t = if i % 2 == 0 { a } else { b };
                    let update = ThresholdUpdate {
                        eye_opening: Some(Value::from(t.eye_opening)),
                        mouth_open: Some(Value::from(t.mouth_open)),
                        squinting: Some(Value::from(t.squinting)),
                    };
                    store.update(&update).unwrap();
                }
            })
        };

        for _ in 0..2000 {
            let snap = store.snapshot();
            let consistent = snap == ThresholdConfig::default() || snap == a || snap == b;
            assert!(consistent, "torn snapshot: {snap:?}");
        }
        writer.join().unwrap();
    }
}
