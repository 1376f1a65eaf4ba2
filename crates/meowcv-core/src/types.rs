use crate::pipeline::DetectError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_EYE_OPENING: f64 = 0.025;
pub const DEFAULT_MOUTH_OPEN: f64 = 0.03;
pub const DEFAULT_SQUINTING: f64 = 0.018;

/// One of the four expression labels the classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionCategory {
    Shock,
    Tongue,
    Glare,
    Default,
}

impl ExpressionCategory {
    pub const ALL: [ExpressionCategory; 4] = [
        ExpressionCategory::Shock,
        ExpressionCategory::Tongue,
        ExpressionCategory::Glare,
        ExpressionCategory::Default,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExpressionCategory::Shock => "shock",
            ExpressionCategory::Tongue => "tongue",
            ExpressionCategory::Glare => "glare",
            ExpressionCategory::Default => "default",
        }
    }
}

impl fmt::Display for ExpressionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown expression category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ExpressionCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Scalar geometry derived from one face's landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    /// Mean vertical eyelid separation of both eyes, in normalized image units.
    pub eye_opening: f64,
    /// Vertical inner-lip separation, in normalized image units.
    pub mouth_opening: f64,
}

/// Classification cutoffs. Always handled by value; see [`crate::ThresholdStore`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Eye opening above this is `shock`.
    pub eye_opening: f64,
    /// Mouth opening above this is `tongue`.
    pub mouth_open: f64,
    /// Eye opening below this is `glare`.
    pub squinting: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            eye_opening: DEFAULT_EYE_OPENING,
            mouth_open: DEFAULT_MOUTH_OPEN,
            squinting: DEFAULT_SQUINTING,
        }
    }
}

/// Outcome of one detect request.
#[derive(Debug)]
pub enum ClassificationResult {
    Detected {
        category: ExpressionCategory,
        features: FeatureVector,
        asset: String,
        message: String,
    },
    /// The image decoded but contained no face. Not an error.
    NoFaceFound,
    Failed(DetectError),
}

impl ClassificationResult {
    pub fn is_detected(&self) -> bool {
        matches!(self, ClassificationResult::Detected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = ThresholdConfig::default();
        assert_eq!(t.eye_opening, 0.025);
        assert_eq!(t.mouth_open, 0.03);
        assert_eq!(t.squinting, 0.018);
    }

    #[test]
    fn test_category_parse_roundtrip() {
        for c in ExpressionCategory::ALL {
            assert_eq!(c.as_str().parse::<ExpressionCategory>(), Ok(c));
        }
        assert!("sleepy".parse::<ExpressionCategory>().is_err());
    }

    #[test]
    fn test_threshold_config_wire_names() {
        let json = serde_json::to_value(ThresholdConfig::default()).unwrap();
        assert_eq!(json["eye_opening"], 0.025);
        assert_eq!(json["mouth_open"], 0.03);
        assert_eq!(json["squinting"], 0.018);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&ExpressionCategory::Tongue).unwrap();
        assert_eq!(json, "\"tongue\"");
    }
}
