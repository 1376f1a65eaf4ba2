use crate::types::{ExpressionCategory, FeatureVector, ThresholdConfig};

/// Map features to a category. First matching rule wins:
/// wide eyes, then open mouth, then narrowed eyes.
pub fn classify(features: &FeatureVector, thresholds: &ThresholdConfig) -> ExpressionCategory {
    if features.eye_opening > thresholds.eye_opening {
        ExpressionCategory::Shock
    } else if features.mouth_opening > thresholds.mouth_open {
        ExpressionCategory::Tongue
    } else if features.eye_opening < thresholds.squinting {
        ExpressionCategory::Glare
    } else {
        ExpressionCategory::Default
    }
}
