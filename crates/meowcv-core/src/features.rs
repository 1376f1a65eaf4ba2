use crate::landmarks::{Landmark, LandmarkSet};
use crate::types::FeatureVector;

fn vertical_gap(upper: Landmark, lower: Landmark) -> f64 {
    (f64::from(upper.y) - f64::from(lower.y)).abs()
}

/// Reduce a face's landmarks to eye and mouth opening.
pub fn extract(landmarks: &LandmarkSet) -> FeatureVector {
    let left_eye = vertical_gap(landmarks.upper_left_eyelid(), landmarks.lower_left_eyelid());
    let right_eye = vertical_gap(landmarks.upper_right_eyelid(), landmarks.lower_right_eyelid());

    FeatureVector {
        eye_opening: (left_eye + right_eye) / 2.0,
        mouth_opening: vertical_gap(landmarks.upper_inner_lip(), landmarks.lower_inner_lip()),
    }
}
