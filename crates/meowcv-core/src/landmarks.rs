//! Landmark provider contract and the named-index accessor layer.
//!
//! The feature extractor never indexes landmarks positionally. It asks a
//! [`LandmarkSet`] for named anatomical points, and the set resolves them
//! through the [`MeshLayout`] of the model that produced it. Swapping in a
//! different landmark model only requires a new layout.

use crate::decoder::PixelBuffer;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("model file not found: {0}; place the face-mesh ONNX model in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LandmarkError {
    #[error("landmark set has {actual} points, layout requires at least {required}")]
    TooFewPoints { required: usize, actual: usize },
}

/// A normalized landmark. `x`/`y` are relative to image width/height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Relative depth, model-defined scale. Unused by the classifier.
    pub z: f32,
}

/// Positional indices of the points the feature extractor needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshLayout {
    pub upper_left_eyelid: usize,
    pub lower_left_eyelid: usize,
    pub upper_right_eyelid: usize,
    pub lower_right_eyelid: usize,
    pub upper_inner_lip: usize,
    pub lower_inner_lip: usize,
}

impl MeshLayout {
    /// 468-point face mesh topology.
    pub const FACE_MESH_468: MeshLayout = MeshLayout {
        upper_left_eyelid: 159,
        lower_left_eyelid: 145,
        upper_right_eyelid: 386,
        lower_right_eyelid: 374,
        upper_inner_lip: 13,
        lower_inner_lip: 14,
    };

    /// Smallest point count that makes every index valid.
    pub fn required_points(&self) -> usize {
        [
            self.upper_left_eyelid,
            self.lower_left_eyelid,
            self.upper_right_eyelid,
            self.lower_right_eyelid,
            self.upper_inner_lip,
            self.lower_inner_lip,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// Landmarks of exactly one face, validated against their layout.
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
    layout: MeshLayout,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>, layout: MeshLayout) -> Result<Self, LandmarkError> {
        let required = layout.required_points();
        if points.len() < required {
            return Err(LandmarkError::TooFewPoints {
                required,
                actual: points.len(),
            });
        }
        Ok(Self { points, layout })
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn layout(&self) -> &MeshLayout {
        &self.layout
    }

    pub fn upper_left_eyelid(&self) -> Landmark {
        self.points[self.layout.upper_left_eyelid]
    }

    pub fn lower_left_eyelid(&self) -> Landmark {
        self.points[self.layout.lower_left_eyelid]
    }

    pub fn upper_right_eyelid(&self) -> Landmark {
        self.points[self.layout.upper_right_eyelid]
    }

    pub fn lower_right_eyelid(&self) -> Landmark {
        self.points[self.layout.lower_right_eyelid]
    }

    pub fn upper_inner_lip(&self) -> Landmark {
        self.points[self.layout.upper_inner_lip]
    }

    pub fn lower_inner_lip(&self) -> Landmark {
        self.points[self.layout.lower_inner_lip]
    }
}

/// Source of facial landmarks for a decoded RGB image.
///
/// Returns `Ok(None)` when no face is found. When several faces are present
/// the provider picks one; which one is its own policy.
pub trait LandmarkProvider {
    fn extract(&mut self, image: &PixelBuffer) -> Result<Option<LandmarkSet>, ProviderError>;
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for Box<P> {
    fn extract(&mut self, image: &PixelBuffer) -> Result<Option<LandmarkSet>, ProviderError> {
        (**self).extract(image)
    }
}
