//! meowcv-core: Expression detection pipeline.
//!
//! Decodes a client camera still, extracts face-mesh landmarks via ONNX
//! Runtime, reduces them to eye/mouth opening features and classifies the
//! result against a shared, runtime-mutable threshold store.

pub mod assets;
pub mod classifier;
pub mod decoder;
pub mod face_mesh;
pub mod features;
pub mod landmarks;
pub mod pipeline;
pub mod thresholds;
pub mod types;

pub use assets::AssetResolver;
pub use classifier::classify;
pub use decoder::{decode_bytes, decode_payload, DecodeError, PixelBuffer};
pub use face_mesh::{FaceMesh, TensorLayout};
pub use landmarks::{Landmark, LandmarkProvider, LandmarkSet, MeshLayout, ProviderError};
pub use pipeline::{DetectError, Pipeline};
pub use thresholds::{ThresholdStore, ThresholdUpdate, ThresholdUpdateError};
pub use types::{ClassificationResult, ExpressionCategory, FeatureVector, ThresholdConfig};

use std::path::PathBuf;

/// File name of the face-mesh landmark model inside the model directory.
pub const FACE_MESH_MODEL_FILE: &str = "face_landmark.onnx";

/// Model directory used when `MEOWCV_MODEL_DIR` is not set.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}
