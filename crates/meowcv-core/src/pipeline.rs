//! Per-request orchestration: decode → landmarks → features → classify → asset.

use crate::assets::AssetResolver;
use crate::classifier::classify;
use crate::decoder::{self, DecodeError, PixelBuffer};
use crate::features;
use crate::landmarks::{LandmarkProvider, ProviderError};
use crate::thresholds::{ThresholdStore, ThresholdUpdate, ThresholdUpdateError};
use crate::types::{ClassificationResult, ThresholdConfig};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("no image data in request")]
    MissingImage,
    #[error("cannot decode image: {0}")]
    Decode(#[from] DecodeError),
    #[error("landmark inference failed: {0}")]
    Inference(#[from] ProviderError),
}

/// One landmark provider wired to the shared thresholds and asset mapping.
pub struct Pipeline<P> {
    provider: P,
    thresholds: Arc<ThresholdStore>,
    assets: AssetResolver,
}

impl<P: LandmarkProvider> Pipeline<P> {
    pub fn new(provider: P, thresholds: Arc<ThresholdStore>, assets: AssetResolver) -> Self {
        Self {
            provider,
            thresholds,
            assets,
        }
    }

    /// Classify an encoded image payload. `None` means the request carried
    /// no image field at all.
    pub fn detect(&mut self, payload: Option<&str>) -> ClassificationResult {
        let Some(payload) = payload else {
            return ClassificationResult::Failed(DetectError::MissingImage);
        };
        match decoder::decode_payload(payload) {
            Ok(pixels) => self.detect_pixels(&pixels),
            Err(e) => ClassificationResult::Failed(e.into()),
        }
    }

    /// Classify an already decoded image.
    pub fn detect_pixels(&mut self, pixels: &PixelBuffer) -> ClassificationResult {
        let landmarks = match self.provider.extract(pixels) {
            Ok(Some(landmarks)) => landmarks,
            Ok(None) => return ClassificationResult::NoFaceFound,
            Err(e) => return ClassificationResult::Failed(e.into()),
        };

        let features = features::extract(&landmarks);
        let thresholds = self.thresholds.snapshot();
        let category = classify(&features, &thresholds);

        tracing::debug!(
            eye_opening = features.eye_opening,
            mouth_opening = features.mouth_opening,
            %category,
            "classified"
        );

        ClassificationResult::Detected {
            category,
            features,
            asset: self.assets.resolve(category),
            message: format!("detected: {category}"),
        }
    }

    /// Administrative threshold update; does not touch the provider.
    pub fn update_thresholds(
        &self,
        update: &ThresholdUpdate,
    ) -> Result<ThresholdConfig, ThresholdUpdateError> {
        self.thresholds.update(update)
    }
}
