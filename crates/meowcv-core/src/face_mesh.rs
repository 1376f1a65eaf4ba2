//! 468-point face mesh landmark provider via ONNX Runtime.
//!
//! Letterboxes the whole RGB frame into the square model input, runs the
//! mesh model once, and maps the predicted points back to coordinates
//! normalized against the source image.

use crate::decoder::PixelBuffer;
use crate::landmarks::{Landmark, LandmarkProvider, LandmarkSet, MeshLayout, ProviderError};
use image::imageops::{self, FilterType};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::str::FromStr;

// --- Named constants ---
const MESH_INPUT_SIZE: usize = 192;
const MESH_POINTS: usize = 468;
const MESH_VALUES_PER_POINT: usize = 3;
pub const DEFAULT_MIN_FACE_CONFIDENCE: f32 = 0.5;

/// Memory layout of the model's image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorLayout {
    /// `[1, H, W, 3]`, as exported from TFLite.
    #[default]
    Nhwc,
    /// `[1, 3, H, W]`.
    Nchw,
}

impl FromStr for TensorLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nhwc" => Ok(TensorLayout::Nhwc),
            "nchw" => Ok(TensorLayout::Nchw),
            other => Err(format!("unknown tensor layout: {other}")),
        }
    }
}

/// Metadata for coordinate de-mapping after letterbox resize.
#[derive(Debug, Clone, Copy)]
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Face mesh landmark model.
pub struct FaceMesh {
    session: Session,
    layout: TensorLayout,
    min_confidence: f32,
}

impl FaceMesh {
    /// Load the face mesh ONNX model from the given path.
    pub fn load(
        model_path: &str,
        layout: TensorLayout,
        min_confidence: f32,
    ) -> Result<Self, ProviderError> {
        if !Path::new(model_path).exists() {
            return Err(ProviderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            ?layout,
            min_confidence,
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face mesh model"
        );

        Ok(Self {
            session,
            layout,
            min_confidence,
        })
    }
}

impl LandmarkProvider for FaceMesh {
    fn extract(&mut self, image: &PixelBuffer) -> Result<Option<LandmarkSet>, ProviderError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(None);
        }

        let (input, letterbox) = letterbox_tensor(image, self.layout);
        let min_confidence = self.min_confidence;

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        // The mesh tensor is the only output with at least 468*3 values;
        // the face-presence logit is the single-value one.
        let mut mesh: Option<Vec<f32>> = None;
        let mut logit: Option<f32> = None;
        for idx in 0..outputs.len() {
            let (_, data) = outputs[idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| ProviderError::InferenceFailed(format!("output {idx}: {e}")))?;
            if mesh.is_none() && data.len() >= MESH_POINTS * MESH_VALUES_PER_POINT {
                mesh = Some(data.to_vec());
            } else if logit.is_none() && data.len() == 1 {
                logit = Some(data[0]);
            }
        }

        let mesh = mesh.ok_or_else(|| {
            ProviderError::InferenceFailed("model produced no landmark tensor".into())
        })?;
        let logit = logit.ok_or_else(|| {
            ProviderError::InferenceFailed("model produced no face score".into())
        })?;

        let score = sigmoid(logit);
        if score < min_confidence {
            tracing::debug!(score, min_confidence, "face mesh: no face");
            return Ok(None);
        }

        let points = decode_landmarks(&mesh, &letterbox, image.width(), image.height());
        let set = LandmarkSet::new(points, MeshLayout::FACE_MESH_468)
            .map_err(|e| ProviderError::InferenceFailed(e.to_string()))?;

        tracing::debug!(score, "face mesh: face found");
        Ok(Some(set))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Resize into the square model input preserving aspect ratio, pad with
/// black, and normalize to [0, 1].
fn letterbox_tensor(image: &PixelBuffer, layout: TensorLayout) -> (Array4<f32>, LetterboxInfo) {
    let width = image.width() as f32;
    let height = image.height() as f32;
    let size = MESH_INPUT_SIZE as f32;

    let scale = (size / width).min(size / height);
    let new_w = ((width * scale).round() as usize).clamp(1, MESH_INPUT_SIZE);
    let new_h = ((height * scale).round() as usize).clamp(1, MESH_INPUT_SIZE);
    // Integer offsets: the same values place the pixels and de-map the points.
    let pad_x_start = (MESH_INPUT_SIZE - new_w) / 2;
    let pad_y_start = (MESH_INPUT_SIZE - new_h) / 2;

    let resized = imageops::resize(
        image.as_rgb(),
        new_w as u32,
        new_h as u32,
        FilterType::Triangle,
    );

    let shape = match layout {
        TensorLayout::Nhwc => (1, MESH_INPUT_SIZE, MESH_INPUT_SIZE, 3),
        TensorLayout::Nchw => (1, 3, MESH_INPUT_SIZE, MESH_INPUT_SIZE),
    };
    let mut tensor = Array4::<f32>::zeros(shape);

    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = x as usize + pad_x_start;
        let ty = y as usize + pad_y_start;
        for c in 0..3 {
            let v = pixel.0[c] as f32 / 255.0;
            match layout {
                TensorLayout::Nhwc => tensor[[0, ty, tx, c]] = v,
                TensorLayout::Nchw => tensor[[0, c, ty, tx]] = v,
            }
        }
    }

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x_start as f32,
        pad_y: pad_y_start as f32,
    };
    (tensor, letterbox)
}

/// Map mesh points from model input pixels back to source-normalized units.
fn decode_landmarks(
    mesh: &[f32],
    letterbox: &LetterboxInfo,
    width: u32,
    height: u32,
) -> Vec<Landmark> {
    let w = width as f32;
    let h = height as f32;
    mesh.chunks_exact(MESH_VALUES_PER_POINT)
        .take(MESH_POINTS)
        .map(|p| Landmark {
            x: (p[0] - letterbox.pad_x) / letterbox.scale / w,
            y: (p[1] - letterbox.pad_y) / letterbox.scale / h,
            z: p[2] / letterbox.scale / w,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, value: u8) -> PixelBuffer {
        PixelBuffer::from_rgb(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
    }

    #[test]
    fn test_letterbox_shape_per_layout() {
        let img = solid(64, 32, 255);
        let (nhwc, _) = letterbox_tensor(&img, TensorLayout::Nhwc);
        assert_eq!(nhwc.shape(), &[1, MESH_INPUT_SIZE, MESH_INPUT_SIZE, 3]);
        let (nchw, _) = letterbox_tensor(&img, TensorLayout::Nchw);
        assert_eq!(nchw.shape(), &[1, 3, MESH_INPUT_SIZE, MESH_INPUT_SIZE]);
    }

    #[test]
    fn test_letterbox_pads_short_side() {
        // 2:1 landscape → content fills rows 48..144, padding above and below.
        let img = solid(200, 100, 255);
        let (tensor, lb) = letterbox_tensor(&img, TensorLayout::Nhwc);
        assert!((lb.scale - 0.96).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 48.0);
        assert_eq!(tensor[[0, 0, 96, 0]], 0.0);
        assert!((tensor[[0, 96, 96, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 191, 96, 2]], 0.0);
    }

    #[test]
    fn test_letterbox_coordinate_roundtrip() {
        let (width, height) = (320u32, 240u32);
        let img = solid(width, height, 10);
        let (_, lb) = letterbox_tensor(&img, TensorLayout::Nchw);

        // A point at (100, 50) px in the source, projected into model space.
        let mx = 100.0 * lb.scale + lb.pad_x;
        let my = 50.0 * lb.scale + lb.pad_y;
        let mut mesh = vec![0.0f32; MESH_POINTS * MESH_VALUES_PER_POINT];
        mesh[0] = mx;
        mesh[1] = my;

        let points = decode_landmarks(&mesh, &lb, width, height);
        assert_eq!(points.len(), MESH_POINTS);
        assert!((points[0].x - 100.0 / 320.0).abs() < 1e-4, "x: {}", points[0].x);
        assert!((points[0].y - 50.0 / 240.0).abs() < 1e-4, "y: {}", points[0].y);
    }

    #[test]
    fn test_odd_padding_maps_content_edge_to_zero() {
        // 200x101 → 192x97, leaving 95 rows of padding: 47 above, 48 below.
        let img = solid(200, 101, 255);
        let (tensor, lb) = letterbox_tensor(&img, TensorLayout::Nhwc);
        assert_eq!(lb.pad_y, 47.0);
        assert_eq!(tensor[[0, 46, 96, 0]], 0.0);
        assert!((tensor[[0, 47, 96, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 144, 96, 0]], 0.0);

        // The first content row in model space is the top edge of the source.
        let mut mesh = vec![0.0f32; MESH_POINTS * MESH_VALUES_PER_POINT];
        mesh[0] = lb.pad_x;
        mesh[1] = 47.0;
        let points = decode_landmarks(&mesh, &lb, 200, 101);
        assert!(points[0].x.abs() < 1e-6, "x: {}", points[0].x);
        assert!(points[0].y.abs() < 1e-6, "y: {}", points[0].y);
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(8.0) > 0.99);
        assert!(sigmoid(-8.0) < 0.01);
    }

    #[test]
    fn test_tensor_layout_parse() {
        assert_eq!("NHWC".parse::<TensorLayout>(), Ok(TensorLayout::Nhwc));
        assert_eq!("nchw".parse::<TensorLayout>(), Ok(TensorLayout::Nchw));
        assert!("hwc".parse::<TensorLayout>().is_err());
    }

    #[test]
    fn test_load_missing_model() {
        let result = FaceMesh::load(
            "/nonexistent/face_landmark.onnx",
            TensorLayout::Nhwc,
            DEFAULT_MIN_FACE_CONFIDENCE,
        );
        assert!(matches!(result, Err(ProviderError::ModelNotFound(_))));
    }
}
