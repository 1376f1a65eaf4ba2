use meowcv_core::face_mesh::DEFAULT_MIN_FACE_CONFIDENCE;
use meowcv_core::TensorLayout;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_BIND: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3000));

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address for the HTTP server (default: 0.0.0.0:3000).
    pub bind: SocketAddr,
    /// Directory containing the face mesh ONNX model.
    pub model_dir: PathBuf,
    /// URL prefix under which category assets are served.
    pub assets_root: String,
    /// Number of inference worker threads, each with its own model session.
    pub inference_workers: usize,
    /// Minimum face-presence probability for a detection.
    pub min_face_confidence: f32,
    /// Input tensor layout expected by the model.
    pub tensor_layout: TensorLayout,
    /// Seconds a detect request waits for a worker reply.
    pub detect_timeout_secs: u64,
}

impl Config {
    /// Load configuration from `MEOWCV_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind: parsed(&get, "MEOWCV_BIND").unwrap_or(DEFAULT_BIND),
            model_dir: get("MEOWCV_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(meowcv_core::default_model_dir),
            assets_root: get("MEOWCV_ASSETS_ROOT").unwrap_or_else(|| "/assets".to_string()),
            inference_workers: parsed(&get, "MEOWCV_INFERENCE_WORKERS")
                .unwrap_or(2usize)
                .max(1),
            min_face_confidence: parsed(&get, "MEOWCV_MIN_FACE_CONFIDENCE")
                .unwrap_or(DEFAULT_MIN_FACE_CONFIDENCE),
            tensor_layout: parsed(&get, "MEOWCV_TENSOR_LAYOUT").unwrap_or_default(),
            detect_timeout_secs: parsed(&get, "MEOWCV_DETECT_TIMEOUT_SECS").unwrap_or(10),
        }
    }

    /// Path to the face mesh landmark model.
    pub fn face_mesh_model_path(&self) -> String {
        self.model_dir
            .join(meowcv_core::FACE_MESH_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    get(key).and_then(|v| v.trim().parse().ok())
}
