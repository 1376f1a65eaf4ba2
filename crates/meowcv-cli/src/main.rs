use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use meowcv_core::face_mesh::DEFAULT_MIN_FACE_CONFIDENCE;
use meowcv_core::{
    AssetResolver, ClassificationResult, ExpressionCategory, FaceMesh, Pipeline, TensorLayout,
    ThresholdConfig, ThresholdStore, ThresholdUpdate,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "meowcv", about = "MeowCV expression detection CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the expression in a local image file
    Classify {
        /// Image file (PNG, JPEG, ...)
        image: PathBuf,
        /// Directory containing face_landmark.onnx
        #[arg(long, env = "MEOWCV_MODEL_DIR")]
        model_dir: Option<PathBuf>,
        /// Input tensor layout of the model (nhwc or nchw)
        #[arg(long, default_value = "nhwc")]
        layout: TensorLayout,
        /// Override the shock threshold
        #[arg(long)]
        eye_opening: Option<f64>,
        /// Override the tongue threshold
        #[arg(long)]
        mouth_open: Option<f64>,
        /// Override the glare threshold
        #[arg(long)]
        squinting: Option<f64>,
    },
    /// Print the category to asset mapping, or resolve a single label
    Assets {
        label: Option<String>,
        #[arg(long, default_value = "/assets")]
        root: String,
    },
    /// Print the default thresholds
    Thresholds,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            image,
            model_dir,
            layout,
            eye_opening,
            mouth_open,
            squinting,
        } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("failed to read {}", image.display()))?;
            let pixels = meowcv_core::decode_bytes(&bytes)
                .with_context(|| format!("cannot decode {}", image.display()))?;

            let thresholds = Arc::new(ThresholdStore::default());
            let overrides = ThresholdUpdate {
                eye_opening: eye_opening.map(Into::into),
                mouth_open: mouth_open.map(Into::into),
                squinting: squinting.map(Into::into),
            };
            let active = thresholds.update(&overrides)?;

            let model_path = model_dir
                .unwrap_or_else(meowcv_core::default_model_dir)
                .join(meowcv_core::FACE_MESH_MODEL_FILE);
            let mesh = FaceMesh::load(
                &model_path.to_string_lossy(),
                layout,
                DEFAULT_MIN_FACE_CONFIDENCE,
            )?;

            let mut pipeline = Pipeline::new(mesh, thresholds, AssetResolver::new("/assets"));
            println!(
                "thresholds: eye_opening={} mouth_open={} squinting={}",
                active.eye_opening, active.mouth_open, active.squinting
            );
            match pipeline.detect_pixels(&pixels) {
                ClassificationResult::Detected {
                    category,
                    features,
                    asset,
                    message,
                } => {
                    println!("{message}");
                    println!(
                        "features: eye_opening={:.4} mouth_opening={:.4}",
                        features.eye_opening, features.mouth_opening
                    );
                    println!("expression: {category}");
                    println!("asset: {asset}");
                }
                ClassificationResult::NoFaceFound => println!("no face detected"),
                ClassificationResult::Failed(e) => bail!(e),
            }
        }
        Commands::Assets { label, root } => {
            let resolver = AssetResolver::new(root);
            match label {
                Some(label) => println!("{}", resolver.resolve_label(&label)),
                None => {
                    for category in ExpressionCategory::ALL {
                        println!("{category:<8} {}", resolver.resolve(category));
                    }
                }
            }
        }
        Commands::Thresholds => {
            println!("{}", serde_json::to_string_pretty(&ThresholdConfig::default())?);
        }
    }

    Ok(())
}
