use meowcv_core::{
    AssetResolver, ClassificationResult, DetectError, LandmarkProvider, Pipeline, ProviderError,
    ThresholdConfig, ThresholdStore, ThresholdUpdate, ThresholdUpdateError,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending jobs each worker will queue before senders wait.
const WORKER_QUEUE_DEPTH: usize = 4;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("landmark provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("failed to spawn inference worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("detection timed out after {0:?}")]
    Timeout(Duration),
    #[error("inference worker exited")]
    ChannelClosed,
}

/// A detect request travelling from an HTTP handler to a worker thread.
struct DetectJob {
    image: Option<String>,
    reply: oneshot::Sender<ClassificationResult>,
}

/// Clone-safe handle to the inference worker pool.
#[derive(Clone)]
pub struct EngineHandle {
    workers: Arc<[mpsc::Sender<DetectJob>]>,
    next: Arc<AtomicUsize>,
    thresholds: Arc<ThresholdStore>,
    detect_timeout: Duration,
}

impl EngineHandle {
    /// Run the detection pipeline on the next worker in round-robin order.
    ///
    /// The timeout bounds how long the caller waits, not the inference
    /// itself: a worker stuck in the model stays busy until it returns.
    pub async fn detect(&self, image: Option<String>) -> Result<ClassificationResult, EngineError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        let worker = &self.workers[idx];

        let round_trip = async {
            let (reply_tx, reply_rx) = oneshot::channel();
            worker
                .send(DetectJob {
                    image,
                    reply: reply_tx,
                })
                .await
                .map_err(|_| EngineError::ChannelClosed)?;
            reply_rx.await.map_err(|_| EngineError::ChannelClosed)
        };

        tokio::time::timeout(self.detect_timeout, round_trip)
            .await
            .map_err(|_| EngineError::Timeout(self.detect_timeout))?
    }

    /// Administrative threshold update. Applied directly to the shared store;
    /// jobs already classified keep their result.
    pub fn update_thresholds(
        &self,
        update: &ThresholdUpdate,
    ) -> Result<ThresholdConfig, ThresholdUpdateError> {
        self.thresholds.update(update)
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        self.thresholds.snapshot()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

/// Spawn `workers` inference threads, each owning its own provider.
///
/// Providers are created on the calling thread so a missing or broken
/// model fails startup instead of the first request.
pub fn spawn_engine<P, F>(
    workers: usize,
    detect_timeout: Duration,
    thresholds: Arc<ThresholdStore>,
    assets: AssetResolver,
    mut load_provider: F,
) -> Result<EngineHandle, EngineError>
where
    P: LandmarkProvider + Send + 'static,
    F: FnMut(usize) -> Result<P, ProviderError>,
{
    let workers = workers.max(1);
    let mut senders = Vec::with_capacity(workers);

    for worker in 0..workers {
        let provider = load_provider(worker)?;
        let mut pipeline = Pipeline::new(provider, Arc::clone(&thresholds), assets.clone());
        let (tx, mut rx) = mpsc::channel::<DetectJob>(WORKER_QUEUE_DEPTH);

        std::thread::Builder::new()
            .name(format!("meowcv-engine-{worker}"))
            .spawn(move || {
                tracing::info!(worker, "inference worker started");
                while let Some(job) = rx.blocking_recv() {
                    let result = run_job(&mut pipeline, job.image.as_deref(), worker);
                    let _ = job.reply.send(result);
                }
                tracing::info!(worker, "inference worker exiting");
            })?;

        senders.push(tx);
    }

    tracing::info!(workers, ?detect_timeout, "inference engine ready");

    Ok(EngineHandle {
        workers: senders.into(),
        next: Arc::new(AtomicUsize::new(0)),
        thresholds,
        detect_timeout,
    })
}

/// Run one job. A panicking provider becomes an inference failure so the
/// worker keeps serving.
fn run_job<P: LandmarkProvider>(
    pipeline: &mut Pipeline<P>,
    image: Option<&str>,
    worker: usize,
) -> ClassificationResult {
    let result = panic::catch_unwind(AssertUnwindSafe(|| pipeline.detect(image)))
        .unwrap_or_else(|_| {
            tracing::error!(worker, "landmark provider panicked");
            ClassificationResult::Failed(DetectError::Inference(ProviderError::InferenceFailed(
                "landmark provider panicked".into(),
            )))
        });

    match &result {
        ClassificationResult::Detected { category, .. } => {
            tracing::debug!(worker, %category, "detect: face classified");
        }
        ClassificationResult::NoFaceFound => tracing::debug!(worker, "detect: no face"),
        ClassificationResult::Failed(e) => tracing::warn!(worker, error = %e, "detect failed"),
    }
    result
}
