//! Mesh loading from the local filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use meshseq_core::Result;
use meshseq_stream::{
    CompletionSender, FetchCompletion, FetchOutcome, FetchRequest, GeometryResource, MeshLoader,
};

use crate::decoder::MeshDecoder;

/// Counters shared between the loader and its worker tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub requested: u64,
    pub loaded: u64,
    pub failed: u64,
    pub bytes_read: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

/// Reads mesh files relative to a root directory on a dedicated tokio
/// runtime, decodes them, and reports each result on the completion channel.
pub struct FileMeshLoader<D: MeshDecoder> {
    root: PathBuf,
    decoder: Arc<D>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    stats: Arc<Mutex<LoaderStats>>,
    runtime: Runtime,
}

impl<D: MeshDecoder> FileMeshLoader<D> {
    /// Create a loader reading from `root` with at most `max_concurrent`
    /// reads in flight.
    pub fn new(root: impl Into<PathBuf>, decoder: D, max_concurrent: usize) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("meshseq-loader")
            .enable_all()
            .build()?;
        let max_concurrent = max_concurrent.max(1);

        Ok(Self {
            root: root.into(),
            decoder: Arc::new(decoder),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            stats: Arc::new(Mutex::new(LoaderStats::default())),
            runtime,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Snapshot of the load counters.
    pub fn stats(&self) -> LoaderStats {
        self.stats.lock().clone()
    }

    async fn read_and_decode(
        path: PathBuf,
        request: &FetchRequest,
        decoder: &D,
        stats: &Mutex<LoaderStats>,
        issued: Instant,
    ) -> FetchCompletion<D::Mesh> {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(frame = request.frame, path = %path.display(), "mesh read failed: {}", e);
                stats.lock().failed += 1;
                return FetchCompletion::failed(request, e.to_string());
            }
        };

        let size = bytes.len() as u64;
        match decoder.decode(request.frame, bytes) {
            Ok(mesh) => {
                let mut stats = stats.lock();
                stats.loaded += 1;
                stats.bytes_read += size;
                FetchCompletion::loaded(request, mesh, size, issued.elapsed())
            }
            Err(e) => {
                warn!(frame = request.frame, path = %path.display(), "mesh decode failed: {}", e);
                stats.lock().failed += 1;
                FetchCompletion::failed(request, e.to_string())
            }
        }
    }
}

impl<D: MeshDecoder> MeshLoader for FileMeshLoader<D> {
    type Resource = D::Mesh;

    fn load(&mut self, request: FetchRequest, completions: CompletionSender<D::Mesh>) {
        let path = self.root.join(&request.url);
        let decoder = Arc::clone(&self.decoder);
        let permits = Arc::clone(&self.permits);
        let stats = Arc::clone(&self.stats);
        let issued = Instant::now();
        stats.lock().requested += 1;

        self.runtime.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!(frame = request.frame, "loader permits closed, failing request");
                let failed = FetchCompletion::failed(&request, "loader shut down");
                if completions.send(failed).is_err() {
                    debug!(frame = request.frame, "completion receiver already dropped");
                }
                return;
            };
            {
                let mut stats = stats.lock();
                stats.in_flight += 1;
                stats.peak_in_flight = stats.peak_in_flight.max(stats.in_flight);
            }

            let completion = Self::read_and_decode(path, &request, &decoder, &stats, issued).await;
            stats.lock().in_flight -= 1;

            // Nobody is listening any more; free the geometry here.
            if let Err(unsent) = completions.send(completion) {
                if let FetchOutcome::Loaded { mut resource, .. } = unsent.into_inner().outcome {
                    resource.release();
                }
            }
        });
    }
}
