//! Sliding-window transfer rate estimation.
//!
//! Keeps the most recent fetch speeds and sizes in two fixed-capacity
//! windows and derives how many meshes per second the network sustains.
//! Mesh sizes vary across a sequence, so the estimate divides mean speed
//! by mean size rather than counting completions per second.

use std::collections::VecDeque;
use std::time::Duration;

use meshseq_core::defaults;

/// Shortest duration credited to a transfer, so cache hits stay finite.
const MIN_TRANSFER_SECS: f64 = 0.001;

/// Fixed-capacity window of samples; the newest sample evicts the oldest.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl SampleWindow {
    /// Create an empty window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(sample);
        self.sum += sample;
    }

    /// Arithmetic mean of the retained samples, or 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }
}

/// Estimates achievable mesh throughput from completed fetches.
#[derive(Debug, Clone)]
pub struct TransferRateEstimator {
    speeds: SampleWindow,
    sizes: SampleWindow,
    meshes_per_second: f64,
}

impl TransferRateEstimator {
    /// Create an estimator averaging the last `window` transfers.
    pub fn new(window: usize) -> Self {
        Self {
            speeds: SampleWindow::new(window),
            sizes: SampleWindow::new(window),
            meshes_per_second: 0.0,
        }
    }

    /// Record a completed fetch of `bytes` that took `elapsed`.
    pub fn record(&mut self, bytes: u64, elapsed: Duration) {
        let secs = elapsed.as_secs_f64().max(MIN_TRANSFER_SECS);
        let size = bytes as f64;

        self.speeds.push(size / secs);
        self.sizes.push(size);

        let mean_size = self.sizes.mean();
        self.meshes_per_second = if mean_size > 0.0 {
            self.speeds.mean() / mean_size
        } else {
            0.0
        };

        tracing::debug!(
            "avg mesh transfer speed: {:.0} B/s, avg mesh size: {:.0} B, avg meshes per second: {:.2}",
            self.speeds.mean(),
            mean_size,
            self.meshes_per_second
        );
    }

    /// Mean transfer speed in bytes per second.
    pub fn mean_speed(&self) -> f64 {
        self.speeds.mean()
    }

    /// Mean mesh size in bytes.
    pub fn mean_size(&self) -> f64 {
        self.sizes.mean()
    }

    /// Estimated meshes fetched per second.
    pub fn meshes_per_second(&self) -> f64 {
        self.meshes_per_second
    }

    /// Number of transfers currently averaged.
    pub fn sample_count(&self) -> usize {
        self.speeds.len()
    }
}

impl Default for TransferRateEstimator {
    fn default() -> Self {
        Self::new(defaults::TRANSFER_WINDOW)
    }
}
