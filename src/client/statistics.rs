use tracing::debug;

/// Descriptive statistics computed from one engine's working set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub count: usize,
    pub min: i64,
    pub p10: i64,
    pub p50: i64,
    pub p90: i64,
    pub p99: i64,
    pub max: i64,
    pub mean: f64,
}

/// Accumulates latency samples and computes descriptive statistics.
///
/// The first `prewarm_count` samples are excluded from the working set to
/// keep connection-establishment skew out of the report. Callers share an
/// instance behind a mutex; both `add_sample` and `calculate` run under it.
pub struct StatisticsCalculator {
    samples: Vec<i64>,
    prewarm_count: usize,
    processed_count: usize,
}

impl StatisticsCalculator {
    pub fn new(prewarm_count: usize) -> Self {
        Self {
            samples: Vec::new(),
            prewarm_count,
            processed_count: 0,
        }
    }

    /// Record one latency sample in nanoseconds.
    ///
    /// Returns true when the sample entered the working set, false when it
    /// was skipped for warm-up.
    pub fn add_sample(&mut self, latency_ns: i64) -> bool {
        self.processed_count += 1;
        if self.processed_count <= self.prewarm_count {
            return false;
        }
        self.samples.push(latency_ns);
        true
    }

    /// Compute statistics over a sorted copy of the working set.
    ///
    /// Does not mutate state and is safely repeatable; an empty working set
    /// yields an all-zero result.
    pub fn calculate(&self) -> LatencyStats {
        if self.samples.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: i64 = sorted.iter().sum();

        let stats = LatencyStats {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            p10: percentile(&sorted, 0.10),
            p50: percentile(&sorted, 0.50),
            p90: percentile(&sorted, 0.90),
            p99: percentile(&sorted, 0.99),
            mean: sum as f64 / count as f64,
        };

        debug!(
            count = stats.count,
            min_ns = stats.min,
            max_ns = stats.max,
            "Statistics calculated"
        );

        stats
    }

    /// Number of samples seen, including skipped warm-up samples
    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    /// Number of samples in the working set
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of warm-up samples that were skipped
    pub fn skipped_count(&self) -> usize {
        self.processed_count.min(self.prewarm_count)
    }
}

/// Nearest-rank percentile: rank = ceil(p * n) - 1, clamped to [0, n-1].
/// No interpolation between neighboring values.
fn percentile(sorted: &[i64], p: f64) -> i64 {
    let n = sorted.len() as isize;
    let rank = (p * n as f64).ceil() as isize - 1;
    sorted[rank.clamp(0, n - 1) as usize]
}
