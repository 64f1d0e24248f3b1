//! Search configuration for the journey planner.

/// Configuration parameters for journey search.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Maximum number of journeys to return.
    pub max_results: usize,

    /// Minimum transfer time in seconds when changing between different
    /// trips at a stop. Boarding the trip already ridden is always free,
    /// and the wait at the very first boarding is never penalised.
    pub min_transfer_secs: u32,

    /// Upper bound on labels kept per stop. `None` derives a bound from
    /// `max_results` (at least 8, three labels per requested journey).
    pub max_labels_per_stop: Option<usize>,

    /// How many connections are scanned between cancellation checks.
    pub cancel_check_interval: usize,
}

impl PlannerConfig {
    /// Effective per-stop label bound.
    pub fn label_bound(&self) -> usize {
        self.max_labels_per_stop
            .unwrap_or_else(|| (self.max_results * 3).max(8))
    }

    /// Returns a copy with a different result count.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Returns a copy with a different minimum transfer time.
    pub fn with_min_transfer_secs(mut self, secs: u32) -> Self {
        self.min_transfer_secs = secs;
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_transfer_secs: 0,
            max_labels_per_stop: None,
            cancel_check_interval: 1 << 16,
        }
    }
}
