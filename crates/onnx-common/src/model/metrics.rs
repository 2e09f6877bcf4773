//! Session lifecycle counters

/// Per-model session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    /// Sessions constructed, eager and lazy
    pub sessions_built: u64,
    /// Resolutions served by an already-built session
    pub cache_hits: u64,
    /// Sessions destroyed before the model itself
    pub sessions_unloaded: u64,
}

impl SessionMetrics {
    /// Fraction of resolutions that did not have to build a session
    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits as f64;
        let builds = self.sessions_built as f64;
        let total = hits + builds;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    /// Record a session construction
    pub fn increment_builds(&mut self) {
        self.sessions_built += 1;
    }

    /// Record a resolution served from the cache
    pub fn increment_hits(&mut self) {
        self.cache_hits += 1;
    }

    /// Record a session being torn down
    pub fn increment_unloads(&mut self) {
        self.sessions_unloaded += 1;
    }
}
