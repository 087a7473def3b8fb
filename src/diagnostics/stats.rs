use serde::Serialize;
use std::time::Instant;

/// Collects diagnostic statistics for one capture session run.
pub struct DiagnosticStats {
    frame_count: u64,
    miss_count: u64,
    total_bytes: u64,
    start_time: Instant,
    last_frame_time: Option<Instant>,
    snapshot_count: u64,
    failed_snapshot_count: u64,
}

/// Snapshot of diagnostic stats for display and logging.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub fps: f64,
    pub frame_count: u64,
    pub miss_count: u64,
    pub miss_rate: f64,
    pub bandwidth_bps: u64,
    pub last_frame_age_ms: Option<u64>,
    pub snapshot_count: u64,
    pub failed_snapshot_count: u64,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            miss_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            last_frame_time: None,
            snapshot_count: 0,
            failed_snapshot_count: 0,
        }
    }

    /// Record a frame pair delivered by the source.
    pub fn record_frame(&mut self, bytes: usize) {
        self.frame_count += 1;
        self.total_bytes += bytes as u64;
        self.last_frame_time = Some(Instant::now());
    }

    /// Record a capture call that returned no frame.
    pub fn record_miss(&mut self) {
        self.miss_count += 1;
    }

    /// Record the outcome of a snapshot request.
    pub fn record_snapshot(&mut self, persisted: bool) {
        if persisted {
            self.snapshot_count += 1;
        } else {
            self.failed_snapshot_count += 1;
        }
    }

    /// Calculate current FPS based on elapsed time.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frame_count as f64 / elapsed
    }

    /// Share of capture calls that missed, as a percentage (0.0 - 100.0).
    pub fn miss_rate(&self) -> f64 {
        let total = self.frame_count + self.miss_count;
        if total == 0 {
            return 0.0;
        }
        (self.miss_count as f64 / total as f64) * 100.0
    }

    /// Bandwidth in bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Reset acquisition counters for a new run. Snapshot totals are kept.
    pub fn reset(&mut self) {
        self.frame_count = 0;
        self.miss_count = 0;
        self.total_bytes = 0;
        self.start_time = Instant::now();
        self.last_frame_time = None;
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            fps: self.fps(),
            frame_count: self.frame_count,
            miss_count: self.miss_count,
            miss_rate: self.miss_rate(),
            bandwidth_bps: self.bandwidth_bps(),
            last_frame_age_ms: self
                .last_frame_time
                .map(|t| t.elapsed().as_millis() as u64),
            snapshot_count: self.snapshot_count,
            failed_snapshot_count: self.failed_snapshot_count,
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn initialises_with_zero_values() {
        let stats = DiagnosticStats::new();
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.miss_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert!(stats.last_frame_time.is_none());
    }

    #[test]
    fn record_frame_increments_frame_count() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000);
        assert_eq!(stats.frame_count, 1);
        stats.record_frame(1000);
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.total_bytes, 2000);
    }

    #[test]
    fn miss_rate_returns_percentage() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000);
        stats.record_frame(1000);
        stats.record_miss();
        // 1 miss out of 3 calls = 33.3%
        let rate = stats.miss_rate();
        assert!(
            (rate - 33.333).abs() < 1.0,
            "miss rate should be ~33%, got {rate}"
        );
    }

    #[test]
    fn miss_rate_zero_when_no_events() {
        let stats = DiagnosticStats::new();
        assert_eq!(stats.miss_rate(), 0.0);
    }

    #[test]
    fn fps_is_positive_after_frames() {
        let mut stats = DiagnosticStats::new();
        for _ in 0..30 {
            stats.record_frame(1000);
        }
        thread::sleep(Duration::from_millis(50));
        let fps = stats.fps();
        assert!(fps > 0.0, "fps should be positive, got {fps}");
    }

    #[test]
    fn record_snapshot_splits_outcomes() {
        let mut stats = DiagnosticStats::new();
        stats.record_snapshot(true);
        stats.record_snapshot(false);
        stats.record_snapshot(true);
        let snap = stats.snapshot();
        assert_eq!(snap.snapshot_count, 2);
        assert_eq!(snap.failed_snapshot_count, 1);
    }

    #[test]
    fn reset_clears_acquisition_counters_only() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000);
        stats.record_miss();
        stats.record_snapshot(true);
        stats.reset();
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.miss_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.snapshot_count, 1);
    }

    #[test]
    fn snapshot_serialises_to_camelcase() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(5000);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert!(json["frameCount"].is_number());
        assert!(json["missCount"].is_number());
        assert!(json["lastFrameAgeMs"].is_number());
    }

    #[test]
    fn last_frame_age_is_null_before_first_frame() {
        let stats = DiagnosticStats::new();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert!(json["lastFrameAgeMs"].is_null());
    }
}
