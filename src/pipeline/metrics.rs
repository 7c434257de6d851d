// src/pipeline/metrics.rs
//
// Per-session counters. Ticks run one at a time on the session's own task,
// so plain integers are enough.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TrackingMetrics {
    pub ticks: u64,
    pub empty_frames: u64,
    pub source_errors: u64,
    pub frames_with_ball: u64,
    pub frames_without_ball: u64,
    pub left_commands: u64,
    pub right_commands: u64,
    pub reasserted_commands: u64,
    pub actuator_failures: u64,
    pub skipped_ticks: u64,
    pub last_tick_us: u64,
    pub max_tick_us: u64,
    pub started_at: Instant,
}

impl TrackingMetrics {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            empty_frames: 0,
            source_errors: 0,
            frames_with_ball: 0,
            frames_without_ball: 0,
            left_commands: 0,
            right_commands: 0,
            reasserted_commands: 0,
            actuator_failures: 0,
            skipped_ticks: 0,
            last_tick_us: 0,
            max_tick_us: 0,
            started_at: Instant::now(),
        }
    }

    pub fn set_tick_duration(&mut self, elapsed: Duration) {
        let us = elapsed.as_micros() as u64;
        self.last_tick_us = us;
        self.max_tick_us = self.max_tick_us.max(us);
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.ticks as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            ticks: self.ticks,
            fps: self.fps(),
            empty_frames: self.empty_frames,
            source_errors: self.source_errors,
            frames_with_ball: self.frames_with_ball,
            frames_without_ball: self.frames_without_ball,
            left_commands: self.left_commands,
            right_commands: self.right_commands,
            reasserted_commands: self.reasserted_commands,
            actuator_failures: self.actuator_failures,
            skipped_ticks: self.skipped_ticks,
            last_tick_us: self.last_tick_us,
            max_tick_us: self.max_tick_us,
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for TrackingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub ticks: u64,
    pub fps: f64,
    pub empty_frames: u64,
    pub source_errors: u64,
    pub frames_with_ball: u64,
    pub frames_without_ball: u64,
    pub left_commands: u64,
    pub right_commands: u64,
    pub reasserted_commands: u64,
    pub actuator_failures: u64,
    pub skipped_ticks: u64,
    pub last_tick_us: u64,
    pub max_tick_us: u64,
    pub elapsed_secs: f64,
}
