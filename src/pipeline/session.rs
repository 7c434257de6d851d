// src/pipeline/session.rs
//
// A tracking session ties a source, thresholds and an actuator to one
// pipeline and drives it at a fixed cadence.
//
// Scheduling contract: exactly one full pass per tick, run to completion
// before the next tick is awaited. When a pass overruns the interval the
// overlapped ticks are dropped (MissedTickBehavior::Skip), never queued.

use super::metrics::{MetricsSummary, TrackingMetrics};
use super::tracking::{TickOutcome, TrackingPipeline};
use crate::actuator::ActuatorSink;
use crate::diagnostics::MaskObserver;
use crate::source::FrameSource;
use crate::thresholds::ThresholdSource;
use crate::types::{ScheduleConfig, Turn};
use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

pub struct TrackingSession {
    pipeline: TrackingPipeline,
    source: Box<dyn FrameSource>,
    thresholds: Box<dyn ThresholdSource>,
    actuator: Box<dyn ActuatorSink>,
    observer: Option<Box<dyn MaskObserver>>,
    metrics: TrackingMetrics,
}

impl TrackingSession {
    pub fn new(
        mut pipeline: TrackingPipeline,
        source: Box<dyn FrameSource>,
        thresholds: Box<dyn ThresholdSource>,
        actuator: Box<dyn ActuatorSink>,
    ) -> Self {
        pipeline.reset();
        Self {
            pipeline,
            source,
            thresholds,
            actuator,
            observer: None,
            metrics: TrackingMetrics::new(),
        }
    }

    pub fn with_observer(mut self, observer: Option<Box<dyn MaskObserver>>) -> Self {
        self.observer = observer;
        self
    }

    #[cfg(test)]
    pub fn metrics(&self) -> &TrackingMetrics {
        &self.metrics
    }

    #[cfg(test)]
    pub fn pipeline(&self) -> &TrackingPipeline {
        &self.pipeline
    }

    /// Read one frame, run the pipeline and forward any command.
    pub fn tick(&mut self) -> TickOutcome {
        let started = Instant::now();
        self.metrics.ticks += 1;
        let tick = self.metrics.ticks;

        let outcome = match self.source.read_frame() {
            Ok(frame) => {
                let range = self.thresholds.current();
                self.pipeline.process(frame.as_ref(), &range)
            }
            Err(e) => {
                warn!("Frame source {} read failed: {:#}", self.source.name(), e);
                TickOutcome::SourceError
            }
        };

        match &outcome {
            TickOutcome::SourceError => self.metrics.source_errors += 1,
            TickOutcome::EmptyFrame => self.metrics.empty_frames += 1,
            TickOutcome::Tracked(report) => {
                debug!(
                    "tick={} contours={} anchors={:?} command={:?} state={}",
                    tick,
                    report.contour_count,
                    report.anchor_xs,
                    report.command,
                    report.direction.as_str()
                );
                if report.contour_count > 0 {
                    self.metrics.frames_with_ball += 1;
                } else {
                    self.metrics.frames_without_ball += 1;
                }

                if let Some(observer) = self.observer.as_mut() {
                    if let Err(e) = observer.observe(tick, &report.mask) {
                        warn!("Mask observer failed: {:#}", e);
                    }
                }

                if let Some(command) = report.command {
                    match command.turn {
                        Turn::Left => self.metrics.left_commands += 1,
                        Turn::Right => self.metrics.right_commands += 1,
                    }
                    if command.reasserted {
                        self.metrics.reasserted_commands += 1;
                    }
                    if let Err(e) = self.actuator.send(command) {
                        self.metrics.actuator_failures += 1;
                        warn!("Actuator {} rejected {:?}: {:#}", self.actuator.name(), command, e);
                    }
                }
            }
        }

        self.metrics.set_tick_duration(started.elapsed());
        outcome
    }

    /// Tick until stopped, the tick budget is spent, or a finite source runs dry.
    pub async fn run(
        &mut self,
        schedule: &ScheduleConfig,
        mut stop: watch::Receiver<bool>,
    ) -> Result<MetricsSummary> {
        let period = Duration::from_millis(schedule.tick_ms.max(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "▶ Tracking session started: source={}, actuator={}, tick={}ms",
            self.source.name(),
            self.actuator.name(),
            period.as_millis()
        );

        let mut stop_open = true;
        let mut last_tick: Option<time::Instant> = None;
        let mut ticks_run: u64 = 0;

        while !*stop.borrow() {
            tokio::select! {
                biased;
                changed = stop.changed(), if stop_open => {
                    // A dropped sender can no longer stop us; keep ticking.
                    if changed.is_err() {
                        stop_open = false;
                    }
                    continue;
                }
                at = ticker.tick() => {
                    if let Some(prev) = last_tick {
                        let missed = (at - prev).as_nanos() / period.as_nanos();
                        if missed > 1 {
                            self.metrics.skipped_ticks += (missed - 1) as u64;
                            debug!("Skipped {} overlapping tick(s)", missed - 1);
                        }
                    }
                    last_tick = Some(at);
                }
            }

            self.tick();
            ticks_run += 1;

            if schedule.max_ticks.is_some_and(|max| ticks_run >= max) {
                info!("Tick budget of {} reached", ticks_run);
                break;
            }
            if self.source.is_exhausted() {
                info!("Frame source {} exhausted", self.source.name());
                break;
            }
        }

        info!("⏹ Tracking session stopped after {} tick(s)", ticks_run);
        Ok(self.metrics.summary())
    }
}
