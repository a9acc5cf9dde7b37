//! Scheduler loop
//!
//! Sleeps until the next scheduled fire time, runs one controller tick,
//! and repeats. Ticks are awaited in-line, so they never overlap. The loop
//! ends when the shutdown token is cancelled (between ticks) or when a
//! tick reports that the controller halted.
//!
//! Time is tracked as UTC instants; only weekly fire times are read off
//! the local wall clock.

use std::time::Duration;

use albumcam_core::{
    domain::Schedule,
    usecases::{containment::HALT_EXIT_CODE, ContainmentController, TickOutcome, TickReport},
};
use chrono::{DateTime, Local, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Source of the current time
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Why the scheduler loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// SIGINT/SIGTERM was received
    Shutdown,
    /// The controller halted on an expired credential
    Halted,
    /// The schedule has no further fire times
    ScheduleExhausted,
}

impl RunOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Shutdown | RunOutcome::ScheduleExhausted => 0,
            RunOutcome::Halted => HALT_EXIT_CODE,
        }
    }
}

/// Drives a [`ContainmentController`] from a [`Schedule`]
///
/// Weekly fire times are evaluated in `Tz`, the system time zone by default.
pub struct Scheduler<Tz: TimeZone = Local> {
    schedule: Schedule,
    shutdown: CancellationToken,
    clock: Clock,
    zone: Tz,
}

impl Scheduler {
    pub fn new(schedule: Schedule, shutdown: CancellationToken) -> Self {
        Self {
            schedule,
            shutdown,
            clock: Box::new(Utc::now),
            zone: Local,
        }
    }
}

impl<Tz: TimeZone> Scheduler<Tz> {
    /// Replaces the clock
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Evaluates weekly fire times in `zone`
    pub fn with_zone<Z: TimeZone>(self, zone: Z) -> Scheduler<Z> {
        Scheduler {
            schedule: self.schedule,
            shutdown: self.shutdown,
            clock: self.clock,
            zone,
        }
    }

    pub async fn run(&self, controller: &mut ContainmentController) -> RunOutcome {
        info!(schedule = %self.schedule, "Starting capture schedule");

        let mut cursor = (self.clock)();
        loop {
            let Some(next) = self.schedule.next_fire_in(&self.zone, cursor) else {
                warn!(schedule = %self.schedule, "Schedule has no further fire times");
                return RunOutcome::ScheduleExhausted;
            };

            let delay = (next - (self.clock)()).to_std().unwrap_or(Duration::ZERO);
            let local = self.zone.from_utc_datetime(&next.naive_utc()).naive_local();
            debug!(next = %local, delay_secs = delay.as_secs(), "Waiting for next capture");

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    return RunOutcome::Shutdown;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let report = controller.on_tick().await;
            log_report(&report);
            if report.should_halt() {
                return RunOutcome::Halted;
            }

            // Fire times missed while the tick ran are skipped, not replayed.
            cursor = next.max((self.clock)());
        }
    }
}

fn log_report(report: &TickReport) {
    match &report.outcome {
        TickOutcome::Skipped => debug!("Tick skipped"),
        TickOutcome::CaptureFailed { reason } => {
            warn!(%reason, "Tick finished without an image")
        }
        TickOutcome::CaptureOnly { image_path } => {
            info!(path = %image_path.display(), "Tick finished, image kept locally")
        }
        TickOutcome::Uploaded {
            remote_id,
            backlog_uploaded,
        } => info!(%remote_id, backlog_uploaded, "Tick finished, image uploaded"),
        TickOutcome::Retained { reason, retained } => {
            warn!(%reason, retained, "Tick finished, image retained for retry")
        }
        TickOutcome::Halted { notified } => {
            warn!(notified, "Tick finished, controller halted")
        }
    }
}
