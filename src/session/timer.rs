//! Session timer
//!
//! Elapsed time is always derived from the session's start timestamp and
//! the current clock, never accumulated from ticks, so a late or skipped
//! tick cannot drift the display.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Display refresh period
pub const TICK: Duration = Duration::from_secs(1);

/// Shown when no session is running
pub const ZERO_ELAPSED: &str = "00:00:00";

/// Format the time since `start` as `HH:MM:SS`.
///
/// Returns `00:00:00` when not running or without a start time. Negative
/// spans (clock skew) clamp to zero. Hours are not wrapped at 24 or 99.
pub fn format_elapsed(start: Option<DateTime<Utc>>, running: bool, now: DateTime<Utc>) -> String {
    let start = match (start, running) {
        (Some(start), true) => start,
        _ => return ZERO_ELAPSED.to_string(),
    };

    let total = (now - start).num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Ticker that reports the formatted elapsed time of a running session
pub struct SessionTimer;

impl SessionTimer {
    /// Spawn a ticker for a session that started at `start`.
    ///
    /// `on_tick` receives the formatted elapsed time every `tick`, starting
    /// immediately. Restarting a session means spawning a new timer with
    /// the new start time.
    pub fn spawn<F>(start: DateTime<Utc>, tick: Duration, on_tick: F) -> TimerHandle
    where
        F: Fn(String) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                on_tick(format_elapsed(Some(start), true, Utc::now()));
            }
        });

        TimerHandle {
            start,
            task: Some(task),
        }
    }
}

/// Running ticker; stops when dropped
#[derive(Debug)]
pub struct TimerHandle {
    start: DateTime<Utc>,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
