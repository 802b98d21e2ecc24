//! Refresh-timestamp tracking and the once-a-second clock display.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::board::Board;
use crate::format::DASH;
use crate::logging::{self, obj, v_str, Domain, Level};
use crate::model::Payload;
use crate::page::{Page, LAST_REFRESH_ID, NEXT_REFRESH_ID, UTC_NOW_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockFormat {
    /// `YYYY-MM-DD HH:mm:ss`
    Full,
    /// `HH:mm:ss`
    TimeOnly,
}

impl ClockFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "datetime" => Some(ClockFormat::Full),
            "time" => Some(ClockFormat::TimeOnly),
            _ => None,
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            ClockFormat::Full => "%Y-%m-%d %H:%M:%S",
            ClockFormat::TimeOnly => "%H:%M:%S",
        }
    }

    pub fn format(&self, ts: DateTime<Utc>) -> String {
        ts.format(self.pattern()).to_string()
    }
}

/// Last successful refresh and the predicted next one. Both stay `None` until
/// the first payload arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshTimes {
    pub last: Option<DateTime<Utc>>,
    pub next: Option<DateTime<Utc>>,
}

impl RefreshTimes {
    /// `last` comes from the payload or falls back to `now`; `next` comes from
    /// the payload or falls back to `last + interval`.
    pub fn from_payload(payload: &Payload, now: DateTime<Utc>, interval: Duration) -> Self {
        let last = payload
            .last_refresh_epoch
            .and_then(epoch_to_utc)
            .unwrap_or(now);
        let next = payload
            .next_refresh_epoch
            .and_then(epoch_to_utc)
            .or_else(|| {
                chrono::Duration::from_std(interval)
                    .ok()
                    .and_then(|d| last.checked_add_signed(d))
            });
        Self {
            last: Some(last),
            next,
        }
    }

    pub fn is_known(&self) -> bool {
        self.last.is_some()
    }
}

/// Epoch seconds (possibly fractional) to UTC, at millisecond precision.
pub fn epoch_to_utc(epoch_secs: f64) -> Option<DateTime<Utc>> {
    if !epoch_secs.is_finite() {
        return None;
    }
    let ms = (epoch_secs * 1000.0).round();
    if ms.abs() > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

/// Channel the poller publishes refresh times on; last write wins.
pub fn refresh_channel() -> (watch::Sender<RefreshTimes>, watch::Receiver<RefreshTimes>) {
    watch::channel(RefreshTimes::default())
}

pub struct Clock {
    format: ClockFormat,
    times: watch::Receiver<RefreshTimes>,
}

impl Clock {
    pub fn new(format: ClockFormat, times: watch::Receiver<RefreshTimes>) -> Self {
        Self { format, times }
    }

    pub fn current(&self) -> RefreshTimes {
        *self.times.borrow()
    }

    /// The three display strings: now, last refresh, next refresh.
    pub fn readings(&self, now: DateTime<Utc>) -> [String; 3] {
        let times = self.current();
        let show = |ts: Option<DateTime<Utc>>| match ts {
            Some(ts) => self.format.format(ts),
            None => DASH.to_string(),
        };
        [self.format.format(now), show(times.last), show(times.next)]
    }

    /// Write the readings into the page. Elements the page lacks are skipped;
    /// returns how many were written.
    pub fn paint(&self, page: &mut Page, now: DateTime<Utc>) -> usize {
        let [utc_now, last, next] = self.readings(now);
        let mut written = 0;
        for (id, text) in [
            (UTC_NOW_ID, utc_now),
            (LAST_REFRESH_ID, last),
            (NEXT_REFRESH_ID, next),
        ] {
            if page.set_text(id, &text) {
                written += 1;
            }
        }
        written
    }

    /// Repaint every `period` for the life of the process.
    pub async fn run(self, board: Arc<Board>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let now = Utc::now();
            let written = match board.update(|page| self.paint(page, now)) {
                Ok(n) => n,
                Err(err) => {
                    logging::log_publish_failed("clock", &err);
                    continue;
                }
            };
            logging::log(
                Level::Trace,
                Domain::Clock,
                "tick",
                obj(&[
                    ("utc_now", v_str(&ClockFormat::Full.format(now))),
                    ("elements", serde_json::json!(written)),
                ]),
            );
        }
    }
}
