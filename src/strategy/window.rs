//! Daily time-of-day window strategy.
//!
//! Picks one fire per day somewhere inside `[start, end]` local time,
//! shaped by the configured distribution. A window whose end is at or
//! before its start spans midnight.

use chrono::{Duration as ChronoDuration, LocalResult, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::core::job::{parse_hhmm, Distribution, JobError};
use crate::core::rng::Rng;
use crate::core::time::{to_utc, DAY_MS};

/// Bucket weights for the discrete-bell "weighted" distribution: seven
/// equal segments across the window.
const SEGMENT_WEIGHTS: [f64; 7] = [0.05, 0.10, 0.20, 0.30, 0.20, 0.10, 0.05];

/// Window scheduling rule for one job.
#[derive(Debug, Clone)]
pub struct WindowStrategy {
    start_hour: u32,
    start_minute: u32,
    end_hour: u32,
    end_minute: u32,
    distribution: Distribution,
    timezone: Tz,
    rng: Rng,
}

impl WindowStrategy {
    /// Parse and build a window strategy. Times are `HH:MM` wall-clock in
    /// `timezone`.
    pub fn new(
        start: &str,
        end: &str,
        distribution: Distribution,
        timezone: Tz,
        rng: Rng,
    ) -> Result<Self, JobError> {
        let (start_hour, start_minute) =
            parse_hhmm(start).ok_or_else(|| JobError::InvalidWindowTime(start.to_string()))?;
        let (end_hour, end_minute) =
            parse_hhmm(end).ok_or_else(|| JobError::InvalidWindowTime(end.to_string()))?;
        Ok(Self {
            start_hour,
            start_minute,
            end_hour,
            end_minute,
            distribution,
            timezone,
            rng,
        })
    }

    /// Pick the next fire time at or after `now` (epoch ms).
    pub fn calculate_next_run(&mut self, now: i64) -> i64 {
        let today = to_utc(now).with_timezone(&self.timezone).date_naive();

        let mut window_start = self.zoned_ms(today, self.start_hour, self.start_minute);
        let mut window_end = self.zoned_ms(today, self.end_hour, self.end_minute);

        // End at or before start means the window runs past midnight.
        if window_end <= window_start {
            window_end += DAY_MS;
        }

        // Today's window already closed; use tomorrow's.
        if now > window_end {
            window_start += DAY_MS;
            window_end += DAY_MS;
        }

        let picked = match self.distribution {
            Distribution::Uniform => self
                .rng
                .uniform_range(window_start as f64, window_end as f64),
            Distribution::Gaussian => {
                // 3 sigma spans the half-window, and the draw is clipped
                // at 3 sigma, so the clamp only trims float edges.
                let midpoint = (window_start + window_end) as f64 / 2.0;
                let stddev = (window_end - window_start) as f64 / 6.0;
                (midpoint + self.rng.gaussian() * stddev)
                    .clamp(window_start as f64, window_end as f64)
            }
            Distribution::Weighted => {
                let segment = self.rng.weighted_index(&SEGMENT_WEIGHTS);
                let segment_len = (window_end - window_start) as f64 / SEGMENT_WEIGHTS.len() as f64;
                let lo = window_start as f64 + segment as f64 * segment_len;
                self.rng.uniform_range(lo, lo + segment_len)
            }
        };

        picked.floor() as i64
    }

    /// Absolute ms for a wall-clock time on `date` in the job's zone.
    fn zoned_ms(&self, date: NaiveDate, hour: u32, minute: u32) -> i64 {
        let naive = date.and_hms_opt(hour, minute, 0).unwrap_or_default();
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.timestamp_millis(),
            // Fall-back transition: the wall time occurs twice; take the
            // earlier instant.
            LocalResult::Ambiguous(first, _) => first.timestamp_millis(),
            // Spring-forward gap: the wall time does not exist; take the
            // same wall time an hour later.
            LocalResult::None => self
                .timezone
                .from_local_datetime(&(naive + ChronoDuration::hours(1)))
                .earliest()
                .map(|dt| dt.timestamp_millis())
                .unwrap_or_else(|| naive.and_utc().timestamp_millis()),
        }
    }
}
