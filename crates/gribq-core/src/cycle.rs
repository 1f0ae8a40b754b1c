//! Forecast time resolver: which model runs to try, newest first.
//!
//! A run is published some time after its cycle hour, so the newest boundary
//! is often missing on the server. The candidate sequence lets the retrieval
//! engine fall back one cycle at a time until the lookback is used up.

use crate::error::{QueryError, QueryResult};
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound for lookback and availability delay (30 days).
pub const MAX_HOURS: u32 = 30 * 24;

/// One model run: a UTC timestamp on a cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForecastCycle(DateTime<Utc>);

impl ForecastCycle {
    /// Most recent boundary at or before `now`; boundaries are multiples of
    /// `interval_hours` counted from 00Z of the UTC day.
    pub fn at_or_before(now: DateTime<Utc>, interval_hours: u32) -> QueryResult<Self> {
        validate_interval(interval_hours)?;
        let hour = now.hour() / interval_hours * interval_hours;
        let start = now
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
            + Duration::hours(i64::from(hour));
        Ok(ForecastCycle(start))
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.0
    }

    /// `YYYYMMDD`
    pub fn date_string(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Cycle hour, `00`..`23`.
    pub fn hour_string(&self) -> String {
        format!("{:02}", self.0.hour())
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    fn earlier_by(&self, hours: u32) -> QueryResult<Self> {
        shift_back(self.0, hours).map(ForecastCycle)
    }
}

impl fmt::Display for ForecastCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}Z", self.0.format("%Y-%m-%d"), self.hour_string())
    }
}

/// Cycle timing of one model (from config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSchedule {
    pub interval_hours: u32,
    pub max_lookback_hours: u32,
    /// Hours a run needs before it can be published; shifts `now` back.
    pub availability_delay_hours: u32,
}

impl CycleSchedule {
    /// Candidates for `now` after applying the availability delay.
    pub fn candidates(&self, now: DateTime<Utc>) -> QueryResult<Vec<ForecastCycle>> {
        check_hours("availability delay", self.availability_delay_hours)?;
        let shifted = shift_back(now, self.availability_delay_hours)?;
        candidate_cycles(shifted, self.interval_hours, self.max_lookback_hours)
    }
}

/// Newest-first cycles from the boundary at or before `now`, stepping back by
/// `cycle_interval_hours` while within `max_lookback_hours`. Never empty.
/// The lookback is capped at [`MAX_HOURS`].
pub fn candidate_cycles(
    now: DateTime<Utc>,
    cycle_interval_hours: u32,
    max_lookback_hours: u32,
) -> QueryResult<Vec<ForecastCycle>> {
    let latest = ForecastCycle::at_or_before(now, cycle_interval_hours)?;
    check_hours("lookback", max_lookback_hours)?;
    let steps = max_lookback_hours / cycle_interval_hours;
    let cycles = (0..=steps)
        .map(|i| latest.earlier_by(i * cycle_interval_hours))
        .collect::<QueryResult<Vec<_>>>()?;
    tracing::debug!(
        latest = %latest,
        count = cycles.len(),
        "resolved candidate forecast cycles"
    );
    Ok(cycles)
}

/// Newest cycle across several models' availability, if any.
pub fn get_latest_of_multiple<I>(cycles: I) -> Option<ForecastCycle>
where
    I: IntoIterator<Item = ForecastCycle>,
{
    cycles.into_iter().max()
}

fn check_hours(name: &'static str, hours: u32) -> QueryResult<()> {
    if hours > MAX_HOURS {
        return Err(QueryError::HoursOutOfRange {
            name,
            hours,
            max: MAX_HOURS,
        });
    }
    Ok(())
}

fn shift_back(time: DateTime<Utc>, hours: u32) -> QueryResult<DateTime<Utc>> {
    time.checked_sub_signed(Duration::hours(i64::from(hours)))
        .ok_or_else(|| QueryError::InvalidBounds(format!("{time} minus {hours}h is out of range")))
}

fn validate_interval(interval_hours: u32) -> QueryResult<()> {
    if interval_hours == 0 || interval_hours > 24 || 24 % interval_hours != 0 {
        return Err(QueryError::InvalidCycleInterval(interval_hours));
    }
    Ok(())
}
