//! Capture schedules
//!
//! Two shapes are supported, mirroring the `camera.scheduler` config section:
//!
//! - [`Schedule::Interval`] fires every N minutes, counted from the previous fire.
//! - [`Schedule::Weekly`] fires at fixed local times on selected weekdays.
//!
//! [`Schedule::next_fire`] works on naive local date-times and ignores
//! daylight saving changes. The daemon uses [`Schedule::next_fire_in`],
//! which keeps intervals in elapsed time and resolves weekly wall-clock
//! times in a real time zone.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};

use super::errors::DomainError;

/// Weekday aliases that select every day of the week
const EVERY_DAY_ALIASES: &[&str] = &["day", "daily", "everyday"];

/// Every weekday, Monday first
const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// When the next capture tick should fire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Every `minutes` minutes after the previous fire
    Interval { minutes: u32 },
    /// At each of `times` on each of `days` (local time)
    Weekly {
        days: Vec<Weekday>,
        times: Vec<NaiveTime>,
    },
}

impl Schedule {
    /// Creates an interval schedule; zero minutes is rejected
    pub fn interval(minutes: u32) -> Result<Self, DomainError> {
        if minutes == 0 {
            return Err(DomainError::InvalidSchedule(
                "interval_minutes must be greater than 0".to_string(),
            ));
        }
        Ok(Self::Interval { minutes })
    }

    /// Creates a weekly schedule from weekday names and `HH:MM[:SS]` strings
    ///
    /// An empty `times` list means midnight. Duplicate entries are dropped.
    pub fn weekly<D, T>(days: &[D], times: &[T]) -> Result<Self, DomainError>
    where
        D: AsRef<str>,
        T: AsRef<str>,
    {
        if days.is_empty() {
            return Err(DomainError::InvalidSchedule(
                "day_of_week must list at least one day".to_string(),
            ));
        }

        let mut parsed_days = Vec::new();
        for day in days {
            for weekday in parse_weekday(day.as_ref())? {
                if !parsed_days.contains(&weekday) {
                    parsed_days.push(weekday);
                }
            }
        }
        parsed_days.sort_by_key(|d| d.num_days_from_monday());

        let mut parsed_times = times
            .iter()
            .map(|t| parse_time_of_day(t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if parsed_times.is_empty() {
            parsed_times.push(NaiveTime::MIN);
        }
        parsed_times.sort();
        parsed_times.dedup();

        Ok(Self::Weekly {
            days: parsed_days,
            times: parsed_times,
        })
    }

    /// Returns the first fire time strictly after `after`
    ///
    /// For an interval schedule `after` is the previous fire (or the
    /// process start time). Returns `None` only for a weekly schedule with
    /// no days or no times, which the constructors never produce.
    pub fn next_fire(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Schedule::Interval { minutes } => Some(after + Duration::minutes(i64::from(*minutes))),
            Schedule::Weekly { days, times } => {
                // A full week plus today covers every candidate.
                (0..=7)
                    .map(|offset| after.date() + Duration::days(offset))
                    .filter(|date| days.contains(&date.weekday()))
                    .flat_map(|date| times.iter().map(move |t| date.and_time(*t)))
                    .find(|candidate| *candidate > after)
            }
        }
    }

    /// Returns the first fire instant strictly after `after`
    ///
    /// Intervals step in elapsed time, so a DST change never stretches the
    /// gap between captures. Weekly times are wall-clock times in `zone`: a
    /// time repeated by a fall-back fires once, at the first occurrence
    /// still ahead, and a time skipped by a spring-forward fires one hour
    /// later on the wall clock.
    pub fn next_fire_in<Tz: TimeZone>(
        &self,
        zone: &Tz,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if let Schedule::Interval { minutes } = self {
            return Some(after + Duration::minutes(i64::from(*minutes)));
        }

        let mut cursor = zone.from_utc_datetime(&after.naive_utc()).naive_local();
        loop {
            let wall = self.next_fire(cursor)?;
            let resolved = match zone.from_local_datetime(&wall) {
                LocalResult::Single(at) => Some(at.with_timezone(&Utc)),
                LocalResult::Ambiguous(first, second) => {
                    let first = first.with_timezone(&Utc);
                    Some(if first > after { first } else { second.with_timezone(&Utc) })
                }
                LocalResult::None => zone
                    .from_local_datetime(&(wall + Duration::hours(1)))
                    .earliest()
                    .map(|at| at.with_timezone(&Utc)),
            };
            match resolved {
                Some(instant) if instant > after => return Some(instant),
                _ => cursor = wall,
            }
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Interval { minutes } => write!(f, "every {} min", minutes),
            Schedule::Weekly { days, times } => {
                let days: Vec<String> = days.iter().map(|d| d.to_string()).collect();
                let times: Vec<String> = times.iter().map(|t| t.format("%H:%M:%S").to_string()).collect();
                write!(f, "{} at {}", days.join(","), times.join(","))
            }
        }
    }
}

/// Parses a weekday name (`monday`, `Mon`, ...) or an every-day alias
fn parse_weekday(value: &str) -> Result<Vec<Weekday>, DomainError> {
    let trimmed = value.trim();
    if EVERY_DAY_ALIASES
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(trimmed))
    {
        return Ok(ALL_WEEKDAYS.to_vec());
    }
    trimmed
        .parse::<Weekday>()
        .map(|d| vec![d])
        .map_err(|_| DomainError::InvalidWeekday(value.to_string()))
}

/// Parses `HH:MM` or `HH:MM:SS`
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, DomainError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| DomainError::InvalidTime(value.to_string()))
}
