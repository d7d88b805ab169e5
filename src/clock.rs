//! Monotonic "now", IST<->UTC conversion, and 5-minute boundary arithmetic.
//!
//! All persisted timestamps are UTC; all human-facing times render in IST
//! (`UTC+5:30`, no daylight-saving component, so a fixed offset suffices —
//! an IANA tz database is unneeded weight for this one constant offset).

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Timelike, Utc};

pub const ROUND_DURATION_MINUTES: i64 = 5;

pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("IST offset is a valid fixed offset")
}

/// Production and test clocks implement this so time-dependent logic (round
/// boundaries, token expiry, settlement grace windows) can be driven
/// deterministically in tests instead of racing the wall clock.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn to_ist(utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    utc.with_timezone(&ist_offset())
}

pub fn to_utc(ist: DateTime<FixedOffset>) -> DateTime<Utc> {
    ist.with_timezone(&Utc)
}

/// Formats a UTC instant as IST using the given `chrono::format::strftime`
/// pattern, e.g. `"%Y%m%d%H%M"` for a round id.
pub fn format_ist(utc: DateTime<Utc>, pattern: &str) -> String {
    to_ist(utc).format(pattern).to_string()
}

/// Parses `"HH:MM"` into a `NaiveTime`. Used for `game_start_time`/`game_end_time`.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Rounds `from` (interpreted in IST) up to the next 5-minute boundary,
/// returned as UTC. If `from` already sits exactly on a boundary, returns the
/// *next* one (callers wanting the current boundary should subtract first).
pub fn next_five_minute_boundary_utc(from: DateTime<Utc>) -> DateTime<Utc> {
    let ist = to_ist(from);
    let minute = ist.naive_local().time().minute() as i64;
    let remainder = minute % ROUND_DURATION_MINUTES;
    let to_add = if remainder == 0 {
        ROUND_DURATION_MINUTES
    } else {
        ROUND_DURATION_MINUTES - remainder
    };
    let truncated = ist
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .expect("zeroing seconds/nanos is always valid");
    to_utc(truncated) + Duration::minutes(to_add)
}

/// `game_id` is the IST wall-clock start time formatted `YYYYMMDDHHMM`.
pub fn round_id_for(start_utc: DateTime<Utc>) -> String {
    format_ist(start_utc, "%Y%m%d%H%M")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ist_is_five_hours_thirty_ahead_of_utc() {
        let utc = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ist = to_ist(utc);
        assert_eq!(ist.format("%H:%M").to_string(), "05:30");
    }

    #[test]
    fn next_boundary_rounds_up_within_the_same_five_minutes() {
        // 08:02 IST -> 02:32 UTC
        let utc = Utc.with_ymd_and_hms(2026, 1, 1, 2, 32, 0).unwrap();
        let next = next_five_minute_boundary_utc(utc);
        assert_eq!(format_ist(next, "%H:%M"), "08:05");
    }

    #[test]
    fn next_boundary_on_exact_boundary_advances_a_full_interval() {
        let utc = Utc.with_ymd_and_hms(2026, 1, 1, 2, 30, 0).unwrap();
        let next = next_five_minute_boundary_utc(utc);
        assert_eq!(format_ist(next, "%H:%M"), "08:05");
    }

    #[test]
    fn round_id_matches_yyyymmddhhmm() {
        let utc = Utc.with_ymd_and_hms(2026, 1, 1, 2, 30, 0).unwrap();
        assert_eq!(round_id_for(utc), "202601010800");
    }
}
