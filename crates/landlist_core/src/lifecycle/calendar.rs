//! Calendar month arithmetic with day-of-month rollover.
//!
//! Adding months moves the month field and keeps the day number; days that do
//! not exist in the target month roll into the next one (Jan 31 + 1 month is
//! Mar 3, or Mar 2 in a leap year). Time of day is preserved.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

/// Adds `months` calendar months to `from`, rolling day overflow forward.
///
/// Saturates at the maximum representable instant instead of panicking.
pub fn add_calendar_months(from: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let month_index = i64::from(from.year()) * 12 + i64::from(from.month0()) + i64::from(months);
    let target = i32::try_from(month_index.div_euclid(12))
        .ok()
        .and_then(|year| {
            let month = u32::try_from(month_index.rem_euclid(12)).ok()? + 1;
            NaiveDate::from_ymd_opt(year, month, 1)
        })
        .and_then(|first| first.checked_add_days(Days::new(u64::from(from.day0()))));

    match target {
        Some(date) => date.and_time(from.time()).and_utc(),
        None => DateTime::<Utc>::MAX_UTC,
    }
}
