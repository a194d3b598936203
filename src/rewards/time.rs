use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Calendar date of an instant in the venue's civil time zone.
///
/// The promoter check-in count filters on this: a check-in recorded at
/// 01:30 UTC belongs to the previous calendar day in São Paulo. All date
/// comparisons in the engine go through this one function; nothing compares
/// raw UTC dates.
pub fn venue_local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}
