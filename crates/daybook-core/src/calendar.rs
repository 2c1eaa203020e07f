use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// The one format for reading and displaying dates: `YYYY-MM-DD`.
pub const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` string into the UTC midnight starting that day.
///
/// # Errors
/// Returns an error when the input does not match the fixed format or names
/// an impossible date.
pub fn parse_date(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    Date::parse(s, DATE_FORMAT).map(|d| d.midnight().assume_utc())
}

/// Render the day component of a timestamp as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(ts: OffsetDateTime) -> String {
    ts.date().format(DATE_FORMAT).unwrap_or_default()
}

/// Midnight at the start of the day `ts` falls on.
#[must_use]
pub fn start_of_day(ts: OffsetDateTime) -> OffsetDateTime {
    ts.date().midnight().assume_utc()
}

/// True when `t1` falls on the same day as `t2` or an earlier one.
#[must_use]
pub fn on_or_before(t1: OffsetDateTime, t2: OffsetDateTime) -> bool {
    t1.date() <= t2.date()
}

/// True when `t1` falls on the same day as `t2` or a later one.
#[must_use]
pub fn on_or_after(t1: OffsetDateTime, t2: OffsetDateTime) -> bool {
    t1.date() >= t2.date()
}
