use crate::calendar;
use crate::task::{Priority, TaskSet};
use regex::Regex;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

/// A single set-narrowing stage: a pure function from a task set to a
/// reduced task set.
pub type Filter = Box<dyn Fn(&TaskSet) -> TaskSet>;

/// Errors raised while validating filter constructor arguments. All are
/// detected eagerly, before the filter joins a chain.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A date argument did not match `YYYY-MM-DD` or named an impossible day.
    #[error("invalid date in {token:?}: {source}")]
    InvalidDate {
        /// The offending query token.
        token: String,
        /// The underlying parse failure.
        #[source]
        source: time::error::Parse,
    },

    /// A duration argument had a bad magnitude or an unknown unit.
    #[error("invalid duration {token:?} (expected <n><h|d|w|m>)")]
    InvalidDuration {
        /// The offending query token.
        token: String,
    },

    /// A title pattern failed to compile as a regular expression.
    #[error("invalid title pattern {token:?}: {source}")]
    InvalidPattern {
        /// The offending query token.
        token: String,
        /// The regex compile failure.
        #[source]
        source: regex::Error,
    },

    /// A structured-looking token matched no known prefix.
    #[error("unmatched token {token:?}")]
    Unmatched {
        /// The offending query token.
        token: String,
    },
}

/// Keep only completed tasks.
#[must_use]
pub fn completed() -> Filter {
    Box::new(TaskSet::completed)
}

/// Keep only tasks not yet completed.
#[must_use]
pub fn unfinished() -> Filter {
    Box::new(TaskSet::unfinished)
}

/// Keep tasks carrying the exact (trimmed) tag.
#[must_use]
pub fn tag(tag: &str) -> Filter {
    let tag = tag.trim().to_owned();
    Box::new(move |ts| ts.filter_tag(&tag))
}

/// Keep tasks at or above the given priority.
#[must_use]
pub fn priority(pri: Priority) -> Filter {
    Box::new(move |ts| ts.filter_priority(pri))
}

/// Keep completed tasks finished on or after the given day.
///
/// # Errors
/// Returns [`QueryError::InvalidDate`] for anything but `YYYY-MM-DD`.
pub fn completed_after(date: &str) -> Result<(Filter, OffsetDateTime), QueryError> {
    let bound = parse_bound(date)?;
    let f: Filter = Box::new(move |ts| {
        ts.filtered(|task| task.finished.is_some_and(|t| calendar::on_or_after(t, bound)))
    });
    Ok((f, bound))
}

/// Keep completed tasks finished on or before the given day.
///
/// # Errors
/// Returns [`QueryError::InvalidDate`] for anything but `YYYY-MM-DD`.
pub fn completed_before(date: &str) -> Result<(Filter, OffsetDateTime), QueryError> {
    let bound = parse_bound(date)?;
    let f: Filter = Box::new(move |ts| {
        ts.filtered(|task| task.finished.is_some_and(|t| calendar::on_or_before(t, bound)))
    });
    Ok((f, bound))
}

/// Keep tasks created on or after the given day.
///
/// # Errors
/// Returns [`QueryError::InvalidDate`] for anything but `YYYY-MM-DD`.
pub fn started_after(date: &str) -> Result<(Filter, OffsetDateTime), QueryError> {
    let bound = parse_bound(date)?;
    let f: Filter = Box::new(move |ts| ts.filtered(|task| calendar::on_or_after(task.created, bound)));
    Ok((f, bound))
}

/// Keep tasks created on or before the given day.
///
/// # Errors
/// Returns [`QueryError::InvalidDate`] for anything but `YYYY-MM-DD`.
pub fn started_before(date: &str) -> Result<(Filter, OffsetDateTime), QueryError> {
    let bound = parse_bound(date)?;
    let f: Filter = Box::new(move |ts| ts.filtered(|task| calendar::on_or_before(task.created, bound)));
    Ok((f, bound))
}

/// Keep tasks whose title matches the pattern anywhere (no implied anchors).
///
/// # Errors
/// Returns [`QueryError::InvalidPattern`] when the regex does not compile.
pub fn title(pattern: &str) -> Result<Filter, QueryError> {
    let re = Regex::new(pattern).map_err(|source| QueryError::InvalidPattern {
        token: pattern.to_owned(),
        source,
    })?;
    Ok(Box::new(move |ts| ts.filtered(|task| re.is_match(&task.title))))
}

/// Units accepted by [`duration`]: hours, days, weeks (7 days), and
/// months (28 days).
const fn unit_duration(unit: char, n: i64) -> Option<Duration> {
    match unit {
        'h' => Some(Duration::hours(n)),
        'd' => Some(Duration::days(n)),
        'w' => Some(Duration::days(7 * n)),
        'm' => Some(Duration::days(28 * n)),
        _ => None,
    }
}

/// Parse a relative window such as `2w` or `h` (magnitude defaults to 1)
/// into a completed-within-duration filter over the creation or completion
/// date, plus the resolved absolute start instant for range narrowing.
///
/// # Errors
/// Returns [`QueryError::InvalidDuration`] for a bad magnitude or unit.
pub fn duration(
    spec: &str,
    field: DateField,
    now: OffsetDateTime,
) -> Result<(Filter, OffsetDateTime), QueryError> {
    let invalid = || QueryError::InvalidDuration {
        token: spec.to_owned(),
    };

    let mut chars = spec.chars();
    let unit = chars.next_back().ok_or_else(invalid)?;
    let magnitude = chars.as_str();
    let n: i64 = if magnitude.is_empty() {
        1
    } else {
        magnitude
            .parse::<u32>()
            .map_err(|_| invalid())
            .map(i64::from)?
    };
    let dur = unit_duration(unit, n).ok_or_else(invalid)?;
    // A large magnitude can push the window start outside the years the
    // time crate can represent; that is a bad token, not a panic.
    let start = now.checked_sub(dur).ok_or_else(invalid)?;

    let f: Filter = match field {
        DateField::Started => Box::new(move |ts| ts.created_duration(now, dur)),
        DateField::Finished => Box::new(move |ts| ts.completed_duration(now, dur)),
    };
    Ok((f, start))
}

/// Which task timestamp date-window filters select on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DateField {
    /// Select on the creation date.
    Started,
    /// Select on the completion date.
    Finished,
}

fn parse_bound(date: &str) -> Result<OffsetDateTime, QueryError> {
    calendar::parse_date(date).map_err(|source| QueryError::InvalidDate {
        token: date.to_owned(),
        source,
    })
}
