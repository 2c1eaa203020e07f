use crate::calendar::format_date;
use crate::filter::{self, DateField, Filter, QueryError};
use crate::task::{Priority, TaskSet};
use time::OffsetDateTime;

/// Which completion-state filter seeds a chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompletionStatus {
    /// Only completed tasks.
    Completed,
    /// Only tasks not yet completed.
    Uncompleted,
    /// No completion filter.
    Any,
}

impl CompletionStatus {
    /// The task timestamp date tokens select on for this status:
    /// uncompleted listings go by creation date, everything else by
    /// completion date.
    #[must_use]
    pub const fn date_field(self) -> DateField {
        match self {
            Self::Uncompleted => DateField::Started,
            Self::Completed | Self::Any => DateField::Finished,
        }
    }
}

/// An ordered, pre-validated sequence of set-narrowing filters plus the
/// tracked display bounds they imply.
///
/// A chain is built once from query words and is side-effect free to
/// apply: filtering the same input twice yields identical results.
pub struct FilterChain {
    chain: Vec<Filter>,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
    field: DateField,
    now: OffsetDateTime,
}

impl FilterChain {
    /// Compile query words into a chain seeded with the completion filter
    /// for `status`. Relative windows resolve against `now`.
    ///
    /// Date tokens select on the field implied by `status`; see
    /// [`FilterChain::parse_selecting`] to override that.
    ///
    /// # Errors
    /// Returns the first [`QueryError`] encountered; no partial chain is
    /// produced.
    pub fn parse(
        words: &[String],
        status: CompletionStatus,
        now: OffsetDateTime,
    ) -> Result<Self, QueryError> {
        Self::parse_selecting(words, status, status.date_field(), now)
    }

    /// Like [`FilterChain::parse`] but with an explicit date field, for
    /// reports over completed tasks selected by their creation date.
    ///
    /// # Errors
    /// Returns the first [`QueryError`] encountered; no partial chain is
    /// produced.
    pub fn parse_selecting(
        words: &[String],
        status: CompletionStatus,
        field: DateField,
        now: OffsetDateTime,
    ) -> Result<Self, QueryError> {
        let mut chain = Self {
            chain: Vec::new(),
            start: None,
            end: None,
            field,
            now,
        };

        match status {
            CompletionStatus::Completed => chain.chain.push(filter::completed()),
            CompletionStatus::Uncompleted => chain.chain.push(filter::unfinished()),
            CompletionStatus::Any => {}
        }

        for word in words {
            chain.process_word(word.trim())?;
        }

        Ok(chain)
    }

    fn process_word(&mut self, word: &str) -> Result<(), QueryError> {
        let unmatched = || QueryError::Unmatched {
            token: word.to_owned(),
        };

        let f = if let Some(rest) = word.strip_prefix("tag:").or_else(|| word.strip_prefix("t:")) {
            if rest.is_empty() {
                return Err(unmatched());
            }
            filter::tag(rest)
        } else if let Some(rest) = word.strip_prefix("from:") {
            if !date_shaped(rest) {
                return Err(unmatched());
            }
            let (f, date) = match self.field {
                DateField::Started => filter::started_after(rest)?,
                DateField::Finished => filter::completed_after(rest)?,
            };
            self.raise_start(date);
            f
        } else if let Some(rest) = word.strip_prefix("to:") {
            if !date_shaped(rest) {
                return Err(unmatched());
            }
            let (f, date) = match self.field {
                DateField::Started => filter::started_before(rest)?,
                DateField::Finished => filter::completed_before(rest)?,
            };
            self.lower_end(date);
            f
        } else if let Some(rest) = word.strip_prefix("last:") {
            let (f, start) = filter::duration(rest, self.field, self.now)?;
            self.raise_start(start);
            f
        } else if let Some(rest) = word.strip_prefix("pri:") {
            let pri = Priority::from_letter(rest);
            if pri == Priority::Unknown {
                return Err(unmatched());
            }
            filter::priority(pri)
        } else if structured(word) {
            return Err(unmatched());
        } else {
            filter::title(word)?
        };

        self.chain.push(f);
        Ok(())
    }

    fn raise_start(&mut self, date: OffsetDateTime) {
        if self.start.is_none_or(|start| date > start) {
            self.start = Some(date);
        }
    }

    fn lower_end(&mut self, date: OffsetDateTime) {
        if self.end.is_none_or(|end| date < end) {
            self.end = Some(date);
        }
    }

    /// Apply every filter in insertion order against a copy of the input.
    #[must_use]
    pub fn filter(&self, tasks: &TaskSet) -> TaskSet {
        let mut tasks = tasks.clone();
        for f in &self.chain {
            tasks = f(&tasks);
        }
        tasks
    }

    /// The tracked bounds, rendered for report headers: an empty string,
    /// `up to END`, `starting START`, or `between START and END`.
    #[must_use]
    pub fn time_range(&self) -> String {
        match (self.start, self.end) {
            (None, None) => String::new(),
            (None, Some(end)) => format!("up to {}", format_date(end)),
            (Some(start), None) => format!("starting {}", format_date(start)),
            (Some(start), Some(end)) => {
                format!("between {} and {}", format_date(start), format_date(end))
            }
        }
    }

    /// Number of filter stages, the completion seed included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// True when the chain applies no filters at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

/// True for tokens of the shape `word:rest` that should have matched a
/// structured prefix; these are hard errors rather than title patterns.
fn structured(word: &str) -> bool {
    word.split_once(':').is_some_and(|(head, _)| {
        !head.is_empty() && head.chars().all(|c| c.is_alphanumeric() || c == '_')
    })
}

fn date_shaped(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter()
            .enumerate()
            .all(|(i, c)| match i {
                4 | 7 => *c == b'-',
                _ => c.is_ascii_digit(),
            })
}

/// The filter mini-grammar, for usage messages.
pub const FILTER_USAGE: &str = "Filter language:

Filters can be used in many places to limit the scope of the active tasks.

    t:<tag> or tag:<tag>    Only show tasks with the <tag>
    from:YYYY-MM-DD         Only show tasks after the date given
    to:YYYY-MM-DD           Only show tasks before the date given
    last:<dur>              Only show tasks that have occurred in the
                            listed duration. This should be of the form
                            np, where 'n' is a number and p is a period
                            specifier: 'h', 'd', 'w', or 'm' for hours,
                            days, weeks, and months, respectively.
    pri:<priority>          Only show tasks with at least the priority
                            given; priority may be one of
                                'L' for low
                                'N' for normal
                                'H' for high
                                '!' for urgent

Any other word is used as a regular expression to select tasks by title.
";

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::id::TaskId;
    use crate::task::Task;
    use time::macros::datetime;

    fn words(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| (*t).to_owned()).collect()
    }

    fn sample_set() -> TaskSet {
        let mut a = Task::new(TaskId(1), "quarterly report", datetime!(2024-01-02 09:00 UTC));
        a.priority = Priority::High;
        a.add_tag("work");
        a.mark_done(datetime!(2024-01-10 17:00 UTC));

        let mut b = Task::new(TaskId(2), "clear the gutters", datetime!(2024-01-03 09:00 UTC));
        b.priority = Priority::Urgent;
        b.add_tag("home");
        b.mark_done(datetime!(2024-01-20 11:00 UTC));

        let mut c = Task::new(TaskId(3), "reply to auditors", datetime!(2024-01-18 08:00 UTC));
        c.add_tag("work");

        [a, b, c].into_iter().collect()
    }

    #[test]
    fn tag_and_priority_tokens_intersect() {
        let now = datetime!(2024-01-25 12:00 UTC);
        let chain = FilterChain::parse(&words(&["tag:work", "pri:H"]), CompletionStatus::Completed, now)
            .unwrap_or_else(|err| panic!("query must parse: {err}"));

        let result = chain.filter(&sample_set());
        assert_eq!(result.ids().collect::<Vec<_>>(), vec![TaskId(1)]);
    }

    #[test]
    fn last_window_resolves_against_the_given_now() {
        let now = datetime!(2024-01-25 12:00 UTC);
        let chain = FilterChain::parse(&words(&["last:2w"]), CompletionStatus::Completed, now)
            .unwrap_or_else(|err| panic!("query must parse: {err}"));

        // Finished 5 days ago: in. Finished 15 days ago: out.
        let result = chain.filter(&sample_set());
        assert_eq!(result.ids().collect::<Vec<_>>(), vec![TaskId(2)]);
        assert_eq!(chain.time_range(), "starting 2024-01-11");
    }

    #[test]
    fn from_to_selects_finished_and_reports_the_range() {
        let now = datetime!(2024-02-01 12:00 UTC);
        let chain = FilterChain::parse(
            &words(&["from:2024-01-01", "to:2024-01-31"]),
            CompletionStatus::Completed,
            now,
        )
        .unwrap_or_else(|err| panic!("query must parse: {err}"));

        let result = chain.filter(&sample_set());
        assert_eq!(result.len(), 2);
        assert!(!result.contains(TaskId(3)));
        assert_eq!(chain.time_range(), "between 2024-01-01 and 2024-01-31");
    }

    #[test]
    fn uncompleted_chains_select_on_the_creation_date() {
        let now = datetime!(2024-01-25 12:00 UTC);
        let chain = FilterChain::parse(
            &words(&["from:2024-01-15"]),
            CompletionStatus::Uncompleted,
            now,
        )
        .unwrap_or_else(|err| panic!("query must parse: {err}"));

        let result = chain.filter(&sample_set());
        assert_eq!(result.ids().collect::<Vec<_>>(), vec![TaskId(3)]);
    }

    #[test]
    fn unstructured_words_fall_back_to_title_regexes() {
        let now = datetime!(2024-01-25 12:00 UTC);
        let chain = FilterChain::parse(&words(&["gutter"]), CompletionStatus::Any, now)
            .unwrap_or_else(|err| panic!("query must parse: {err}"));

        let result = chain.filter(&sample_set());
        assert_eq!(result.ids().collect::<Vec<_>>(), vec![TaskId(2)]);
    }

    #[test]
    fn unknown_structured_tokens_are_hard_errors() {
        let now = datetime!(2024-01-25 12:00 UTC);
        let err = FilterChain::parse(&words(&["foo:bar"]), CompletionStatus::Any, now)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, QueryError::Unmatched { ref token } if token == "foo:bar"));

        // Bad priority letters and empty tags are unmatched too.
        assert!(FilterChain::parse(&words(&["pri:Z"]), CompletionStatus::Any, now).is_err());
        assert!(FilterChain::parse(&words(&["t:"]), CompletionStatus::Any, now).is_err());
        assert!(FilterChain::parse(&words(&["from:soon"]), CompletionStatus::Any, now).is_err());
    }

    #[test]
    fn first_error_rejects_the_whole_query() {
        let now = datetime!(2024-01-25 12:00 UTC);
        let result = FilterChain::parse(
            &words(&["tag:work", "last:3y", "pri:H"]),
            CompletionStatus::Completed,
            now,
        );
        assert!(matches!(result, Err(QueryError::InvalidDuration { .. })));

        // A window reaching before representable time is an error too.
        let result = FilterChain::parse(
            &words(&["last:4294967295h"]),
            CompletionStatus::Completed,
            now,
        );
        assert!(matches!(result, Err(QueryError::InvalidDuration { .. })));
    }

    #[test]
    fn applying_a_chain_twice_is_idempotent() {
        let now = datetime!(2024-01-25 12:00 UTC);
        let chain = FilterChain::parse(
            &words(&["tag:work", "from:2024-01-01"]),
            CompletionStatus::Completed,
            now,
        )
        .unwrap_or_else(|err| panic!("query must parse: {err}"));

        let set = sample_set();
        let once = chain.filter(&set);
        let twice = chain.filter(&set);
        assert_eq!(
            once.ids().collect::<Vec<_>>(),
            twice.ids().collect::<Vec<_>>()
        );
        // Input untouched.
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn bounds_narrow_to_the_tightest_pair() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let chain = FilterChain::parse(
            &words(&[
                "from:2024-01-01",
                "from:2024-01-10",
                "to:2024-02-20",
                "to:2024-02-15",
            ]),
            CompletionStatus::Completed,
            now,
        )
        .unwrap_or_else(|err| panic!("query must parse: {err}"));

        assert_eq!(chain.time_range(), "between 2024-01-10 and 2024-02-15");
    }

    #[test]
    fn time_range_renders_each_shape() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let none = FilterChain::parse(&[], CompletionStatus::Any, now)
            .unwrap_or_else(|err| panic!("query must parse: {err}"));
        assert_eq!(none.time_range(), "");
        assert!(none.is_empty());

        let upto = FilterChain::parse(&words(&["to:2024-02-01"]), CompletionStatus::Any, now)
            .unwrap_or_else(|err| panic!("query must parse: {err}"));
        assert_eq!(upto.time_range(), "up to 2024-02-01");
    }

    #[test]
    fn seed_filter_counts_toward_len() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let chain = FilterChain::parse(&words(&["tag:work"]), CompletionStatus::Completed, now)
            .unwrap_or_else(|err| panic!("query must parse: {err}"));
        assert_eq!(chain.len(), 2);
    }
}
