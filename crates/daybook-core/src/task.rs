use crate::calendar::{self, format_date};
use crate::id::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::{Duration, OffsetDateTime};

/// Importance of a task. The ordering is total: threshold filters keep
/// everything at or above the requested level.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Sentinel for unparseable input; never assigned by normal flows.
    Unknown,
    /// Rainy-day tasks.
    Low,
    /// The default for new tasks.
    Normal,
    /// Should be done before normal-priority tasks.
    High,
    /// Time-sensitive tasks.
    Urgent,
}

impl Priority {
    /// Map a one-letter specifier to a priority; anything unrecognized is
    /// [`Priority::Unknown`].
    #[must_use]
    pub fn from_letter(s: &str) -> Self {
        match s.trim() {
            "L" => Self::Low,
            "N" => Self::Normal,
            "H" => Self::High,
            "!" => Self::Urgent,
            _ => Self::Unknown,
        }
    }

    /// The one-letter display specifier.
    #[must_use]
    pub const fn letter(self) -> &'static str {
        match self {
            Self::Unknown => "?",
            Self::Low => "L",
            Self::Normal => "N",
            Self::High => "H",
            Self::Urgent => "!",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Priority specifiers, for usage messages.
pub const PRIORITY_USAGE: &str = "Priority specifiers:

        ?       Unknown
        L       Low
        N       Normal
        H       High
        !       Urgent
";

/// A single todo item.
///
/// Tasks are mutable in place and never deleted, only marked done.
/// `finished` is `Some` exactly when `done` is true and is never earlier
/// than `created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within a workspace.
    pub id: TaskId,
    /// Free-text title.
    pub title: String,
    /// Completion flag.
    pub done: bool,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    /// Completion timestamp; meaningful only when `done`.
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub finished: Option<OffsetDateTime>,
    /// Free-text annotations in insertion order.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Case-sensitive tags, kept sorted for deterministic display.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Importance level.
    pub priority: Priority,
}

impl Task {
    /// Create an incomplete normal-priority task started at `created`.
    #[must_use]
    pub fn new(id: TaskId, title: impl Into<String>, created: OffsetDateTime) -> Self {
        Self {
            id,
            title: title.into(),
            done: false,
            created,
            finished: None,
            notes: Vec::new(),
            tags: Vec::new(),
            priority: Priority::Normal,
        }
    }

    /// Mark the task completed at `now`.
    pub fn mark_done(&mut self, now: OffsetDateTime) {
        self.done = true;
        self.finished = Some(now);
    }

    /// True when the task carries the exact (trimmed) tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.tags.iter().any(|t| t == tag)
    }

    /// Attach a tag, keeping the tag list sorted. Returns false when the
    /// trimmed tag is empty or already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_owned());
        self.tags.sort();
        true
    }

    /// All tags joined for display.
    #[must_use]
    pub fn tag_line(&self) -> String {
        self.tags.join(", ")
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.done { "X" } else { " " };
        write!(
            f,
            "[{marker}] {} ({}) - {}",
            self.title,
            self.priority,
            format_date(self.created)
        )?;
        if let Some(finished) = self.finished.filter(|_| self.done) {
            write!(f, ", completed {}", format_date(finished))?;
        }
        Ok(())
    }
}

/// An unordered collection of tasks keyed by id.
///
/// All algebra operations are pure: the receiver is untouched and a fresh
/// set is returned. An empty set filters to an empty set, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskSet(BTreeMap<TaskId, Task>);

impl TaskSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task keyed by its own id, returning any displaced task.
    pub fn insert(&mut self, task: Task) -> Option<Task> {
        self.0.insert(task.id, task)
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.0.get(&id)
    }

    /// Mutable access to a task. This is the mutation contract: a task has
    /// exactly one representation in the set, so edits commit in place.
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.0.get_mut(&id)
    }

    /// True when the set holds a task with this id.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.0.contains_key(&id)
    }

    /// Number of tasks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the set holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the tasks in id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.0.values()
    }

    /// Iterate over the ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.0.keys().copied()
    }

    pub(crate) fn filtered(&self, keep: impl Fn(&Task) -> bool) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, task)| keep(task))
                .map(|(id, task)| (*id, task.clone()))
                .collect(),
        )
    }

    /// Tasks with at least the given priority.
    #[must_use]
    pub fn filter_priority(&self, pri: Priority) -> Self {
        self.filtered(|task| task.priority >= pri)
    }

    /// Tasks carrying the exact (trimmed, case-sensitive) tag.
    #[must_use]
    pub fn filter_tag(&self, tag: &str) -> Self {
        self.filtered(|task| task.has_tag(tag))
    }

    /// Tasks carrying every given tag. Blank tags are ignored.
    #[must_use]
    pub fn filter_tags(&self, tags: &[String]) -> Self {
        let mut tasks = self.clone();
        for tag in tags {
            let tag = tag.trim();
            if !tag.is_empty() {
                tasks = tasks.filter_tag(tag);
            }
        }
        tasks
    }

    /// The completed subset.
    #[must_use]
    pub fn completed(&self) -> Self {
        self.filtered(|task| task.done)
    }

    /// The subset not yet completed.
    #[must_use]
    pub fn unfinished(&self) -> Self {
        self.filtered(|task| !task.done)
    }

    /// Tasks completed within the last `dur` before `now`, selecting on
    /// the completion date.
    #[must_use]
    pub fn completed_duration(&self, now: OffsetDateTime, dur: Duration) -> Self {
        let cutoff = now - dur;
        self.filtered(|task| task.done && task.finished.is_some_and(|f| f > cutoff))
    }

    /// Tasks completed within the last `dur` before `now`, selecting on
    /// the creation date. Only completed tasks are considered.
    #[must_use]
    pub fn created_duration(&self, now: OffsetDateTime, dur: Duration) -> Self {
        let cutoff = now - dur;
        self.filtered(|task| task.done && task.created > cutoff)
    }

    /// Tasks completed on a day within `[start, end]` inclusive, selecting
    /// on the completion date.
    #[must_use]
    pub fn completed_range(&self, start: OffsetDateTime, end: OffsetDateTime) -> Self {
        self.filtered(|task| {
            task.done
                && task
                    .finished
                    .is_some_and(|f| calendar::on_or_after(f, start) && calendar::on_or_before(f, end))
        })
    }

    /// Tasks completed whose creation falls on a day within `[start, end]`
    /// inclusive. Only completed tasks are considered.
    #[must_use]
    pub fn created_range(&self, start: OffsetDateTime, end: OffsetDateTime) -> Self {
        self.filtered(|task| {
            task.done
                && calendar::on_or_after(task.created, start)
                && calendar::on_or_before(task.created, end)
        })
    }

    /// The tasks in ascending id order; ids being time-derived, this is
    /// creation order.
    #[must_use]
    pub fn sort(&self) -> Vec<&Task> {
        self.0.values().collect()
    }
}

impl FromIterator<Task> for TaskSet {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self(iter.into_iter().map(|task| (task.id, task)).collect())
    }
}
