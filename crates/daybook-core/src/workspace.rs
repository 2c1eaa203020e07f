use crate::id::{EntryId, TaskId};
use crate::task::{Priority, Task, TaskSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// A dated journal checkpoint: the tasks active as of one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// When the entry was opened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// Ids of the tasks active that day, in the order they were added.
    #[serde(default)]
    pub tasks: Vec<TaskId>,
}

/// The top-level persisted container for one user's task history: every
/// entry, every task, and a tag reverse index.
///
/// The workspace exclusively owns its entries and tasks; entries hold only
/// id references into the global task set. Entries are created at most
/// once per calendar day and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace name; doubles as the persisted file stem.
    pub name: String,
    /// Id of the most recent entry, if any exists yet.
    #[serde(default)]
    pub last: Option<EntryId>,
    /// All journal entries keyed by day.
    #[serde(default)]
    pub entries: BTreeMap<EntryId, Entry>,
    /// Every task ever recorded, keyed by id.
    #[serde(default)]
    pub tasks: TaskSet,
    /// Tag to task-id reverse index, maintained by [`Workspace::tag`].
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<TaskId>>,
}

impl Workspace {
    /// Initialise an empty workspace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last: None,
            entries: BTreeMap::new(),
            tasks: TaskSet::new(),
            tags: BTreeMap::new(),
        }
    }

    /// The tasks referenced by an entry. An unknown entry id yields an
    /// empty set, not an error.
    #[must_use]
    pub fn entry_tasks(&self, id: EntryId) -> TaskSet {
        let Some(entry) = self.entries.get(&id) else {
            return TaskSet::new();
        };

        entry
            .tasks
            .iter()
            .filter_map(|id| self.tasks.get(*id).cloned())
            .collect()
    }

    /// The entry for the day of `now`, creating it if needed. A fresh
    /// entry carries forward the unfinished subset of the previous entry's
    /// tasks and becomes the new "last" entry.
    ///
    /// Idempotent within a calendar day. Completed tasks drop out of the
    /// new entry's active list but stay in the global set.
    pub fn new_entry(&mut self, now: OffsetDateTime) -> EntryId {
        let id = EntryId::for_day(now);
        if self.entries.contains_key(&id) {
            return id;
        }

        let mut entry = Entry {
            date: now,
            tasks: Vec::new(),
        };
        if let Some(last) = self.last {
            let open = self.entry_tasks(last).unfinished();
            entry.tasks = open.ids().collect();
        }

        self.entries.insert(id, entry);
        self.last = Some(id);
        id
    }

    /// Create a task in the given entry (and the global set), returning
    /// its id.
    pub fn add_task(
        &mut self,
        entry: EntryId,
        title: impl Into<String>,
        priority: Priority,
        now: OffsetDateTime,
    ) -> TaskId {
        let id = TaskId::from_timestamp(now);
        let mut task = Task::new(id, title, now);
        task.priority = priority;
        self.tasks.insert(task);
        if let Some(entry) = self.entries.get_mut(&entry) {
            entry.tasks.push(id);
        }
        id
    }

    /// Add a tag to the task, maintaining the reverse index. Returns false
    /// when no such task exists.
    pub fn tag(&mut self, id: TaskId, tag: &str) -> bool {
        let tag = tag.trim();
        let Some(task) = self.tasks.get_mut(id) else {
            return false;
        };
        if !task.add_tag(tag) {
            return true;
        }

        let index = self.tags.entry(tag.to_owned()).or_default();
        if !index.contains(&id) {
            index.push(id);
        }
        true
    }

    /// Mutable access to a task by id.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn new_entry_is_idempotent_within_a_day() {
        let mut ws = Workspace::new("test");
        let morning = ws.new_entry(datetime!(2024-01-15 09:00 UTC));
        let evening = ws.new_entry(datetime!(2024-01-15 21:00 UTC));

        assert_eq!(morning, evening);
        assert_eq!(ws.entries.len(), 1);
        assert_eq!(ws.last, Some(morning));
    }

    #[test]
    fn rollover_carries_unfinished_tasks_only() {
        let mut ws = Workspace::new("test");
        let monday = ws.new_entry(datetime!(2024-01-15 09:00 UTC));
        let shipped = ws.add_task(
            monday,
            "ship the release",
            Priority::High,
            datetime!(2024-01-15 09:05 UTC),
        );
        let open = ws.add_task(
            monday,
            "write the retro notes",
            Priority::Normal,
            datetime!(2024-01-15 09:06 UTC),
        );

        if let Some(task) = ws.task_mut(shipped) {
            task.mark_done(datetime!(2024-01-15 16:00 UTC));
        }

        let tuesday = ws.new_entry(datetime!(2024-01-16 09:00 UTC));
        assert_ne!(monday, tuesday);

        let carried = ws.entry_tasks(tuesday);
        assert_eq!(carried.ids().collect::<Vec<_>>(), vec![open]);

        // The completed task stays in the global set for historical queries.
        assert!(ws.tasks.contains(shipped));
        assert_eq!(ws.last, Some(tuesday));
    }

    #[test]
    fn entry_tasks_of_unknown_entry_is_empty() {
        let ws = Workspace::new("test");
        assert!(ws.entry_tasks(EntryId(12345)).is_empty());
    }

    #[test]
    fn tagging_updates_task_and_reverse_index() {
        let mut ws = Workspace::new("test");
        let entry = ws.new_entry(datetime!(2024-01-15 09:00 UTC));
        let id = ws.add_task(
            entry,
            "prune the hedge",
            Priority::Low,
            datetime!(2024-01-15 09:05 UTC),
        );

        assert!(ws.tag(id, " garden "));
        assert!(ws.tag(id, "garden"));
        assert!(!ws.tag(TaskId(999), "garden"));

        let task = ws.tasks.get(id).map(|t| t.tags.clone());
        assert_eq!(task, Some(vec!["garden".to_owned()]));
        assert_eq!(ws.tags.get("garden"), Some(&vec![id]));
    }

    #[test]
    fn add_task_registers_in_entry_and_global_set() {
        let mut ws = Workspace::new("test");
        let entry = ws.new_entry(datetime!(2024-01-15 09:00 UTC));
        let id = ws.add_task(
            entry,
            "book the dentist",
            Priority::Normal,
            datetime!(2024-01-15 10:00 UTC),
        );

        assert!(ws.tasks.contains(id));
        assert!(ws.entry_tasks(entry).contains(id));
    }
}
