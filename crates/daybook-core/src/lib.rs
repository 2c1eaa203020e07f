//! Domain model and query engine for daybook workspaces.
//!
//! A [`Workspace`] holds every task ever recorded plus a series of dated
//! journal entries listing which tasks were active each day. [`TaskSet`]
//! provides the pure set algebra (priority, tag, completion, and date
//! selection) and [`FilterChain`] compiles a sequence of query words into
//! an ordered pipeline of those operations.
//!
//! This crate performs no I/O and reads no environment; persistence lives
//! in `daybook-store` and rendering in the `daybook` CLI.

/// Calendar helpers: the date format and day-granularity comparisons.
pub mod calendar;
/// Filter primitives and their eager-validation errors.
pub mod filter;
/// Identifier types.
pub mod id;
/// Query-word classification and the ordered filter chain.
pub mod query;
/// Task, priority, and task-set algebra.
pub mod task;
/// Workspace and journal-entry orchestration.
pub mod workspace;

pub use filter::{DateField, Filter, QueryError};
pub use id::{EntryId, TaskId};
pub use query::{CompletionStatus, FilterChain};
pub use task::{Priority, Task, TaskSet};
pub use workspace::{Entry, Workspace};
