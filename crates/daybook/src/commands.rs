use anyhow::{Context, Result, anyhow, bail};
use daybook_core::calendar::{self, format_date};
use daybook_core::task::PRIORITY_USAGE;
use daybook_core::{
    CompletionStatus, DateField, EntryId, FilterChain, Priority, Task, TaskId, Workspace,
};
use daybook_store::WorkspaceStore;
use time::OffsetDateTime;

use crate::Command;
use crate::config::Settings;

/// Dispatch one parsed subcommand against the store.
pub fn run(command: Command, store: &WorkspaceStore, settings: &Settings) -> Result<()> {
    let now = OffsetDateTime::now_utc();
    match command {
        Command::Today {
            workspace,
            query,
            init,
            long,
            markdown,
            priority,
        } => today(store, &workspace, &query, init, long, markdown, priority.as_deref(), now),

        Command::Add {
            workspace,
            title,
            priority,
            init,
        } => {
            let pri = parse_priority(priority.as_deref(), settings.default_priority)?;
            add(store, &workspace, &title.join(" "), pri, init, now)
        }

        Command::Complete { workspace, index } => {
            mutate_listed(store, &workspace, index, now, |task| {
                task.mark_done(now);
                println!("Completed '{}'", task.title);
            })
        }

        Command::Annotate {
            workspace,
            index,
            notes,
            replace,
        } => mutate_listed(store, &workspace, index, now, move |task| {
            if replace {
                task.notes = notes;
            } else {
                task.notes.extend(notes);
            }
            println!("Annotated '{}'", task.title);
        }),

        Command::Tag {
            workspace,
            index,
            tags,
        } => tag(store, &workspace, index, &tags, now),

        Command::Prioritise {
            workspace,
            index,
            priority,
        } => {
            let pri = Priority::from_letter(&priority);
            if pri == Priority::Unknown {
                bail!("invalid priority {priority:?}\n{PRIORITY_USAGE}");
            }
            mutate_listed(store, &workspace, index, now, move |task| {
                task.priority = pri;
                println!("Set '{}' to priority {pri}", task.title);
            })
        }

        Command::Backdate {
            workspace,
            index,
            date,
        } => {
            let created = calendar::parse_date(&date)
                .with_context(|| format!("invalid date {date:?} (expected YYYY-MM-DD)"))?;
            mutate_listed(store, &workspace, index, now, move |task| {
                task.created = created;
                println!("Backdated '{}' to {}", task.title, format_date(created));
            })
        }

        Command::Review {
            workspace,
            query,
            started,
            long,
            markdown,
            priority,
        } => review(store, &workspace, &query, started, long, markdown, priority.as_deref(), now),
    }
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
fn today(
    store: &WorkspaceStore,
    workspace: &str,
    query: &[String],
    init: bool,
    long: bool,
    markdown: bool,
    priority: Option<&str>,
    now: OffsetDateTime,
) -> Result<()> {
    let mut ws = store.read(workspace, init)?;
    let entries_before = ws.entries.len();
    let entry = ws.new_entry(now);

    let chain = FilterChain::parse(query, CompletionStatus::Uncompleted, now)?;
    let mut tasks = chain.filter(&ws.entry_tasks(entry));
    if let Some(letter) = priority {
        tasks = tasks.filter_priority(require_priority(letter)?);
    }

    let listing = numbered(&ws, entry, &tasks);
    let header = format!("TODO {} ({} tasks)", format_date(now), listing.len());
    if markdown {
        print_markdown(&header, &listing, long);
    } else {
        print_plain(&header, &listing, long, true);
    }

    // The rollover is the only mutation a listing makes; persist it so a
    // fresh entry survives read-only days.
    if ws.entries.len() != entries_before {
        store.write(&ws)?;
    }
    Ok(())
}

fn add(
    store: &WorkspaceStore,
    workspace: &str,
    title: &str,
    priority: Priority,
    init: bool,
    now: OffsetDateTime,
) -> Result<()> {
    let mut ws = store.read(workspace, init)?;
    let entry = ws.new_entry(now);
    let id = ws.add_task(entry, title, priority, now);
    store.write(&ws)?;

    if let Some(task) = ws.tasks.get(id) {
        println!("Added {task}");
    }
    Ok(())
}

fn tag(
    store: &WorkspaceStore,
    workspace: &str,
    index: usize,
    tags: &str,
    now: OffsetDateTime,
) -> Result<()> {
    let mut ws = store.read(workspace, false)?;
    let entry = ws.new_entry(now);
    let id = resolve_index(&ws, entry, index)?;

    for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        ws.tag(id, tag);
    }
    store.write(&ws)?;

    if let Some(task) = ws.tasks.get(id) {
        println!("Tags for '{}': {}", task.title, task.tag_line());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
fn review(
    store: &WorkspaceStore,
    workspace: &str,
    query: &[String],
    started: bool,
    long: bool,
    markdown: bool,
    priority: Option<&str>,
    now: OffsetDateTime,
) -> Result<()> {
    // A review with no query defaults to the last two weeks.
    let query: Vec<String> = if query.is_empty() {
        vec!["last:2w".to_owned()]
    } else {
        query.to_vec()
    };

    let field = if started {
        DateField::Started
    } else {
        DateField::Finished
    };
    let chain = FilterChain::parse_selecting(&query, CompletionStatus::Completed, field, now)?;

    let ws = store.read(workspace, false)?;
    let mut tasks = chain.filter(&ws.tasks);
    if let Some(letter) = priority {
        tasks = tasks.filter_priority(require_priority(letter)?);
    }

    let header = review_header(started, &chain.time_range());
    let listing: Vec<(Option<usize>, &Task)> =
        tasks.sort().into_iter().map(|task| (None, task)).collect();
    if markdown {
        print_markdown(&header, &listing, long);
    } else {
        print_plain(&header, &listing, long, false);
    }
    Ok(())
}

fn review_header(started: bool, time_range: &str) -> String {
    let selector = if started { "started" } else { "finished" };
    if time_range.is_empty() {
        format!("Completed tasks {selector}")
    } else {
        format!("Completed tasks {selector} {time_range}")
    }
}

/// Apply one mutation to the task at `index` of today's listing, then
/// persist the workspace.
fn mutate_listed(
    store: &WorkspaceStore,
    workspace: &str,
    index: usize,
    now: OffsetDateTime,
    mutate: impl FnOnce(&mut Task),
) -> Result<()> {
    let mut ws = store.read(workspace, false)?;
    let entry = ws.new_entry(now);
    let id = resolve_index(&ws, entry, index)?;

    let task = ws
        .task_mut(id)
        .ok_or_else(|| anyhow!("task {id} vanished from the workspace"))?;
    mutate(task);

    store.write(&ws)?;
    Ok(())
}

/// Indexes refer to today's unfinished tasks in id order, as numbered by
/// `daybook today`.
fn resolve_index(ws: &Workspace, entry: EntryId, index: usize) -> Result<TaskId> {
    let tasks = ws.entry_tasks(entry).unfinished();
    tasks
        .sort()
        .get(index)
        .map(|task| task.id)
        .ok_or_else(|| anyhow!("no task numbered {index}; run `daybook today` for the list"))
}

/// Pair each task with its number in today's canonical listing, so a
/// filtered view still shows usable indexes.
fn numbered(
    ws: &Workspace,
    entry: EntryId,
    tasks: &daybook_core::TaskSet,
) -> Vec<(Option<usize>, Task)> {
    let canonical: Vec<TaskId> = ws.entry_tasks(entry).unfinished().ids().collect();
    tasks
        .sort()
        .into_iter()
        .map(|task| {
            let position = canonical.iter().position(|id| *id == task.id);
            (position, task.clone())
        })
        .collect()
}

fn print_plain<T: std::borrow::Borrow<Task>>(
    header: &str,
    listing: &[(Option<usize>, T)],
    long: bool,
    numbered: bool,
) {
    println!("{header}:");
    if listing.is_empty() {
        println!("No tasks found.");
        return;
    }
    for (position, task) in listing {
        let task = task.borrow();
        match position {
            Some(n) if numbered => println!("{n:>4} {task}"),
            _ => println!("\t{task}"),
        }
        if long {
            if !task.tags.is_empty() {
                println!("\t\tTags: {}", task.tag_line());
            }
            for note in &task.notes {
                println!("\t\t+ {note}");
            }
        }
    }
}

fn print_markdown<T: std::borrow::Borrow<Task>>(
    header: &str,
    listing: &[(Option<usize>, T)],
    long: bool,
) {
    println!("## {header}");
    if listing.is_empty() {
        println!("No tasks found.");
        return;
    }
    for (_, task) in listing {
        let task = task.borrow();
        println!("#### {task}");
        if long {
            for note in &task.notes {
                println!("+ {note}");
            }
        }
    }
}

fn parse_priority(letter: Option<&str>, fallback: Priority) -> Result<Priority> {
    match letter {
        None => Ok(fallback),
        Some(letter) => require_priority(letter),
    }
}

fn require_priority(letter: &str) -> Result<Priority> {
    let pri = Priority::from_letter(letter);
    if pri == Priority::Unknown {
        bail!("invalid priority {letter:?}\n{PRIORITY_USAGE}");
    }
    Ok(pri)
}
