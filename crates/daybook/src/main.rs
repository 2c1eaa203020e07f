//! CLI entry point for daybook.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use daybook_core::query::FILTER_USAGE;
use daybook_core::task::PRIORITY_USAGE;
use daybook_store::WorkspaceStore;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use config::Settings;

mod commands;
mod config;

/// A task journal: todo items in dated entries, one file per workspace.
#[derive(Parser, Debug)]
#[command(
    name = "daybook",
    version,
    about = "daybook: a task journal with named workspaces and a query language"
)]
struct Cli {
    /// Directory holding workspace files (defaults to the user config dir).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List today's unfinished tasks, rolling the journal forward a day
    /// if needed.
    #[command(after_help = FILTER_USAGE)]
    Today {
        /// Workspace name.
        workspace: String,
        /// Query words narrowing the listing.
        query: Vec<String>,
        /// Initialise the workspace if it does not exist yet.
        #[arg(short = 'i', long)]
        init: bool,
        /// Show tags and annotations for each task.
        #[arg(short = 'l', long)]
        long: bool,
        /// Render the listing as markdown.
        #[arg(short = 'm', long)]
        markdown: bool,
        /// Only show tasks with at least this priority letter.
        #[arg(short = 'p', long)]
        priority: Option<String>,
    },

    /// Add a task to today's entry.
    #[command(after_help = PRIORITY_USAGE)]
    Add {
        /// Workspace name.
        workspace: String,
        /// Task title.
        #[arg(required = true)]
        title: Vec<String>,
        /// Priority letter for the new task.
        #[arg(short = 'p', long)]
        priority: Option<String>,
        /// Initialise the workspace if it does not exist yet.
        #[arg(short = 'i', long)]
        init: bool,
    },

    /// Mark a numbered task from today's listing as completed.
    Complete {
        /// Workspace name.
        workspace: String,
        /// Task number from `daybook today`.
        index: usize,
    },

    /// Attach annotations to a numbered task.
    Annotate {
        /// Workspace name.
        workspace: String,
        /// Task number from `daybook today`.
        index: usize,
        /// Annotation to attach; repeat for several.
        #[arg(long = "note", required = true)]
        notes: Vec<String>,
        /// Replace existing annotations instead of appending.
        #[arg(long)]
        replace: bool,
    },

    /// Tag a numbered task with comma-separated tags.
    Tag {
        /// Workspace name.
        workspace: String,
        /// Task number from `daybook today`.
        index: usize,
        /// Comma-separated tags, e.g. "work, urgent-ish".
        tags: String,
    },

    /// Change the priority of a numbered task.
    #[command(after_help = PRIORITY_USAGE)]
    Prioritise {
        /// Workspace name.
        workspace: String,
        /// Task number from `daybook today`.
        index: usize,
        /// New priority letter.
        priority: String,
    },

    /// Rewrite the created date of a numbered task.
    Backdate {
        /// Workspace name.
        workspace: String,
        /// Task number from `daybook today`.
        index: usize,
        /// New creation date, YYYY-MM-DD.
        date: String,
    },

    /// Report completed tasks within a time range.
    #[command(after_help = FILTER_USAGE)]
    Review {
        /// Workspace name.
        workspace: String,
        /// Query words; defaults to `last:2w`.
        query: Vec<String>,
        /// Select on creation dates instead of completion dates.
        #[arg(long)]
        started: bool,
        /// Show annotations for each task.
        #[arg(short = 'l', long)]
        long: bool,
        /// Render the report as markdown.
        #[arg(short = 'm', long)]
        markdown: bool,
        /// Only show tasks with at least this priority letter.
        #[arg(short = 'p', long)]
        priority: Option<String>,
    },
}

fn main() -> Result<()> {
    install_tracing();

    let Cli { data_dir, cmd } = Cli::parse();
    let settings = Settings::resolve(data_dir)?;
    let store = WorkspaceStore::new(settings.data_dir.clone());
    commands::run(cmd, &store, &settings)
}

fn install_tracing() {
    // RUST_LOG overrides; default is INFO.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_today_with_query_words() {
        let cli = Cli::parse_from(["daybook", "today", "work", "tag:deep", "pri:H", "-l"]);
        match cli.cmd {
            Command::Today {
                workspace,
                query,
                long,
                markdown,
                ..
            } => {
                assert_eq!(workspace, "work");
                assert_eq!(query, vec!["tag:deep", "pri:H"]);
                assert!(long);
                assert!(!markdown);
            }
            other => panic!("expected today command, got {other:?}"),
        }
    }

    #[test]
    fn parse_add_joins_title_words() {
        let cli = Cli::parse_from(["daybook", "add", "work", "-p", "H", "fix", "the", "build"]);
        match cli.cmd {
            Command::Add {
                workspace,
                title,
                priority,
                init,
            } => {
                assert_eq!(workspace, "work");
                assert_eq!(title, vec!["fix", "the", "build"]);
                assert_eq!(priority.as_deref(), Some("H"));
                assert!(!init);
            }
            other => panic!("expected add command, got {other:?}"),
        }
    }

    #[test]
    fn add_requires_a_title() {
        assert!(Cli::try_parse_from(["daybook", "add", "work"]).is_err());
    }

    #[test]
    fn parse_review_flags() {
        let cli = Cli::parse_from([
            "daybook",
            "review",
            "work",
            "--started",
            "from:2024-01-01",
            "to:2024-01-31",
        ]);
        match cli.cmd {
            Command::Review { query, started, .. } => {
                assert_eq!(query, vec!["from:2024-01-01", "to:2024-01-31"]);
                assert!(started);
            }
            other => panic!("expected review command, got {other:?}"),
        }
    }

    #[test]
    fn parse_global_data_dir_after_subcommand() {
        let cli = Cli::parse_from(["daybook", "complete", "work", "0", "--data-dir", "/tmp/d"]);
        assert_eq!(cli.data_dir.as_deref(), Some(std::path::Path::new("/tmp/d")));
        match cli.cmd {
            Command::Complete { workspace, index } => {
                assert_eq!(workspace, "work");
                assert_eq!(index, 0);
            }
            other => panic!("expected complete command, got {other:?}"),
        }
    }
}
