//! transcripts - Turn Codex CLI rollouts into readable transcripts.
//!
//! Two modes of operation:
//! - **Interactive (TUI)**: `transcripts` or `transcripts <path>` opens the transcript viewer
//! - **CLI**: Subcommands like `list`, `html`, `json`, `info`, `view` for scripting

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use transcript_rollout::discovery::SessionQuery;
use transcript_rollout::MirrorPolicy;

mod commands;
mod html;
mod tui;
mod units;

use commands::export::{ExportFormat, ExportOptions};

#[derive(Parser)]
#[command(name = "transcripts")]
#[command(author, version, about = "Turn Codex rollouts into HTML, JSON, and terminal transcripts", long_about = None)]
struct Cli {
    /// Rollout or transcript.json to open directly in the viewer (TUI mode)
    path: Option<PathBuf>,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where to look for sessions and which ones to consider.
#[derive(Args, Debug, Clone)]
struct DiscoveryArgs {
    /// Override the Codex home directory
    #[arg(long, env = "CODEX_HOME")]
    codex_home: Option<PathBuf>,

    /// Maximum number of sessions to consider
    #[arg(short = 'n', long, default_value_t = 10)]
    limit: usize,

    /// Only sessions recorded in the current working directory
    #[arg(long)]
    cwd: bool,

    /// Case-insensitive filter over preview, cwd, branch, id and path
    #[arg(short, long)]
    query: Option<String>,

    /// Skip $CODEX_HOME/archived_sessions
    #[arg(long)]
    no_include_archived: bool,
}

impl DiscoveryArgs {
    fn to_query(&self) -> Result<SessionQuery> {
        let cwd = if self.cwd {
            Some(std::env::current_dir()?)
        } else {
            None
        };
        Ok(SessionQuery {
            limit: self.limit,
            include_archived: !self.no_include_archived,
            query: self.query.clone(),
            cwd,
        })
    }
}

/// Output placement shared by every export.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Output directory (default: a fresh temp dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name the output subdirectory after the session id (uses -o as parent)
    #[arg(short = 'a', long)]
    output_auto: bool,

    /// Copy the source rollout into the output directory
    #[arg(long)]
    include_source: bool,

    /// Keep both event_msg and response_item copies of each turn
    #[arg(long)]
    keep_mirrors: bool,
}

impl OutputArgs {
    fn into_options(self, repo: Option<String>) -> ExportOptions {
        ExportOptions {
            output: self.output,
            output_auto: self.output_auto,
            include_source: self.include_source,
            repo,
            policy: if self.keep_mirrors {
                MirrorPolicy::KeepAll
            } else {
                MirrorPolicy::PreferEventMessages
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List recent Codex sessions, newest first
    List {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,
    },

    /// Pick local sessions and export them
    Local {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Export the most recent session
        #[arg(long, conflicts_with = "select")]
        latest: bool,

        /// Export the sessions at these list positions (comma-separated, e.g. 0,2)
        #[arg(long)]
        select: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = ExportFormat::Html)]
        format: ExportFormat,

        /// GitHub owner/name for commit links (detected from session meta if omitted)
        #[arg(long)]
        repo: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Render a rollout to a standalone index.html
    Html {
        /// Path to the rollout file
        path: PathBuf,

        /// GitHub owner/name for commit links (detected from session meta if omitted)
        #[arg(long)]
        repo: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Convert a rollout to transcript.json
    Json {
        /// Path to the rollout file
        path: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show session metadata, parse statistics and conversation groups
    Info {
        /// Path to the session (rollout or transcript.json)
        path: PathBuf,

        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,
    },

    /// Print session content to stdout
    View {
        /// Path to the session (rollout or transcript.json)
        path: PathBuf,

        /// Output as JSON (for machine consumption)
        #[arg(long)]
        json: bool,

        /// Only these unit kinds (comma-separated: user, assistant, tool_call, tool_result, thinking, system)
        #[arg(short = 't', long = "type")]
        kinds: Option<String>,

        /// Only units containing this text (case-insensitive)
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Open the terminal transcript viewer
    Tui {
        /// Path to the session; the most recent session when omitted
        path: Option<PathBuf>,

        #[command(flatten)]
        discovery: DiscoveryArgs,
    },

    /// Validate a transcript.json export
    Validate {
        /// Path to the export (or a rollout, validated after normalization)
        path: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::List { discovery, json }) => commands::list::run(
            discovery.codex_home.as_deref(),
            &discovery.to_query()?,
            !discovery.cwd,
            json,
        ),
        Some(Commands::Local {
            discovery,
            latest,
            select,
            format,
            repo,
            output,
        }) => commands::local::run(
            discovery.codex_home.as_deref(),
            &discovery.to_query()?,
            !discovery.cwd,
            latest,
            select.as_deref(),
            format,
            &output.into_options(repo),
        ),
        Some(Commands::Html { path, repo, output }) => {
            commands::export::run(&path, ExportFormat::Html, &output.into_options(repo))
        }
        Some(Commands::Json { path, output }) => {
            commands::export::run(&path, ExportFormat::Json, &output.into_options(None))
        }
        Some(Commands::Info { path, json }) => commands::info::run(&path, json),
        Some(Commands::View {
            path,
            json,
            kinds,
            query,
        }) => commands::view::run(&path, json, kinds.as_deref(), query.as_deref()),
        Some(Commands::Tui { path, discovery }) => match path {
            Some(path) => tui::run_tui(&path),
            None => tui::run_latest(discovery.codex_home.as_deref(), &discovery.to_query()?),
        },
        Some(Commands::Validate { path }) => commands::validate::run(&path),
        None => match cli.path {
            // transcripts <path> → open directly in the viewer
            // transcripts        → open the most recent session
            Some(path) => tui::run_tui(&path),
            None => tui::run_latest(None, &SessionQuery::default()),
        },
    }
}
