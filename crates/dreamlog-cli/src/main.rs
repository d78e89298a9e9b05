//! dreamlog CLI
//!
//! Command-line interface for dreamlog - a local-first dream journal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;

use dreamlog_core::{Config, GoalStatus, GoalType, Journal};

mod commands;
mod editor;
mod logging;
mod output;

use commands::dream::{DreamEdits, NewDream};
use commands::voice::NewVoiceNote;
use commands::ListArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "dreamlog")]
#[command(about = "dreamlog - Local-first dream journal")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and browse dreams
    Dream {
        #[command(subcommand)]
        command: DreamCommands,
    },
    /// Manage journaling goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Manage voice note metadata
    Voice {
        #[command(subcommand)]
        command: VoiceCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show storage status and record counts
    Status,
}

#[derive(Subcommand)]
enum DreamCommands {
    /// Record a new dream
    #[command(alias = "create")]
    Add {
        /// Dream content (opens editor if not provided)
        content: Option<String>,
        /// Dream title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
        /// Emotions felt during the dream
        #[arg(short, long)]
        emotion: Vec<String>,
        /// Mark the dream as lucid
        #[arg(long)]
        lucid: bool,
        /// Night of the dream (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// List dreams
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show a dream
    Show {
        /// Dream ID (full UUID or prefix)
        id: String,
    },
    /// Edit a dream (interactive when no flags are given)
    Edit {
        /// Dream ID (full UUID or prefix)
        id: String,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
        /// Replace all tags
        #[arg(short, long)]
        tag: Option<Vec<String>>,
        #[arg(long)]
        lucid: Option<bool>,
    },
    /// Delete a dream
    #[command(alias = "rm")]
    Delete {
        /// Dream ID (full UUID or prefix)
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Create a goal
    #[command(alias = "create")]
    Add {
        title: String,
        /// lucid-count, recall-streak, journaling-streak or custom
        #[arg(long = "type", default_value = "custom")]
        goal_type: GoalType,
        #[arg(long, default_value_t = 1)]
        target: u32,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List goals
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show a goal
    Show {
        /// Goal ID (full UUID or prefix)
        id: String,
    },
    /// Mark a goal completed
    Complete { id: String },
    /// Archive a goal
    Archive { id: String },
    /// Make a goal active again
    Reopen { id: String },
    /// Delete a goal
    #[command(alias = "rm")]
    Delete {
        /// Goal ID (full UUID or prefix)
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum VoiceCommands {
    /// Record a voice note's metadata
    #[command(alias = "create")]
    Add {
        /// Recording length in seconds
        #[arg(long)]
        duration: f64,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(long)]
        transcription: Option<String>,
        /// Audio size in bytes
        #[arg(long, default_value_t = 0)]
        size: u64,
        /// Audio MIME type (default audio/webm)
        #[arg(long)]
        mime: Option<String>,
    },
    /// List voice notes
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show a voice note
    Show {
        /// Voice note ID (full UUID or prefix)
        id: String,
    },
    /// Set or clear a voice note's transcription
    Transcribe {
        /// Voice note ID (full UUID or prefix)
        id: String,
        text: String,
    },
    /// Delete a voice note
    #[command(alias = "rm")]
    Delete {
        /// Voice note ID (full UUID or prefix)
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, items_per_page, endless_increment,
        /// delete_timeout_secs, search_debounce_ms, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work on the file alone
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    logging::init(&config);
    debug!(data_dir = ?config.data_dir, "starting");

    let journal = Journal::open(config).await;

    match cli.command {
        Commands::Dream { command } => handle_dream_command(&journal, command, &output).await,
        Commands::Goal { command } => handle_goal_command(&journal, command, &output).await,
        Commands::Voice { command } => handle_voice_command(&journal, command, &output).await,
        Commands::Status => commands::status::show(&journal, &output).await,
        Commands::Config { .. } => Ok(()),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

async fn handle_dream_command(journal: &Journal, command: DreamCommands, output: &Output) -> Result<()> {
    match command {
        DreamCommands::Add {
            content,
            title,
            tag,
            emotion,
            lucid,
            date,
        } => {
            let new = NewDream {
                content,
                title,
                tags: tag,
                emotions: emotion,
                lucid,
                date,
            };
            commands::dream::add(journal, new, output).await
        }
        DreamCommands::List(args) => commands::dream::list(journal, args, output).await,
        DreamCommands::Show { id } => commands::dream::show(journal, id, output).await,
        DreamCommands::Edit {
            id,
            title,
            content,
            tag,
            lucid,
        } => {
            let edits = DreamEdits {
                title,
                content,
                tags: tag,
                lucid,
            };
            commands::dream::edit(journal, id, edits, output).await
        }
        DreamCommands::Delete { id, yes } => commands::dream::delete(journal, id, yes, output).await,
    }
}

async fn handle_goal_command(journal: &Journal, command: GoalCommands, output: &Output) -> Result<()> {
    match command {
        GoalCommands::Add {
            title,
            goal_type,
            target,
            description,
        } => commands::goal::add(journal, title, goal_type, target, description, output).await,
        GoalCommands::List(args) => commands::goal::list(journal, args, output).await,
        GoalCommands::Show { id } => commands::goal::show(journal, id, output).await,
        GoalCommands::Complete { id } => {
            commands::goal::set_status(journal, id, GoalStatus::Completed, output).await
        }
        GoalCommands::Archive { id } => {
            commands::goal::set_status(journal, id, GoalStatus::Archived, output).await
        }
        GoalCommands::Reopen { id } => {
            commands::goal::set_status(journal, id, GoalStatus::Active, output).await
        }
        GoalCommands::Delete { id, yes } => commands::goal::delete(journal, id, yes, output).await,
    }
}

async fn handle_voice_command(journal: &Journal, command: VoiceCommands, output: &Output) -> Result<()> {
    match command {
        VoiceCommands::Add {
            duration,
            title,
            transcription,
            size,
            mime,
        } => {
            let new = NewVoiceNote {
                duration,
                title,
                transcription,
                size,
                mime,
            };
            commands::voice::add(journal, new, output).await
        }
        VoiceCommands::List(args) => commands::voice::list(journal, args, output).await,
        VoiceCommands::Show { id } => commands::voice::show(journal, id, output).await,
        VoiceCommands::Transcribe { id, text } => {
            commands::voice::transcribe(journal, id, text, output).await
        }
        VoiceCommands::Delete { id, yes } => commands::voice::delete(journal, id, yes, output).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use dreamlog_core::PaginationMode;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_limit() {
        let cli = Cli::try_parse_from(["dreamlog", "dream", "list", "--limit", "endless", "--page", "3"])
            .unwrap();
        match cli.command {
            Commands::Dream {
                command: DreamCommands::List(args),
            } => {
                assert_eq!(args.limit, Some(PaginationMode::Endless));
                assert_eq!(args.page, 3);
            }
            _ => panic!("expected dream list"),
        }

        assert!(Cli::try_parse_from(["dreamlog", "dream", "list", "--limit", "0"]).is_err());
    }

    #[test]
    fn test_parse_goal_type() {
        let cli = Cli::try_parse_from(["dreamlog", "goal", "add", "Fly", "--type", "lucid-count", "--target", "3"])
            .unwrap();
        match cli.command {
            Commands::Goal {
                command: GoalCommands::Add {
                    goal_type, target, ..
                },
            } => {
                assert_eq!(goal_type, GoalType::LucidCount);
                assert_eq!(target, 3);
            }
            _ => panic!("expected goal add"),
        }
    }
}
