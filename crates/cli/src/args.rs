//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// alt-text-bot: answers mentions with alt text, OCR and image descriptions
#[derive(Parser, Debug)]
#[command(name = "alt-text-bot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process activity notifications (JSON lines) and reply to mentions
    Run(RunArgs),

    /// Handle a single mention by post ID
    Reply(ReplyArgs),

    /// Show how a mention's command text is understood
    Parse(ParseArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Read notifications from this file instead of stdin
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Write replies to the outbox instead of posting them
    #[arg(long)]
    pub dry_run: bool,

    /// Path to outbox file (used in dry-run mode)
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// ID of the post that mentions the bot
    #[arg(long)]
    pub post_id: String,

    /// Write replies to the outbox instead of posting them
    #[arg(long)]
    pub dry_run: bool,

    /// Path to outbox file (used in dry-run mode)
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Command text, e.g. "ocr in german"
    pub text: String,

    /// Language used when the text does not ask for one
    #[arg(long)]
    pub language: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
