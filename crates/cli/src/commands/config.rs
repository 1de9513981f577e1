//! Config command - write an example configuration

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

const NEXT_STEPS: &[&str] = &[
    "Set the bot's id and handle under [bot]",
    "Export the X and vision API keys named in the config",
    "Run 'alt-text-bot parse \"ocr in german\"' to check command parsing",
    "Run 'alt-text-bot run --dry-run --input notifications.jsonl' to test",
];

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(path, force).await,
    }
}

async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    tokio::fs::write(&path, AppConfig::example_toml())
        .await
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    for (step, text) in NEXT_STEPS.iter().enumerate() {
        println!("  {}. {}", step + 1, text);
    }

    Ok(())
}
