//! Reply command - handle one mention fetched by ID

use alt_text_bot_domain::usecases::{ActivityPipeline, PipelineConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::args::ReplyArgs;
use crate::commands::run::result_json;
use crate::commands::services::build_services;
use crate::config::AppConfig;

pub async fn execute(args: ReplyArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let dry_run = args.dry_run || config.general.dry_run;
    let outbox = args
        .outbox
        .clone()
        .unwrap_or_else(|| config.general.outbox_path.clone());

    let services = build_services(&config, dry_run.then_some(outbox.as_path())).await?;
    let post = services
        .posts
        .get_post(&args.post_id)
        .await
        .with_context(|| format!("Failed to fetch post {}", args.post_id))?;

    let bot = config.bot_identity();
    if !post.mentions_bot(&bot) {
        tracing::warn!(post_id = %post.id, bot = %bot.handle, "Post does not mention the bot");
    }

    let pipeline = ActivityPipeline::new(
        services,
        PipelineConfig {
            default_language: config.default_language(),
        },
    );
    let result = pipeline.handle(&bot, &post).await;

    println!("{}", serde_json::to_string_pretty(&result_json(&result))?);
    Ok(())
}
