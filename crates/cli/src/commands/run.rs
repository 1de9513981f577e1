//! Run command - read activity notifications and reply to mentions

use alt_text_bot_domain::usecases::ActivityScheduler;
use alt_text_bot_domain::{ActivityNotification, ActivityResult};
use anyhow::{Context, Result};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::args::RunArgs;
use crate::commands::services::build_pipeline;
use crate::config::AppConfig;

#[derive(Debug, Default)]
struct RunSummary {
    processed: usize,
    replied: usize,
    failed: usize,
}

impl RunSummary {
    fn record(&mut self, result: &ActivityResult) {
        self.processed += 1;
        if result.replied {
            self.replied += 1;
        }
        if result.is_error() {
            self.failed += 1;
        }
    }
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let dry_run = args.dry_run || config.general.dry_run;
    let outbox = args
        .outbox
        .clone()
        .unwrap_or_else(|| config.general.outbox_path.clone());
    if args.outbox.is_some() && !dry_run {
        tracing::warn!("--outbox is ignored without dry-run");
    }

    let scheduler_config = config.scheduler_config();
    tracing::info!(
        dry_run = dry_run,
        workers = scheduler_config.workers,
        max_queue = scheduler_config.max_queue,
        bot = %config.bot.handle,
        "Starting alt-text-bot run"
    );

    let pipeline = build_pipeline(&config, dry_run.then_some(outbox.as_path())).await?;
    let cancel = CancellationToken::new();
    let scheduler = ActivityScheduler::start(Arc::new(pipeline), scheduler_config, cancel);

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input: {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = input.lines();

    let mut pending = FuturesUnordered::new();
    let mut summary = RunSummary::default();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read notifications")? else {
                    tracing::info!("Input exhausted");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ActivityNotification>(&line) {
                    Ok(notification) => pending.extend(scheduler.submit_notification(notification)),
                    Err(e) => tracing::warn!(error = %e, "Skipping malformed notification"),
                }
            }
            Some(outcome) = pending.next(), if !pending.is_empty() => {
                report(outcome, &mut summary)?;
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                scheduler.shutdown();
                break;
            }
        }
    }

    while let Some(outcome) = pending.next().await {
        report(outcome, &mut summary)?;
    }
    scheduler.join().await;

    tracing::info!(
        processed = summary.processed,
        replied = summary.replied,
        failed = summary.failed,
        "alt-text-bot run completed"
    );
    Ok(())
}

fn report(
    outcome: Result<ActivityResult, tokio::sync::oneshot::error::RecvError>,
    summary: &mut RunSummary,
) -> Result<()> {
    let Ok(result) = outcome else {
        tracing::error!("Activity job ended without a result");
        return Ok(());
    };

    match &result.error {
        Some(error) => tracing::warn!(
            post_id = %result.post_id,
            action = %result.action,
            replied = result.replied,
            error = %error,
            "Activity finished with error"
        ),
        None => tracing::info!(
            post_id = %result.post_id,
            action = %result.action,
            replied = result.replied,
            "Activity finished"
        ),
    }

    summary.record(&result);
    println!("{}", serde_json::to_string(&result_json(&result))?);
    Ok(())
}

pub(crate) fn result_json(result: &ActivityResult) -> serde_json::Value {
    serde_json::json!({
        "post_id": result.post_id,
        "action": result.action.as_str(),
        "replied": result.replied,
        "error": result.error.as_ref().map(|e| e.kind()),
        "message": result.error.as_ref().map(|e| e.to_string()),
    })
}
