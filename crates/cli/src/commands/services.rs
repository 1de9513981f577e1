//! Wiring of adapters into the activity pipeline

use std::path::Path;
use std::sync::Arc;

use alt_text_bot_adapters::locale::StaticLocalizer;
use alt_text_bot_adapters::outbox::{OutboxPostRepository, OutboxWriter};
use alt_text_bot_adapters::vision::{
    AzureDescriber, GoogleVisionOcr, StubDescriber, StubOcr, VisionConfig,
};
use alt_text_bot_adapters::x::{StubPostRepository, XPostRepository};
use alt_text_bot_domain::policy::{PolicyConfig, TweetLengthPolicy};
use alt_text_bot_domain::usecases::{ActivityPipeline, PipelineConfig, Services};
use alt_text_bot_domain::{DescribeProvider, OcrProvider, PostRepository};
use anyhow::{Context, Result, bail};
use secrecy::SecretString;

use crate::config::AppConfig;

/// Build the pipeline; `outbox` set means dry-run and replies go to that file
pub(crate) async fn build_pipeline(
    config: &AppConfig,
    outbox: Option<&Path>,
) -> Result<ActivityPipeline> {
    let services = build_services(config, outbox).await?;
    Ok(ActivityPipeline::new(
        services,
        PipelineConfig {
            default_language: config.default_language(),
        },
    ))
}

pub(crate) async fn build_services(config: &AppConfig, outbox: Option<&Path>) -> Result<Services> {
    let localizer = StaticLocalizer::new();
    let default_language = config.default_language();
    if !localizer.supports(&default_language) {
        tracing::warn!(
            language = %default_language,
            "No reply strings for the default language, English will be used"
        );
    }

    let posts = build_post_repository(config, outbox.is_some())?;
    let posts: Arc<dyn PostRepository> = match outbox {
        Some(path) => {
            let writer = OutboxWriter::new(path.to_path_buf())
                .await
                .context("Failed to initialize outbox writer")?;
            tracing::info!(outbox = %path.display(), "Writing replies to outbox");
            Arc::new(OutboxPostRepository::new(posts, writer))
        }
        None => posts,
    };

    let validator = TweetLengthPolicy::new(PolicyConfig {
        max_weighted_length: config.x.max_chars,
        ..Default::default()
    });

    Ok(Services {
        posts,
        ocr: build_ocr(config)?,
        describer: build_describer(config)?,
        localizer: Arc::new(localizer),
        validator: Arc::new(validator),
    })
}

fn build_post_repository(config: &AppConfig, dry_run: bool) -> Result<Arc<dyn PostRepository>> {
    if dry_run && optional_api_key(&config.x.bearer_token_env).is_none() {
        tracing::warn!(
            env_var = %config.x.bearer_token_env,
            "No X bearer token, only posts carried by notifications are available"
        );
        return Ok(Arc::new(StubPostRepository::empty()));
    }

    let bearer_token = load_api_key(&config.x.bearer_token_env, "x_read")?;
    let user_token = if dry_run {
        optional_api_key(&config.x.user_token_env)
            .unwrap_or_else(|| SecretString::new(String::new().into()))
    } else {
        load_api_key(&config.x.user_token_env, "x_write")?
    };

    Ok(Arc::new(XPostRepository::with_base_url(
        bearer_token,
        user_token,
        config.x.base_url.clone(),
    )))
}

fn vision_config(config: &AppConfig) -> VisionConfig {
    VisionConfig {
        timeout_secs: config.vision.timeout_secs,
        max_candidates: config.vision.max_candidates,
    }
}

fn build_ocr(config: &AppConfig) -> Result<Arc<dyn OcrProvider>> {
    match config.vision.ocr_provider.trim() {
        "google" => {
            let api_key = load_api_key(&config.vision.google.api_key_env, "google_vision")?;
            Ok(Arc::new(GoogleVisionOcr::with_endpoint(
                api_key,
                config.vision.google.endpoint.clone(),
                &vision_config(config),
            )))
        }
        "stub" => Ok(Arc::new(StubOcr::empty())),
        other => bail!("Unknown OCR provider: {}", other),
    }
}

fn build_describer(config: &AppConfig) -> Result<Arc<dyn DescribeProvider>> {
    match config.vision.describe_provider.trim() {
        "azure" => {
            let endpoint = config.vision.azure.endpoint.trim();
            if endpoint.is_empty() {
                bail!("Azure describe provider requires vision.azure.endpoint");
            }
            let api_key = load_api_key(&config.vision.azure.api_key_env, "azure_vision")?;
            Ok(Arc::new(AzureDescriber::new(
                api_key,
                endpoint.to_string(),
                &vision_config(config),
            )))
        }
        "stub" => Ok(Arc::new(StubDescriber::empty())),
        other => bail!("Unknown describe provider: {}", other),
    }
}

fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("Missing API key env var name for {}", provider);
    }

    let key = std::env::var(env_var)
        .with_context(|| format!("Missing API key for {} (set {})", provider, env_var))?;

    if key.trim().is_empty() {
        bail!("API key for {} is empty (set {})", provider, env_var);
    }

    Ok(SecretString::new(key.into()))
}

fn optional_api_key(env_var: &str) -> Option<SecretString> {
    std::env::var(env_var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(|key| SecretString::new(key.into()))
}
