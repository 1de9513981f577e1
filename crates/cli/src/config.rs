//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use alt_text_bot_domain::usecases::SchedulerConfig;
use alt_text_bot_domain::{BotIdentity, Language};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub activity: ActivityConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub x: XConfig,

    #[serde(default)]
    pub vision: VisionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reply language when a mention does not ask for one
    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default = "default_outbox_path")]
    pub outbox_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// 0 means the default
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// 0 means the default
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,

    /// 0 means the default
    #[serde(default = "default_enqueue_timeout_secs")]
    pub enqueue_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub id: String,

    #[serde(default = "default_bot_handle")]
    pub handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default = "default_x_base_url")]
    pub base_url: String,

    #[serde(default = "default_x_bearer_token_env")]
    pub bearer_token_env: String,

    #[serde(default = "default_x_user_token_env")]
    pub user_token_env: String,

    /// Weighted length limit of one reply
    #[serde(default = "default_x_max_chars")]
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionSettings {
    #[serde(default = "default_ocr_provider")]
    pub ocr_provider: String,

    #[serde(default = "default_describe_provider")]
    pub describe_provider: String,

    #[serde(default = "default_vision_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_candidates")]
    pub max_candidates: u32,

    #[serde(default)]
    pub google: GoogleVisionConfig,

    #[serde(default)]
    pub azure: AzureVisionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleVisionConfig {
    #[serde(default = "default_google_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_google_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureVisionConfig {
    #[serde(default = "default_azure_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub endpoint: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("./outbox.jsonl")
}

fn default_workers() -> usize {
    4
}

fn default_max_queue() -> usize {
    100
}

fn default_enqueue_timeout_secs() -> u64 {
    30
}

fn default_bot_handle() -> String {
    "alttextbot".to_string()
}

fn default_x_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_x_bearer_token_env() -> String {
    "X_BEARER_TOKEN".to_string()
}

fn default_x_user_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_x_max_chars() -> usize {
    280
}

fn default_ocr_provider() -> String {
    "google".to_string()
}

fn default_describe_provider() -> String {
    "azure".to_string()
}

fn default_vision_timeout() -> u64 {
    30
}

fn default_max_candidates() -> u32 {
    3
}

fn default_google_api_key_env() -> String {
    "GOOGLE_VISION_API_KEY".to_string()
}

fn default_google_endpoint() -> String {
    "https://vision.googleapis.com".to_string()
}

fn default_azure_api_key_env() -> String {
    "AZURE_VISION_KEY".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_language: default_language(),
            dry_run: default_true(),
            outbox_path: default_outbox_path(),
        }
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_queue: default_max_queue(),
            enqueue_timeout_secs: default_enqueue_timeout_secs(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            handle: default_bot_handle(),
        }
    }
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            base_url: default_x_base_url(),
            bearer_token_env: default_x_bearer_token_env(),
            user_token_env: default_x_user_token_env(),
            max_chars: default_x_max_chars(),
        }
    }
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            ocr_provider: default_ocr_provider(),
            describe_provider: default_describe_provider(),
            timeout_secs: default_vision_timeout(),
            max_candidates: default_max_candidates(),
            google: GoogleVisionConfig::default(),
            azure: AzureVisionConfig::default(),
        }
    }
}

impl Default for GoogleVisionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_google_api_key_env(),
            endpoint: default_google_endpoint(),
        }
    }
}

impl Default for AzureVisionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_azure_api_key_env(),
            endpoint: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Environment overrides, e.g. ALT_TEXT_BOT__ACTIVITY__WORKERS=8
        builder = builder.add_source(
            config::Environment::with_prefix("ALT_TEXT_BOT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn bot_identity(&self) -> BotIdentity {
        BotIdentity {
            id: self.bot.id.clone(),
            handle: self.bot.handle.trim_start_matches('@').to_string(),
        }
    }

    pub fn default_language(&self) -> Language {
        Language::new(&self.general.default_language)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.activity.workers,
            max_queue: self.activity.max_queue,
            enqueue_timeout: Duration::from_secs(self.activity.enqueue_timeout_secs),
        }
        .normalized()
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# alt-text-bot configuration

[general]
log_level = "info"
default_language = "en"
dry_run = true
outbox_path = "./outbox.jsonl"

[activity]
# 0 falls back to the default for each value
workers = 4
max_queue = 100
enqueue_timeout_secs = 30

[bot]
id = ""
handle = "alttextbot"

[x]
base_url = "https://api.twitter.com"
bearer_token_env = "X_BEARER_TOKEN"
user_token_env = "X_USER_TOKEN"
max_chars = 280

[vision]
ocr_provider = "google"       # google, stub
describe_provider = "azure"   # azure, stub
timeout_secs = 30
max_candidates = 3

[vision.google]
api_key_env = "GOOGLE_VISION_API_KEY"
endpoint = "https://vision.googleapis.com"

[vision.azure]
api_key_env = "AZURE_VISION_KEY"
endpoint = "https://your-resource.cognitiveservices.azure.com"
"#
        .to_string()
    }
}
