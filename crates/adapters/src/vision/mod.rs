//! Image recognition adapters (OCR and captioning)

pub mod azure;
pub mod google;
pub mod stub;

pub use azure::AzureDescriber;
pub use google::GoogleVisionOcr;
pub use stub::{StubDescriber, StubOcr};

use std::time::Duration;

use alt_text_bot_domain::BotError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Settings shared by the HTTP vision adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Captions requested per image
    pub max_candidates: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_candidates: 3,
        }
    }
}

fn http_client(config: &VisionConfig) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .expect("Failed to build HTTP client")
}

/// Timeouts and connection failures are transport problems, not provider answers
fn transport_error(error: reqwest::Error) -> BotError {
    if error.is_timeout() {
        BotError::Transport(format!("Request timed out: {}", error))
    } else {
        BotError::Transport(error.to_string())
    }
}
