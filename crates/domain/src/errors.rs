//! Classified error taxonomy shared by every pipeline stage
//!
//! Each variant doubles as a telemetry label (`kind`) and selects the
//! apology a user sees when the failure surfaces in a reply.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BotError {
    #[error("No photos found")]
    NoPhotosFound,
    #[error("Media is not a photo")]
    WrongMediaType,
    #[error("OCR failed: {0}")]
    Ocr(String),
    #[error("Description failed: {0}")]
    Describe(String),
    #[error("No high-confidence results")]
    NoHighConfidenceResults,
    #[error("Translation failed: {0}")]
    Translate(String),
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Cannot split message: {0}")]
    CannotSplitMessage(String),
    #[error("User blocked the bot")]
    UserBlockedBot,
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Timed out waiting for a free queue slot")]
    Timeout,
    #[error("Activity queue is shut down")]
    Cancelled,
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl BotError {
    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::NoPhotosFound => "no_photos_found",
            BotError::WrongMediaType => "wrong_media_type",
            BotError::Ocr(_) => "ocr_error",
            BotError::Describe(_) => "describe_error",
            BotError::NoHighConfidenceResults => "no_high_confidence_results",
            BotError::Translate(_) => "translate_error",
            BotError::UnsupportedLanguage(_) => "unsupported_language",
            BotError::CannotSplitMessage(_) => "cannot_split_message",
            BotError::UserBlockedBot => "user_blocked_bot",
            BotError::Provider(_) => "provider_error",
            BotError::Transport(_) => "transport_error",
            BotError::Timeout => "timeout",
            BotError::Cancelled => "cancelled",
            BotError::Unknown(_) => "unknown",
        }
    }
}
