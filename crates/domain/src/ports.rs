//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::BotError;
use crate::model::{Caption, Language, OcrText, Post};

/// Error type for social platform operations
#[derive(Debug, Error)]
pub enum PostError {
    #[error("Post not found: {0}")]
    NotFound(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<std::time::Duration>),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Network error: {0}")]
    Network(String),
}

impl From<PostError> for BotError {
    fn from(error: PostError) -> Self {
        match error {
            PostError::Forbidden(_) => BotError::UserBlockedBot,
            PostError::Network(msg) => BotError::Transport(msg),
            other => BotError::Provider(other.to_string()),
        }
    }
}

/// Port for reading and replying to posts on the social platform
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Fetch a post with its media fully expanded
    async fn get_post(&self, id: &str) -> Result<Post, PostError>;

    /// Reply to a post, returning the created post
    async fn reply_to_post(&self, id: &str, text: &str) -> Result<Post, PostError>;
}

/// Port for optical character recognition
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn recognize(&self, image_url: &str) -> Result<OcrText, BotError>;
}

/// Port for image captioning; captions come back in provider rank order
#[async_trait]
pub trait DescribeProvider: Send + Sync {
    async fn describe(&self, image_url: &str, language: &Language)
    -> Result<Vec<Caption>, BotError>;
}

/// Keys into the localized string table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Usage text for the help directive
    Help,
    /// `{first}. It might also be {next}`
    MightAlsoBe,
    /// `{first}. It contains the text: {text}`
    ContainsText,
    /// `{first}. I think it's {description}`
    ThinkItIs,
    /// `Image {index}: {text}`
    ImageLabel,
    MissingAltText,
    NoPhotosFound,
    WrongMediaType,
    OcrFailed,
    DescribeFailed,
    NoHighConfidence,
    UnsupportedLanguage,
    GenericError,
}

/// Port for the localized string table
pub trait Localizer: Send + Sync {
    /// Render `key` in `language`, substituting `{name}` placeholders from `args`
    fn localize(&self, key: MessageKey, language: &Language, args: &[(&str, &str)]) -> String;
}

/// Substitute `{name}` placeholders in one pass over `template`.
///
/// Values are copied verbatim and never rescanned, so user text containing
/// braces survives. Unknown placeholders are left as they are.
pub fn fill_template(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            args.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Error from the platform length validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Text contains invalid characters")]
    InvalidCharacters,
}

/// Port for the platform's per-message length rule
pub trait LengthValidator: Send + Sync {
    /// `Ok(true)` if `text` can be posted as a single message
    fn validate(&self, text: &str) -> Result<bool, ValidationError>;
}
