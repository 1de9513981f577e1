//! Domain models and value objects

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::errors::BotError;

/// Author of a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Platform user ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Handle without the leading `@`
    #[serde(default)]
    pub handle: String,
}

/// A user referenced by `@handle` inside a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    #[serde(default)]
    pub id: Option<String>,
    pub handle: String,
}

/// How a post relates to the post it references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    #[default]
    Simple,
    Quote,
    Repost,
}

/// Media type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    AnimatedImage,
    Other,
}

/// A media item attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    #[serde(default)]
    pub url: String,
    /// Author-supplied alt text
    #[serde(default)]
    pub alt_text: Option<String>,
}

impl Media {
    pub fn photo(url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Photo,
            url: url.into(),
            alt_text: None,
        }
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }

    pub fn is_photo(&self) -> bool {
        self.kind == MediaKind::Photo
    }
}

/// A single message on the social platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Platform-specific post ID
    pub id: String,
    /// Post text content
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: Author,
    /// ID of the post being replied to, if any
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Quoted post, when the platform embedded it
    #[serde(default)]
    pub quoted: Option<Box<Post>>,
    /// ID of the quoted post, when only the reference is known
    #[serde(default)]
    pub quoted_id: Option<String>,
    #[serde(default)]
    pub kind: PostKind,
    /// Media in platform order
    #[serde(default)]
    pub media: Vec<Media>,
    /// Media known without an extended fetch; may be incomplete
    #[serde(default)]
    pub fallback_media: Vec<Media>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
}

impl Post {
    pub fn has_photos(&self) -> bool {
        self.media.iter().any(Media::is_photo)
    }

    /// Whether this post mentions the given bot, by ID or by `@handle` in the text
    pub fn mentions_bot(&self, bot: &BotIdentity) -> bool {
        let by_entity = self.mentions.iter().any(|m| {
            m.id.as_deref() == Some(bot.id.as_str()) || m.handle.eq_ignore_ascii_case(&bot.handle)
        });
        by_entity || bot.find_mention(&self.text).is_some()
    }
}

/// Identity of the bot account processing activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    /// Handle without the leading `@`
    pub handle: String,
}

impl BotIdentity {
    /// Byte offset just past the first `@handle` in `text`, matched case-insensitively
    pub fn find_mention(&self, text: &str) -> Option<usize> {
        if self.handle.is_empty() {
            return None;
        }
        let needle = format!("@{}", self.handle);
        text.match_indices('@').find_map(|(start, _)| {
            let end = start + needle.len();
            let candidate = text.get(start..end)?;
            let boundary = text[end..]
                .chars()
                .next()
                .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
            (boundary && candidate.eq_ignore_ascii_case(&needle)).then_some(end)
        })
    }
}

/// A normalized language tag such as `en` or `pt-br`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_lowercase().replace('_', "-"))
    }

    pub fn english() -> Self {
        Self("en".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary subtag, e.g. `pt` for `pt-br`
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single action a user can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Auto,
    Help,
    AltText,
    Ocr,
    Describe,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Auto => "auto",
            DirectiveKind::Help => "help",
            DirectiveKind::AltText => "alt_text",
            DirectiveKind::Ocr => "ocr",
            DirectiveKind::Describe => "describe",
        }
    }
}

/// Parsed user intent plus target language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    kinds: BTreeSet<DirectiveKind>,
    language: Language,
}

impl Directive {
    /// Build a directive, collapsing the requested set the way the parser does:
    /// help wins over everything, auto wins over explicit actions, empty means auto.
    pub fn new(kinds: impl IntoIterator<Item = DirectiveKind>, language: Language) -> Self {
        let kinds: BTreeSet<_> = kinds.into_iter().collect();
        let kinds = if kinds.contains(&DirectiveKind::Help) {
            BTreeSet::from([DirectiveKind::Help])
        } else if kinds.is_empty() || kinds.contains(&DirectiveKind::Auto) {
            BTreeSet::from([DirectiveKind::Auto])
        } else {
            kinds
        };
        Self { kinds, language }
    }

    pub fn auto(language: Language) -> Self {
        Self::new([DirectiveKind::Auto], language)
    }

    pub fn help(language: Language) -> Self {
        Self::new([DirectiveKind::Help], language)
    }

    pub fn is_auto(&self) -> bool {
        self.kinds.contains(&DirectiveKind::Auto)
    }

    pub fn is_help(&self) -> bool {
        self.kinds.contains(&DirectiveKind::Help)
    }

    /// Whether the given capability should run for this directive
    pub fn wants(&self, kind: DirectiveKind) -> bool {
        self.is_auto() || self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = DirectiveKind> + '_ {
        self.kinds.iter().copied()
    }

    pub fn language(&self) -> &Language {
        &self.language
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.kinds.iter().map(DirectiveKind::as_str).collect();
        write!(f, "{} ({})", kinds.join("+"), self.language)
    }
}

/// What a per-media response carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    DoNothing,
    FoundAltText,
    MissingAltText,
    FoundOcr,
    FoundDescription,
    Merged,
}

/// Result for one media item from one capability (or from the merge)
#[derive(Debug, Clone, PartialEq)]
pub struct MediaResponse {
    /// Position in the resolved post's media list
    pub index: usize,
    pub kind: ResponseKind,
    /// Localized reply fragment
    pub reply: Option<String>,
    pub error: Option<BotError>,
}

impl MediaResponse {
    pub fn do_nothing(index: usize) -> Self {
        Self {
            index,
            kind: ResponseKind::DoNothing,
            reply: None,
            error: None,
        }
    }

    pub fn found(index: usize, kind: ResponseKind, reply: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            reply: Some(reply.into()),
            error: None,
        }
    }

    pub fn failed(index: usize, kind: ResponseKind, error: BotError) -> Self {
        Self {
            index,
            kind,
            reply: None,
            error: Some(error),
        }
    }

    pub fn is_do_nothing(&self) -> bool {
        self.kind == ResponseKind::DoNothing
    }

    /// The recognized content, if this response found any
    pub fn succeeded(&self) -> Option<&str> {
        match (&self.reply, &self.error, self.kind) {
            (_, _, ResponseKind::DoNothing | ResponseKind::MissingAltText) => None,
            (Some(reply), None, _) => Some(reply.as_str()),
            _ => None,
        }
    }
}

/// A caption returned by a description capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    /// Confidence score 0.0-1.0
    pub confidence: f64,
}

/// Text recognized by an OCR capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrText {
    pub text: String,
    pub language: Option<String>,
}

/// A batch of newly created posts delivered by the host transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityNotification {
    pub bot: BotIdentity,
    #[serde(default)]
    pub posts: Vec<Post>,
    /// The sender has blocked the bot; the whole batch is ignored
    #[serde(default)]
    pub sender_blocked: bool,
}

/// A unit of queued work; consumed exactly once by a worker
#[derive(Debug)]
pub struct ActivityJob {
    pub id: Uuid,
    pub bot: BotIdentity,
    pub post: Post,
    pub(crate) result_tx: oneshot::Sender<ActivityResult>,
}

impl ActivityJob {
    pub fn new(bot: BotIdentity, post: Post) -> (Self, oneshot::Receiver<ActivityResult>) {
        let (result_tx, result_rx) = oneshot::channel();
        let job = Self {
            id: Uuid::new_v4(),
            bot,
            post,
            result_tx,
        };
        (job, result_rx)
    }

    /// Report the job's only result; a dropped receiver is not an error
    pub(crate) fn finish(self, result: ActivityResult) {
        let _ = self.result_tx.send(result);
    }
}

/// Observability label for what happened to an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityAction {
    Help,
    Replied,
    NoPhotos,
    WrongMediaType,
    ReplyFailed,
    Timeout,
    Cancelled,
    Panicked,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Help => "help",
            ActivityAction::Replied => "replied",
            ActivityAction::NoPhotos => "no-photos",
            ActivityAction::WrongMediaType => "wrong-media-type",
            ActivityAction::ReplyFailed => "reply-failed",
            ActivityAction::Timeout => "timeout",
            ActivityAction::Cancelled => "cancelled",
            ActivityAction::Panicked => "panicked",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one activity job, produced exactly once
///
/// `replied` describes what the user saw; `error` is for telemetry. A job can
/// reply successfully (for example with an apology) and still carry an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityResult {
    pub post_id: String,
    pub action: ActivityAction,
    pub error: Option<BotError>,
    pub replied: bool,
}

impl ActivityResult {
    pub fn new(post_id: impl Into<String>, action: ActivityAction) -> Self {
        Self {
            post_id: post_id.into(),
            action,
            error: None,
            replied: false,
        }
    }

    pub fn with_error(mut self, error: BotError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_replied(mut self, replied: bool) -> Self {
        self.replied = replied;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of posting a reply chain
#[derive(Debug, Clone, Default)]
pub struct ReplyResult {
    /// Last link of the chain that was posted
    pub last_posted: Option<Post>,
    /// Chunks that were never posted
    pub unsent: Vec<String>,
    pub error: Option<BotError>,
}
