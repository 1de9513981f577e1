//! Activity pipeline - one mention in, one reply chain out

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::errors::BotError;
use crate::model::{ActivityAction, ActivityResult, BotIdentity, Language, Post, ReplyResult};
use crate::ports::{
    DescribeProvider, LengthValidator, Localizer, MessageKey, OcrProvider, PostRepository,
};
use crate::usecases::command::parse_directive;
use crate::usecases::compose::{ComposedReply, apology_key, compose_reply};
use crate::usecases::merge::merge_responses;
use crate::usecases::resolve::MediaResolver;
use crate::usecases::responders::Responders;
use crate::usecases::scheduler::{JobHandler, panic_message};
use crate::usecases::split::split_message;

/// Everything a job talks to, passed explicitly
#[derive(Clone)]
pub struct Services {
    pub posts: Arc<dyn PostRepository>,
    pub ocr: Arc<dyn OcrProvider>,
    pub describer: Arc<dyn DescribeProvider>,
    pub localizer: Arc<dyn Localizer>,
    pub validator: Arc<dyn LengthValidator>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Language used when the mention does not ask for one
    pub default_language: Language,
}

/// Parses, resolves, describes and replies to a single mention
#[derive(Clone)]
pub struct ActivityPipeline {
    services: Services,
    config: PipelineConfig,
}

impl ActivityPipeline {
    pub fn new(services: Services, config: PipelineConfig) -> Self {
        Self { services, config }
    }

    /// Handle one mention. Never fails and never panics; the outcome is
    /// reported in the result.
    pub async fn handle(&self, bot: &BotIdentity, post: &Post) -> ActivityResult {
        match AssertUnwindSafe(self.process(bot, post)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&*panic);
                tracing::error!(post_id = %post.id, panic = %message, "Activity processing panicked");
                let error = BotError::Unknown(message);
                let replied = self
                    .apologize(&post.id, &error, &self.config.default_language)
                    .await;
                ActivityResult::new(post.id.clone(), ActivityAction::Panicked)
                    .with_error(error)
                    .with_replied(replied)
            }
        }
    }

    async fn process(&self, bot: &BotIdentity, post: &Post) -> ActivityResult {
        let command = match bot.find_mention(&post.text) {
            Some(end) => &post.text[end..],
            None => post.text.as_str(),
        };
        let directive = parse_directive(command, &self.config.default_language);
        let language = directive.language().clone();
        tracing::info!(post_id = %post.id, directive = %directive, "Handling mention");

        if directive.is_help() {
            let text = self
                .services
                .localizer
                .localize(MessageKey::Help, &language, &[]);
            let help = ComposedReply { text, error: None };
            return self.deliver(post, help, ActivityAction::Help, &language).await;
        }

        let resolved = match MediaResolver::new(self.services.posts.as_ref())
            .resolve(post.clone())
            .await
        {
            Ok(resolved) => resolved,
            Err(error) => {
                let action = match error {
                    BotError::WrongMediaType => ActivityAction::WrongMediaType,
                    _ => ActivityAction::NoPhotos,
                };
                tracing::info!(post_id = %post.id, error = %error, "No usable media");
                let replied = self.apologize(&post.id, &error, &language).await;
                return ActivityResult::new(post.id.clone(), action)
                    .with_error(error)
                    .with_replied(replied);
            }
        };

        let localizer = self.services.localizer.as_ref();
        let responders = Responders::new(
            self.services.ocr.as_ref(),
            self.services.describer.as_ref(),
            localizer,
        );
        let generated = responders.generate(&directive, &resolved.media).await;
        let merged = merge_responses(
            &directive,
            &generated.alt_text,
            &generated.ocr,
            &generated.describe,
            localizer,
        );

        let Some(composed) = compose_reply(&merged, &language, localizer) else {
            let error = BotError::NoPhotosFound;
            let replied = self.apologize(&post.id, &error, &language).await;
            return ActivityResult::new(post.id.clone(), ActivityAction::NoPhotos)
                .with_error(error)
                .with_replied(replied);
        };

        self.deliver(post, composed, ActivityAction::Replied, &language)
            .await
    }

    /// Split and post a reply; escalate to a short apology if that fails
    async fn deliver(
        &self,
        post: &Post,
        composed: ComposedReply,
        action: ActivityAction,
        language: &Language,
    ) -> ActivityResult {
        let chunks = match split_message(&composed.text, self.services.validator.as_ref()) {
            Ok(chunks) => chunks,
            Err(error) => {
                tracing::warn!(post_id = %post.id, error = %error, "Reply cannot be split");
                let replied = self.apologize(&post.id, &error, language).await;
                return ActivityResult::new(post.id.clone(), ActivityAction::ReplyFailed)
                    .with_error(error)
                    .with_replied(replied);
            }
        };

        let reply = self.post_chain(&post.id, chunks).await;
        if let Some(error) = reply.error {
            let anchor = reply
                .last_posted
                .as_ref()
                .map_or(post.id.as_str(), |last| last.id.as_str());
            let apologized = self.apologize(anchor, &error, language).await;
            return ActivityResult::new(post.id.clone(), ActivityAction::ReplyFailed)
                .with_error(error)
                .with_replied(reply.last_posted.is_some() || apologized);
        }

        let result = ActivityResult::new(post.id.clone(), action).with_replied(true);
        match composed.error {
            Some(error) => result.with_error(error),
            None => result,
        }
    }

    /// Post chunks as a thread: the first replies to `post_id`, each next one
    /// to the previous reply. Stops at the first failure.
    pub async fn post_chain(&self, post_id: &str, chunks: Vec<String>) -> ReplyResult {
        let mut result = ReplyResult::default();
        let mut target = post_id.to_string();
        let mut chunks = chunks.into_iter();

        while let Some(chunk) = chunks.next() {
            match self.services.posts.reply_to_post(&target, &chunk).await {
                Ok(posted) => {
                    tracing::debug!(in_reply_to = %target, reply_id = %posted.id, "Posted reply");
                    target = posted.id.clone();
                    result.last_posted = Some(posted);
                }
                Err(e) => {
                    tracing::warn!(in_reply_to = %target, error = %e, "Failed to post reply");
                    result.error = Some(e.into());
                    result.unsent = std::iter::once(chunk).chain(chunks).collect();
                    break;
                }
            }
        }

        result
    }

    /// Send the localized apology for `error`; send failures are only logged.
    /// Returns whether the apology went out.
    async fn apologize(&self, target_id: &str, error: &BotError, language: &Language) -> bool {
        if *error == BotError::UserBlockedBot {
            return false;
        }

        let text = self
            .services
            .localizer
            .localize(apology_key(error), language, &[]);
        match self.services.posts.reply_to_post(target_id, &text).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(in_reply_to = %target_id, error = %e, "Failed to send apology");
                false
            }
        }
    }
}

#[async_trait]
impl JobHandler for ActivityPipeline {
    async fn handle(&self, bot: &BotIdentity, post: &Post) -> ActivityResult {
        ActivityPipeline::handle(self, bot, post).await
    }
}
