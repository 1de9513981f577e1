//! Reply composition - merged per-media responses into one reply text

use crate::errors::BotError;
use crate::model::{Language, MediaResponse};
use crate::ports::{Localizer, MessageKey};

/// Reply text plus the first per-item error, kept for telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedReply {
    pub text: String,
    pub error: Option<BotError>,
}

/// Build the reply for a post's merged responses.
///
/// Returns `None` when every item was do-nothing.
pub fn compose_reply(
    responses: &[MediaResponse],
    language: &Language,
    localizer: &dyn Localizer,
) -> Option<ComposedReply> {
    let items: Vec<&MediaResponse> = responses.iter().filter(|r| !r.is_do_nothing()).collect();
    let error = items.iter().find_map(|r| r.error.clone());

    let text = match items.as_slice() {
        [] => return None,
        [single] => line(single, language, localizer),
        many => many
            .iter()
            .map(|item| {
                let index = (item.index + 1).to_string();
                let text = line(item, language, localizer);
                localizer.localize(
                    MessageKey::ImageLabel,
                    language,
                    &[("index", &index), ("text", &text)],
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };

    Some(ComposedReply { text, error })
}

/// The apology shown for a failure
pub fn apology_key(error: &BotError) -> MessageKey {
    match error {
        BotError::NoPhotosFound => MessageKey::NoPhotosFound,
        BotError::WrongMediaType => MessageKey::WrongMediaType,
        BotError::Ocr(_) => MessageKey::OcrFailed,
        BotError::Describe(_) => MessageKey::DescribeFailed,
        BotError::NoHighConfidenceResults => MessageKey::NoHighConfidence,
        BotError::UnsupportedLanguage(_) => MessageKey::UnsupportedLanguage,
        _ => MessageKey::GenericError,
    }
}

fn line(response: &MediaResponse, language: &Language, localizer: &dyn Localizer) -> String {
    match (&response.error, &response.reply) {
        (Some(error), _) => localizer.localize(apology_key(error), language, &[]),
        (None, Some(reply)) => reply.clone(),
        (None, None) => localizer.localize(MessageKey::GenericError, language, &[]),
    }
}
