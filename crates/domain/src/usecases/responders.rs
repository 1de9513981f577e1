//! Per-media response generation: alt text, OCR and description
//!
//! Each responder runs one request per media item concurrently, waits for all
//! of them, and hands back responses sorted by media index.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::errors::BotError;
use crate::model::{Caption, Directive, DirectiveKind, Language, Media, MediaResponse, ResponseKind};
use crate::ports::{DescribeProvider, Localizer, MessageKey, OcrProvider};

/// Captions below this confidence are dropped
pub const MIN_CAPTION_CONFIDENCE: f64 = 0.25;

/// At most this many captions are joined into a description
pub const MAX_CAPTIONS: usize = 3;

/// Responses of all three responders for one media list
#[derive(Debug, Clone)]
pub struct GeneratedResponses {
    pub alt_text: Vec<MediaResponse>,
    pub ocr: Vec<MediaResponse>,
    pub describe: Vec<MediaResponse>,
}

/// Runs the capabilities a directive asks for
pub struct Responders<'a> {
    ocr: &'a dyn OcrProvider,
    describer: &'a dyn DescribeProvider,
    localizer: &'a dyn Localizer,
}

impl<'a> Responders<'a> {
    pub fn new(
        ocr: &'a dyn OcrProvider,
        describer: &'a dyn DescribeProvider,
        localizer: &'a dyn Localizer,
    ) -> Self {
        Self {
            ocr,
            describer,
            localizer,
        }
    }

    /// Run every responder the directive needs; the rest answer do-nothing.
    /// OCR and description requests run concurrently.
    pub async fn generate(&self, directive: &Directive, media: &[Media]) -> GeneratedResponses {
        let language = directive.language();

        let alt_text = if directive.wants(DirectiveKind::AltText) {
            self.read_alt_text(media, language)
        } else {
            not_requested(media)
        };

        let ocr = async {
            if directive.wants(DirectiveKind::Ocr) {
                self.recognize_text(media).await
            } else {
                not_requested(media)
            }
        };

        let describe = async {
            if directive.wants(DirectiveKind::Describe) {
                self.describe(media, language).await
            } else {
                not_requested(media)
            }
        };

        let (ocr, describe) = tokio::join!(ocr, describe);

        GeneratedResponses {
            alt_text,
            ocr,
            describe,
        }
    }

    /// Author-supplied alt text; purely local
    pub fn read_alt_text(&self, media: &[Media], language: &Language) -> Vec<MediaResponse> {
        media
            .iter()
            .enumerate()
            .map(|(index, item)| {
                if !item.is_photo() {
                    return not_a_photo(index);
                }
                match item.alt_text.as_deref().map(str::trim) {
                    Some(alt) if !alt.is_empty() => {
                        MediaResponse::found(index, ResponseKind::FoundAltText, alt)
                    }
                    _ => MediaResponse::found(
                        index,
                        ResponseKind::MissingAltText,
                        self.localizer
                            .localize(MessageKey::MissingAltText, language, &[]),
                    ),
                }
            })
            .collect()
    }

    pub async fn recognize_text(&self, media: &[Media]) -> Vec<MediaResponse> {
        fan_out(media, |index, item| async move {
            if !item.is_photo() {
                return not_a_photo(index);
            }
            if !has_url(item) {
                tracing::debug!(index, "Skipping OCR for media without a URL");
                return MediaResponse::do_nothing(index);
            }
            match self.ocr.recognize(&item.url).await {
                Ok(ocr) => {
                    let text = ocr.text.trim();
                    if text.is_empty() {
                        MediaResponse::failed(
                            index,
                            ResponseKind::FoundOcr,
                            BotError::Ocr("no text detected".to_string()),
                        )
                    } else {
                        MediaResponse::found(index, ResponseKind::FoundOcr, text)
                    }
                }
                Err(error) => {
                    tracing::warn!(index, url = %item.url, error = %error, "OCR failed");
                    MediaResponse::failed(index, ResponseKind::FoundOcr, as_ocr_error(error))
                }
            }
        })
        .await
    }

    pub async fn describe(&self, media: &[Media], language: &Language) -> Vec<MediaResponse> {
        fan_out(media, |index, item| async move {
            if !item.is_photo() {
                return not_a_photo(index);
            }
            if !has_url(item) {
                tracing::debug!(index, "Skipping description for media without a URL");
                return MediaResponse::do_nothing(index);
            }
            match self.describer.describe(&item.url, language).await {
                Ok(captions) => match self.join_captions(&captions, language) {
                    Some(description) => {
                        MediaResponse::found(index, ResponseKind::FoundDescription, description)
                    }
                    None => {
                        tracing::info!(index, captions = captions.len(), "No confident caption");
                        MediaResponse::failed(
                            index,
                            ResponseKind::FoundDescription,
                            BotError::NoHighConfidenceResults,
                        )
                    }
                },
                Err(error) => {
                    tracing::warn!(index, url = %item.url, error = %error, "Description failed");
                    MediaResponse::failed(
                        index,
                        ResponseKind::FoundDescription,
                        as_describe_error(error),
                    )
                }
            }
        })
        .await
    }

    /// `"<first>. It might also be <next>"` over the confident captions
    fn join_captions(&self, captions: &[Caption], language: &Language) -> Option<String> {
        let mut confident = confident_captions(captions).into_iter();
        let first = confident.next()?.to_string();
        Some(confident.fold(first, |text, next| {
            self.localizer.localize(
                MessageKey::MightAlsoBe,
                language,
                &[("first", &text), ("next", next)],
            )
        }))
    }
}

/// Captions in rank order, stopping at the first one below the cutoff
pub fn confident_captions(captions: &[Caption]) -> Vec<&str> {
    captions
        .iter()
        .take_while(|caption| caption.confidence >= MIN_CAPTION_CONFIDENCE)
        .map(|caption| caption.text.trim())
        .filter(|text| !text.is_empty())
        .take(MAX_CAPTIONS)
        .collect()
}

fn not_a_photo(index: usize) -> MediaResponse {
    MediaResponse {
        error: Some(BotError::WrongMediaType),
        ..MediaResponse::do_nothing(index)
    }
}

fn has_url(item: &Media) -> bool {
    !item.url.trim().is_empty()
}

/// Any other provider failure is reported as an OCR failure
fn as_ocr_error(error: BotError) -> BotError {
    match error {
        BotError::Ocr(_) | BotError::Cancelled => error,
        other => BotError::Ocr(other.to_string()),
    }
}

fn as_describe_error(error: BotError) -> BotError {
    match error {
        BotError::Describe(_)
        | BotError::NoHighConfidenceResults
        | BotError::UnsupportedLanguage(_)
        | BotError::Cancelled => error,
        other => BotError::Describe(other.to_string()),
    }
}

fn not_requested(media: &[Media]) -> Vec<MediaResponse> {
    (0..media.len()).map(MediaResponse::do_nothing).collect()
}

/// One future per media item, all awaited, results restored to index order
async fn fan_out<'m, F, Fut>(media: &'m [Media], per_item: F) -> Vec<MediaResponse>
where
    F: Fn(usize, &'m Media) -> Fut,
    Fut: Future<Output = MediaResponse>,
{
    let mut tasks: FuturesUnordered<Fut> = media
        .iter()
        .enumerate()
        .map(|(index, item)| per_item(index, item))
        .collect();

    let mut responses = Vec::with_capacity(media.len());
    while let Some(response) = tasks.next().await {
        responses.push(response);
    }
    responses.sort_by_key(|response| response.index);
    responses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;
    use crate::usecases::testing::{FakeDescriber, FakeOcr, TestLocalizer};

    fn video() -> Media {
        Media {
            kind: MediaKind::Video,
            url: "https://img/video.mp4".to_string(),
            alt_text: None,
        }
    }

    fn caption(text: &str, confidence: f64) -> Caption {
        Caption {
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_confident_captions_stop_at_first_low_score() {
        let captions = vec![
            caption("a dog", 0.9),
            caption("a cat", 0.2),
            caption("a wolf", 0.8),
        ];
        assert_eq!(confident_captions(&captions), vec!["a dog"]);
    }

    #[test]
    fn test_confident_captions_keep_top_three() {
        let captions = vec![
            caption("a", 0.9),
            caption("b", 0.8),
            caption("c", 0.25),
            caption("d", 0.7),
        ];
        assert_eq!(confident_captions(&captions), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_alt_text_reader() {
        let ocr = FakeOcr::default();
        let describer = FakeDescriber::default();
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);
        let media = vec![
            Media::photo("https://img/a.jpg").with_alt_text("a red ball"),
            Media::photo("https://img/b.jpg"),
            video(),
        ];

        let responses = responders.read_alt_text(&media, &Language::english());

        assert_eq!(responses[0].kind, ResponseKind::FoundAltText);
        assert_eq!(responses[0].reply.as_deref(), Some("a red ball"));
        assert_eq!(responses[1].kind, ResponseKind::MissingAltText);
        assert!(responses[1].error.is_none());
        assert!(responses[2].is_do_nothing());
    }

    #[tokio::test]
    async fn test_ocr_skips_non_photos_without_remote_call() {
        let ocr = FakeOcr::default().with("https://img/a.jpg", Ok("  SALE  "));
        let describer = FakeDescriber::default();
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);
        let media = vec![video(), Media::photo("https://img/a.jpg")];

        let responses = responders.recognize_text(&media).await;

        assert!(responses[0].is_do_nothing());
        assert_eq!(responses[0].error, Some(BotError::WrongMediaType));
        assert_eq!(responses[1].succeeded(), Some("SALE"));
        assert_eq!(ocr.calls(), vec!["https://img/a.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_ocr_errors_are_kept_per_item() {
        let ocr = FakeOcr::default()
            .with("https://img/a.jpg", Err(BotError::Ocr("quota".to_string())))
            .with("https://img/b.jpg", Ok("hello"));
        let describer = FakeDescriber::default();
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);
        let media = vec![
            Media::photo("https://img/a.jpg"),
            Media::photo("https://img/b.jpg"),
        ];

        let responses = responders.recognize_text(&media).await;

        assert_eq!(responses[0].kind, ResponseKind::FoundOcr);
        assert_eq!(responses[0].error, Some(BotError::Ocr("quota".to_string())));
        assert_eq!(responses[1].succeeded(), Some("hello"));
    }

    #[tokio::test]
    async fn test_description_joins_confident_captions() {
        let ocr = FakeOcr::default();
        let describer = FakeDescriber::default().with(
            "https://img/a.jpg",
            Ok(vec![("a dog", 0.9), ("a puppy", 0.5), ("a rug", 0.1)]),
        );
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);

        let responses = responders
            .describe(&[Media::photo("https://img/a.jpg")], &Language::english())
            .await;

        assert_eq!(
            responses[0].succeeded(),
            Some("a dog. It might also be a puppy")
        );
    }

    #[tokio::test]
    async fn test_description_joins_three_captions_in_rank_order() {
        let ocr = FakeOcr::default();
        let describer = FakeDescriber::default().with(
            "https://img/a.jpg",
            Ok(vec![("a", 0.9), ("b", 0.6), ("c", 0.3), ("d", 0.3)]),
        );
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);

        let responses = responders
            .describe(&[Media::photo("https://img/a.jpg")], &Language::english())
            .await;

        assert_eq!(
            responses[0].succeeded(),
            Some("a. It might also be b. It might also be c")
        );
    }

    #[tokio::test]
    async fn test_transport_failures_become_capability_failures() {
        let ocr = FakeOcr::default().with(
            "https://img/a.jpg",
            Err(BotError::Transport("timeout".to_string())),
        );
        let describer = FakeDescriber::default().with(
            "https://img/a.jpg",
            Err(BotError::Provider("503".to_string())),
        );
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);
        let media = [Media::photo("https://img/a.jpg")];

        let ocr_responses = responders.recognize_text(&media).await;
        let describe_responses = responders.describe(&media, &Language::english()).await;

        assert!(matches!(ocr_responses[0].error, Some(BotError::Ocr(_))));
        assert!(matches!(
            describe_responses[0].error,
            Some(BotError::Describe(_))
        ));
    }

    #[tokio::test]
    async fn test_media_without_url_is_not_sent_to_providers() {
        let ocr = FakeOcr::default();
        let describer = FakeDescriber::default();
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);
        let media = [Media::photo("  ")];

        let ocr_responses = responders.recognize_text(&media).await;
        let describe_responses = responders.describe(&media, &Language::english()).await;

        assert!(ocr_responses[0].is_do_nothing());
        assert!(ocr_responses[0].error.is_none());
        assert!(describe_responses[0].is_do_nothing());
        assert!(ocr.calls().is_empty());
        assert!(describer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_description_without_confident_caption() {
        let ocr = FakeOcr::default();
        let describer =
            FakeDescriber::default().with("https://img/a.jpg", Ok(vec![("blurry", 0.1)]));
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);

        let responses = responders
            .describe(&[Media::photo("https://img/a.jpg")], &Language::english())
            .await;

        assert_eq!(responses[0].error, Some(BotError::NoHighConfidenceResults));
    }

    #[tokio::test]
    async fn test_generate_runs_only_requested_responders() {
        let ocr = FakeOcr::default().with("https://img/a.jpg", Ok("text"));
        let describer = FakeDescriber::default();
        let responders = Responders::new(&ocr, &describer, &TestLocalizer);
        let directive = Directive::new([DirectiveKind::Ocr], Language::english());

        let generated = responders
            .generate(&directive, &[Media::photo("https://img/a.jpg")])
            .await;

        assert!(generated.alt_text[0].is_do_nothing());
        assert!(generated.describe[0].is_do_nothing());
        assert_eq!(generated.ocr[0].succeeded(), Some("text"));
        assert!(describer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_restores_index_order() {
        let media: Vec<Media> = (0..4)
            .map(|i| Media::photo(format!("https://img/{}.jpg", i)))
            .collect();

        let responses = fan_out(&media, |index, _| async move {
            // Later items finish first
            for _ in 0..(4 - index) {
                tokio::task::yield_now().await;
            }
            MediaResponse::do_nothing(index)
        })
        .await;

        let indexes: Vec<_> = responses.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
    }
}
