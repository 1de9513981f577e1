//! Response merge engine - one response per media item out of three

use crate::model::{Directive, Language, MediaResponse, ResponseKind};
use crate::ports::{Localizer, MessageKey};

/// OCR text shorter than this is folded into the description in auto mode
pub const SHORT_OCR_THRESHOLD: usize = 50;

/// Merge alt-text, OCR and description responses index by index.
///
/// All three slices are expected to cover the same media list.
pub fn merge_responses(
    directive: &Directive,
    alt_text: &[MediaResponse],
    ocr: &[MediaResponse],
    describe: &[MediaResponse],
    localizer: &dyn Localizer,
) -> Vec<MediaResponse> {
    let merger = Merger {
        language: directive.language(),
        localizer,
    };

    alt_text
        .iter()
        .zip(ocr)
        .zip(describe)
        .map(|((alt, ocr), describe)| {
            if alt.is_do_nothing() && ocr.is_do_nothing() && describe.is_do_nothing() {
                MediaResponse::do_nothing(alt.index)
            } else if directive.is_auto() {
                merger.auto(alt, ocr, describe)
            } else {
                merger.explicit(alt, ocr, describe)
            }
        })
        .collect()
}

struct Merger<'a> {
    language: &'a Language,
    localizer: &'a dyn Localizer,
}

impl Merger<'_> {
    fn auto(
        &self,
        alt: &MediaResponse,
        ocr: &MediaResponse,
        describe: &MediaResponse,
    ) -> MediaResponse {
        if alt.kind == ResponseKind::FoundAltText && alt.succeeded().is_some() {
            return alt.clone();
        }

        match (ocr.succeeded(), describe.succeeded()) {
            (Some(text), Some(_)) if text.chars().count() < SHORT_OCR_THRESHOLD => {
                self.combine(alt.index, None, Some(describe), Some(ocr))
            }
            (Some(_), _) => ocr.clone(),
            (None, Some(_)) => describe.clone(),
            (None, None) => first_failure(ocr, describe).unwrap_or(alt).clone(),
        }
    }

    fn explicit(
        &self,
        alt: &MediaResponse,
        ocr: &MediaResponse,
        describe: &MediaResponse,
    ) -> MediaResponse {
        let alt_found = alt.succeeded().map(|_| alt);
        let describe_found = describe.succeeded().map(|_| describe);
        let ocr_found = ocr.succeeded().map(|_| ocr);

        if alt_found.is_some() || describe_found.is_some() || ocr_found.is_some() {
            return self.combine(alt.index, alt_found, describe_found, ocr_found);
        }

        if let Some(failure) = first_failure(ocr, describe) {
            return failure.clone();
        }
        if alt.kind == ResponseKind::MissingAltText {
            return alt.clone();
        }
        MediaResponse::do_nothing(alt.index)
    }

    /// Compose successes in the fixed order alt text, description, OCR
    fn combine(
        &self,
        index: usize,
        alt: Option<&MediaResponse>,
        describe: Option<&MediaResponse>,
        ocr: Option<&MediaResponse>,
    ) -> MediaResponse {
        let parts: Vec<&MediaResponse> = [alt, describe, ocr].into_iter().flatten().collect();
        if let [single] = parts.as_slice() {
            return (*single).clone();
        }

        let mut text: Option<String> = alt.and_then(MediaResponse::succeeded).map(str::to_string);

        if let Some(description) = describe.and_then(MediaResponse::succeeded) {
            text = Some(match text {
                Some(first) => self.localizer.localize(
                    MessageKey::ThinkItIs,
                    self.language,
                    &[("first", &first), ("description", description)],
                ),
                None => description.to_string(),
            });
        }

        if let Some(recognized) = ocr.and_then(MediaResponse::succeeded) {
            text = Some(match text {
                Some(first) => self.localizer.localize(
                    MessageKey::ContainsText,
                    self.language,
                    &[("first", &first), ("text", recognized)],
                ),
                None => recognized.to_string(),
            });
        }

        match text {
            Some(text) => MediaResponse::found(index, ResponseKind::Merged, text),
            None => MediaResponse::do_nothing(index),
        }
    }
}

/// OCR error first, then description error
fn first_failure<'r>(
    ocr: &'r MediaResponse,
    describe: &'r MediaResponse,
) -> Option<&'r MediaResponse> {
    [ocr, describe]
        .into_iter()
        .find(|response| !response.is_do_nothing() && response.error.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BotError;
    use crate::model::DirectiveKind;
    use crate::usecases::testing::TestLocalizer;

    fn alt(text: &str) -> MediaResponse {
        MediaResponse::found(0, ResponseKind::FoundAltText, text)
    }

    fn missing_alt() -> MediaResponse {
        MediaResponse::found(
            0,
            ResponseKind::MissingAltText,
            "There is no alt text for this image.",
        )
    }

    fn ocr(text: &str) -> MediaResponse {
        MediaResponse::found(0, ResponseKind::FoundOcr, text)
    }

    fn description(text: &str) -> MediaResponse {
        MediaResponse::found(0, ResponseKind::FoundDescription, text)
    }

    fn ocr_failed() -> MediaResponse {
        MediaResponse::failed(0, ResponseKind::FoundOcr, BotError::Ocr("quota".to_string()))
    }

    fn describe_failed() -> MediaResponse {
        MediaResponse::failed(
            0,
            ResponseKind::FoundDescription,
            BotError::NoHighConfidenceResults,
        )
    }

    fn none() -> MediaResponse {
        MediaResponse::do_nothing(0)
    }

    fn auto() -> Directive {
        Directive::auto(Language::english())
    }

    fn explicit(kinds: &[DirectiveKind]) -> Directive {
        Directive::new(kinds.iter().copied(), Language::english())
    }

    fn merge_one(
        directive: &Directive,
        a: MediaResponse,
        o: MediaResponse,
        d: MediaResponse,
    ) -> MediaResponse {
        let mut merged = merge_responses(directive, &[a], &[o], &[d], &TestLocalizer);
        merged.remove(0)
    }

    #[test]
    fn test_all_do_nothing_stays_do_nothing() {
        let merged = merge_one(&auto(), none(), none(), none());
        assert!(merged.is_do_nothing());
    }

    #[test]
    fn test_auto_prefers_alt_text() {
        let merged = merge_one(&auto(), alt("a red ball"), ocr("BALL"), description("a ball"));
        assert_eq!(merged.reply.as_deref(), Some("a red ball"));
        assert_eq!(merged.kind, ResponseKind::FoundAltText);
    }

    #[test]
    fn test_auto_folds_short_ocr_into_description() {
        let merged = merge_one(
            &auto(),
            missing_alt(),
            ocr("SALE"),
            description("a storefront"),
        );
        assert_eq!(
            merged.reply.as_deref(),
            Some("a storefront. It contains the text: SALE")
        );
        assert_eq!(merged.kind, ResponseKind::Merged);
    }

    #[test]
    fn test_auto_long_ocr_wins_alone() {
        let long_text = "x".repeat(SHORT_OCR_THRESHOLD);
        let merged = merge_one(
            &auto(),
            missing_alt(),
            ocr(&long_text),
            description("a document"),
        );
        assert_eq!(merged.reply.as_deref(), Some(long_text.as_str()));
        assert_eq!(merged.kind, ResponseKind::FoundOcr);
    }

    #[test]
    fn test_auto_falls_back_to_description() {
        let merged = merge_one(&auto(), missing_alt(), ocr_failed(), description("a cat"));
        assert_eq!(merged.reply.as_deref(), Some("a cat"));
    }

    #[test]
    fn test_auto_reports_ocr_error_before_description_error() {
        let merged = merge_one(&auto(), missing_alt(), ocr_failed(), describe_failed());
        assert_eq!(merged.error, Some(BotError::Ocr("quota".to_string())));
    }

    #[test]
    fn test_explicit_composes_in_fixed_order() {
        let directive = explicit(&[
            DirectiveKind::Ocr,
            DirectiveKind::AltText,
            DirectiveKind::Describe,
        ]);
        let merged = merge_one(&directive, alt("a sign"), ocr("OPEN"), description("a door"));
        assert_eq!(
            merged.reply.as_deref(),
            Some("a sign. I think it's a door. It contains the text: OPEN")
        );
    }

    #[test]
    fn test_explicit_pairs() {
        let alt_ocr = merge_one(
            &explicit(&[DirectiveKind::AltText, DirectiveKind::Ocr]),
            alt("a sign"),
            ocr("OPEN"),
            none(),
        );
        assert_eq!(
            alt_ocr.reply.as_deref(),
            Some("a sign. It contains the text: OPEN")
        );

        let alt_describe = merge_one(
            &explicit(&[DirectiveKind::AltText, DirectiveKind::Describe]),
            alt("a sign"),
            none(),
            description("a door"),
        );
        assert_eq!(
            alt_describe.reply.as_deref(),
            Some("a sign. I think it's a door")
        );
    }

    #[test]
    fn test_explicit_long_ocr_is_still_combined() {
        let long_text = "y".repeat(80);
        let merged = merge_one(
            &explicit(&[DirectiveKind::Ocr, DirectiveKind::Describe]),
            none(),
            ocr(&long_text),
            description("a page"),
        );
        assert_eq!(
            merged.reply,
            Some(format!("a page. It contains the text: {}", long_text))
        );
    }

    #[test]
    fn test_explicit_drops_failed_part() {
        let merged = merge_one(
            &explicit(&[DirectiveKind::Ocr, DirectiveKind::Describe]),
            none(),
            ocr_failed(),
            description("a storefront"),
        );
        assert_eq!(merged.reply.as_deref(), Some("a storefront"));
        assert!(merged.error.is_none());
    }

    #[test]
    fn test_explicit_nothing_succeeded() {
        let merged = merge_one(
            &explicit(&[DirectiveKind::Describe]),
            none(),
            none(),
            describe_failed(),
        );
        assert_eq!(merged.error, Some(BotError::NoHighConfidenceResults));

        let merged = merge_one(
            &explicit(&[DirectiveKind::AltText]),
            missing_alt(),
            none(),
            none(),
        );
        assert_eq!(merged.kind, ResponseKind::MissingAltText);
    }

    #[test]
    fn test_merge_keeps_indexes() {
        let alt_responses = vec![
            alt("first"),
            MediaResponse::found(1, ResponseKind::FoundAltText, "second"),
        ];
        let nothing = vec![none(), MediaResponse::do_nothing(1)];

        let merged = merge_responses(&auto(), &alt_responses, &nothing, &nothing, &TestLocalizer);

        assert_eq!(merged[1].index, 1);
        assert_eq!(merged[1].reply.as_deref(), Some("second"));
    }
}
