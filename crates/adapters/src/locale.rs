//! Static string tables for user-facing replies

use alt_text_bot_domain::{Language, Localizer, MessageKey, fill_template};

/// Built-in English and German tables; anything else falls back to English
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocalizer;

impl StaticLocalizer {
    pub fn new() -> Self {
        Self
    }

    /// Whether replies in `language` get their own table
    pub fn supports(&self, language: &Language) -> bool {
        matches!(language.primary(), "en" | "de")
    }

    fn template(language: &Language, key: MessageKey) -> &'static str {
        match language.primary() {
            "de" => german(key),
            _ => english(key),
        }
    }
}

impl Localizer for StaticLocalizer {
    fn localize(&self, key: MessageKey, language: &Language, args: &[(&str, &str)]) -> String {
        fill_template(Self::template(language, key), args)
    }
}

fn english(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Help => {
            "Mention me under a post with an image: ocr, describe or alt text."
        }
        MessageKey::MightAlsoBe => "{first}. It might also be {next}",
        MessageKey::ContainsText => "{first}. It contains the text: {text}",
        MessageKey::ThinkItIs => "{first}. I think it's {description}",
        MessageKey::ImageLabel => "Image {index}: {text}",
        MessageKey::MissingAltText => "There is no alt text for this image.",
        MessageKey::NoPhotosFound => "Sorry, I didn't find any photos.",
        MessageKey::WrongMediaType => "Sorry, I can only describe photos.",
        MessageKey::OcrFailed => "Sorry, I couldn't read any text in this image.",
        MessageKey::DescribeFailed => "Sorry, I couldn't describe this image.",
        MessageKey::NoHighConfidence => "Sorry, I'm not sure what this image shows.",
        MessageKey::UnsupportedLanguage => "Sorry, I can't describe images in that language.",
        MessageKey::GenericError => "Sorry, something went wrong.",
    }
}

fn german(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Help => {
            "Erwähne mich unter einem Beitrag mit Bild: ocr, beschreiben oder alt text."
        }
        MessageKey::MightAlsoBe => "{first}. Es könnte auch {next} sein",
        MessageKey::ContainsText => "{first}. Es enthält den Text: {text}",
        MessageKey::ThinkItIs => "{first}. Ich glaube, es ist {description}",
        MessageKey::ImageLabel => "Bild {index}: {text}",
        MessageKey::MissingAltText => "Dieses Bild hat keinen Alt-Text.",
        MessageKey::NoPhotosFound => "Entschuldigung, ich habe keine Fotos gefunden.",
        MessageKey::WrongMediaType => "Entschuldigung, ich kann nur Fotos beschreiben.",
        MessageKey::OcrFailed => "Entschuldigung, ich konnte in diesem Bild keinen Text lesen.",
        MessageKey::DescribeFailed => "Entschuldigung, ich konnte dieses Bild nicht beschreiben.",
        MessageKey::NoHighConfidence => {
            "Entschuldigung, ich bin mir nicht sicher, was dieses Bild zeigt."
        }
        MessageKey::UnsupportedLanguage => {
            "Entschuldigung, in dieser Sprache kann ich keine Bilder beschreiben."
        }
        MessageKey::GenericError => "Entschuldigung, da ist etwas schiefgelaufen.",
    }
}
