//! Stub vision providers for testing and offline mode

use std::collections::HashMap;

use alt_text_bot_domain::{BotError, Caption, DescribeProvider, Language, OcrProvider, OcrText};
use async_trait::async_trait;

/// OCR stub returning canned text per image URL
#[derive(Default)]
pub struct StubOcr {
    texts: HashMap<String, String>,
    /// Returned for URLs without canned text; `None` means an OCR error
    default_text: Option<String>,
}

impl StubOcr {
    /// Stub that finds no text anywhere
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stub that returns the same text for every image
    pub fn with_default(text: impl Into<String>) -> Self {
        Self {
            texts: HashMap::new(),
            default_text: Some(text.into()),
        }
    }

    pub fn with_text(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(url.into(), text.into());
        self
    }
}

#[async_trait]
impl OcrProvider for StubOcr {
    async fn recognize(&self, image_url: &str) -> Result<OcrText, BotError> {
        self.texts
            .get(image_url)
            .or(self.default_text.as_ref())
            .map(|text| OcrText {
                text: text.clone(),
                language: None,
            })
            .ok_or_else(|| BotError::Ocr("Stub has no text for this image".to_string()))
    }
}

/// Caption stub returning canned captions per image URL
#[derive(Default)]
pub struct StubDescriber {
    captions: HashMap<String, Vec<Caption>>,
    default_captions: Option<Vec<Caption>>,
}

impl StubDescriber {
    /// Stub that cannot describe anything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stub that gives every image the same single caption
    pub fn with_default(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            captions: HashMap::new(),
            default_captions: Some(vec![Caption {
                text: text.into(),
                confidence,
            }]),
        }
    }

    pub fn with_captions(mut self, url: impl Into<String>, captions: Vec<Caption>) -> Self {
        self.captions.insert(url.into(), captions);
        self
    }
}

#[async_trait]
impl DescribeProvider for StubDescriber {
    async fn describe(
        &self,
        image_url: &str,
        _language: &Language,
    ) -> Result<Vec<Caption>, BotError> {
        self.captions
            .get(image_url)
            .or(self.default_captions.as_ref())
            .cloned()
            .ok_or_else(|| BotError::Describe("Stub has no captions for this image".to_string()))
    }
}
