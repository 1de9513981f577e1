//! Fake port implementations shared by the use case tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::BotError;
use crate::model::{Caption, Language, OcrText, Post};
use crate::ports::{
    DescribeProvider, Localizer, MessageKey, OcrProvider, PostError, PostRepository,
    fill_template,
};

/// In-memory platform that records fetches and replies
#[derive(Default)]
pub struct FakePosts {
    posts: HashMap<String, Post>,
    fetched: Mutex<Vec<String>>,
    replies: Mutex<Vec<(String, String)>>,
    reply_attempts: AtomicUsize,
    /// Reply attempts (1-based) that fail
    failing_replies: Vec<usize>,
    reply_error_forbidden: bool,
}

impl FakePosts {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: posts.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..Default::default()
        }
    }

    pub fn failing_replies(mut self, attempts: Vec<usize>) -> Self {
        self.failing_replies = attempts;
        self
    }

    pub fn forbidden_replies(mut self) -> Self {
        self.reply_error_forbidden = true;
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    /// `(in_reply_to, text)` for every successful reply
    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostRepository for FakePosts {
    async fn get_post(&self, id: &str) -> Result<Post, PostError> {
        self.fetched.lock().unwrap().push(id.to_string());
        self.posts
            .get(id)
            .cloned()
            .ok_or_else(|| PostError::NotFound(id.to_string()))
    }

    async fn reply_to_post(&self, id: &str, text: &str) -> Result<Post, PostError> {
        let attempt = self.reply_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reply_error_forbidden {
            return Err(PostError::Forbidden("blocked".to_string()));
        }
        if self.failing_replies.contains(&attempt) {
            return Err(PostError::Api(format!("reply {} rejected", attempt)));
        }
        let mut replies = self.replies.lock().unwrap();
        replies.push((id.to_string(), text.to_string()));
        Ok(Post {
            id: format!("reply-{}", replies.len()),
            text: text.to_string(),
            parent_id: Some(id.to_string()),
            ..Default::default()
        })
    }
}

/// OCR results keyed by image URL; unknown URLs fail
#[derive(Default)]
pub struct FakeOcr {
    results: HashMap<String, Result<String, BotError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeOcr {
    pub fn with(mut self, url: &str, result: Result<&str, BotError>) -> Self {
        self.results
            .insert(url.to_string(), result.map(str::to_string));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrProvider for FakeOcr {
    async fn recognize(&self, image_url: &str) -> Result<OcrText, BotError> {
        self.calls.lock().unwrap().push(image_url.to_string());
        match self.results.get(image_url) {
            Some(Ok(text)) => Ok(OcrText {
                text: text.clone(),
                language: None,
            }),
            Some(Err(error)) => Err(error.clone()),
            None => Err(BotError::Ocr("no text".to_string())),
        }
    }
}

/// Caption results keyed by image URL; unknown URLs fail
#[derive(Default)]
pub struct FakeDescriber {
    results: HashMap<String, Result<Vec<Caption>, BotError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeDescriber {
    pub fn with(mut self, url: &str, result: Result<Vec<(&str, f64)>, BotError>) -> Self {
        let result = result.map(|captions| {
            captions
                .into_iter()
                .map(|(text, confidence)| Caption {
                    text: text.to_string(),
                    confidence,
                })
                .collect()
        });
        self.results.insert(url.to_string(), result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DescribeProvider for FakeDescriber {
    async fn describe(
        &self,
        image_url: &str,
        _language: &Language,
    ) -> Result<Vec<Caption>, BotError> {
        self.calls.lock().unwrap().push(image_url.to_string());
        self.results
            .get(image_url)
            .cloned()
            .unwrap_or_else(|| Err(BotError::Describe("unavailable".to_string())))
    }
}

/// English-only string table with the production wording
pub struct TestLocalizer;

impl Localizer for TestLocalizer {
    fn localize(&self, key: MessageKey, _language: &Language, args: &[(&str, &str)]) -> String {
        let template = match key {
            MessageKey::Help => "Mention me under a post with an image: ocr, describe or alt text.",
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
        };
        fill_template(template, args)
    }
}
