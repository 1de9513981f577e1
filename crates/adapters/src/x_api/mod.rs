//! X (Twitter) API adapters

mod read;
mod write;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use alt_text_bot_domain::{Post, PostError, PostRepository};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use time::OffsetDateTime;

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// X API v2 client for reading posts and posting replies
pub struct XPostRepository {
    client: Client,
    /// App token used for lookups
    bearer_token: SecretString,
    /// User-context token used for replies
    user_token: SecretString,
    base_url: String,
}

impl XPostRepository {
    pub fn new(bearer_token: SecretString, user_token: SecretString) -> Self {
        Self::with_base_url(bearer_token, user_token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        bearer_token: SecretString,
        user_token: SecretString,
        base_url: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            bearer_token,
            user_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(token: &SecretString) -> String {
        format!("Bearer {}", token.expose_secret())
    }
}

#[async_trait]
impl PostRepository for XPostRepository {
    async fn get_post(&self, id: &str) -> Result<Post, PostError> {
        self.fetch_post(id).await
    }

    async fn reply_to_post(&self, id: &str, text: &str) -> Result<Post, PostError> {
        self.create_reply(id, text).await
    }
}

/// Map the status codes every endpoint shares onto [`PostError`]
async fn check_status(response: Response, what: &str) -> Result<Response, PostError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(PostError::Auth("Invalid token".to_string())),
        StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            Err(PostError::Forbidden(body))
        }
        StatusCode::NOT_FOUND => Err(PostError::NotFound(what.to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(PostError::RateLimited(retry_after(&response))),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(PostError::Api(format!("{} failed ({}): {}", what, status, body)))
        }
    }
}

/// Time until the `x-rate-limit-reset` epoch, if the header is present
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .map(|reset| {
            let now = OffsetDateTime::now_utc().unix_timestamp();
            Duration::from_secs(reset.saturating_sub(now).max(0) as u64)
        })
}

/// In-memory post repository for dry runs and tests
#[derive(Default)]
pub struct StubPostRepository {
    posts: HashMap<String, Post>,
    replies: Mutex<Vec<Post>>,
}

impl StubPostRepository {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: posts.into_iter().map(|p| (p.id.clone(), p)).collect(),
            replies: Mutex::new(vec![]),
        }
    }

    /// Every reply posted so far, in order
    pub fn get_replies(&self) -> Vec<Post> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostRepository for StubPostRepository {
    async fn get_post(&self, id: &str) -> Result<Post, PostError> {
        self.posts
            .get(id)
            .cloned()
            .ok_or_else(|| PostError::NotFound(id.to_string()))
    }

    async fn reply_to_post(&self, id: &str, text: &str) -> Result<Post, PostError> {
        let mut replies = self.replies.lock().unwrap();
        let reply = Post {
            id: format!("stub_reply_{}", replies.len() + 1),
            text: text.to_string(),
            parent_id: Some(id.to_string()),
            ..Default::default()
        };
        replies.push(reply.clone());
        Ok(reply)
    }
}
