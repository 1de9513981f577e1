//! X API write adapter for posting replies

use alt_text_bot_domain::{Post, PostError};
use serde::{Deserialize, Serialize};

use super::{XPostRepository, check_status};

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    reply: ReplySettings<'a>,
}

#[derive(Serialize)]
struct ReplySettings<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
    #[serde(default)]
    text: Option<String>,
}

impl XPostRepository {
    /// Post `text` as a reply to `in_reply_to`
    pub(super) async fn create_reply(&self, in_reply_to: &str, text: &str) -> Result<Post, PostError> {
        let request = CreateTweetRequest {
            text,
            reply: ReplySettings {
                in_reply_to_tweet_id: in_reply_to,
            },
        };

        let url = format!("{}/2/tweets", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", Self::auth_header(&self.user_token))
            .json(&request)
            .send()
            .await
            .map_err(|e| PostError::Network(e.to_string()))?;

        let response = check_status(response, "Create reply").await?;

        let created: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PostError::Api(e.to_string()))?;

        tracing::info!(in_reply_to = %in_reply_to, reply_id = %created.data.id, "Posted reply");

        Ok(Post {
            id: created.data.id,
            text: created.data.text.unwrap_or_else(|| text.to_string()),
            parent_id: Some(in_reply_to.to_string()),
            ..Default::default()
        })
    }
}
