//! X API read adapter - post lookup with media expansions

use std::collections::HashMap;

use alt_text_bot_domain::{Author, Media, MediaKind, Mention, Post, PostError, PostKind};
use serde::Deserialize;

use super::{XPostRepository, check_status};

const EXPANSIONS: &str = "attachments.media_keys,author_id,referenced_tweets.id,\
referenced_tweets.id.attachments.media_keys,entities.mentions.username";
const TWEET_FIELDS: &str = "text,author_id,attachments,referenced_tweets,entities";
const MEDIA_FIELDS: &str = "media_key,type,url,alt_text";
const USER_FIELDS: &str = "name,username";

impl XPostRepository {
    /// Look up a single post with its media, author, mentions and referenced posts
    pub(super) async fn fetch_post(&self, id: &str) -> Result<Post, PostError> {
        let url = format!("{}/2/tweets/{}", self.base_url, id);

        tracing::debug!(post_id = %id, "Fetching post from X");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("expansions", EXPANSIONS),
                ("tweet.fields", TWEET_FIELDS),
                ("media.fields", MEDIA_FIELDS),
                ("user.fields", USER_FIELDS),
            ])
            .header("Authorization", Self::auth_header(&self.bearer_token))
            .send()
            .await
            .map_err(|e| PostError::Network(e.to_string()))?;

        let response = check_status(response, &format!("Post {}", id)).await?;

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| PostError::Api(e.to_string()))?;

        let Some(tweet) = lookup.data else {
            let detail = lookup
                .errors
                .into_iter()
                .next()
                .map(|e| e.detail)
                .unwrap_or_else(|| id.to_string());
            return Err(PostError::NotFound(detail));
        };

        let includes = Includes::index(lookup.includes.unwrap_or_default());
        Ok(includes.to_post(tweet, true))
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    data: Option<Tweet>,
    includes: Option<RawIncludes>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    detail: String,
}

#[derive(Deserialize, Clone)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
    author_id: Option<String>,
    attachments: Option<Attachments>,
    #[serde(default)]
    referenced_tweets: Vec<ReferencedTweet>,
    entities: Option<Entities>,
}

#[derive(Deserialize, Clone)]
struct Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Deserialize, Clone)]
struct ReferencedTweet {
    r#type: String,
    id: String,
}

#[derive(Deserialize, Clone)]
struct Entities {
    #[serde(default)]
    mentions: Vec<MentionEntity>,
}

#[derive(Deserialize, Clone)]
struct MentionEntity {
    username: String,
    id: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawIncludes {
    #[serde(default)]
    media: Vec<MediaObject>,
    #[serde(default)]
    tweets: Vec<Tweet>,
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Deserialize, Clone)]
struct MediaObject {
    media_key: String,
    r#type: String,
    url: Option<String>,
    alt_text: Option<String>,
}

#[derive(Deserialize, Clone)]
struct User {
    id: String,
    #[serde(default)]
    name: String,
    username: String,
}

/// `includes` keyed by ID
struct Includes {
    media: HashMap<String, MediaObject>,
    tweets: HashMap<String, Tweet>,
    users: HashMap<String, User>,
}

impl Includes {
    fn index(raw: RawIncludes) -> Self {
        Self {
            media: raw
                .media
                .into_iter()
                .map(|m| (m.media_key.clone(), m))
                .collect(),
            tweets: raw.tweets.into_iter().map(|t| (t.id.clone(), t)).collect(),
            users: raw.users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        }
    }

    /// Convert a tweet; only the requested tweet embeds its referenced post
    fn to_post(&self, tweet: Tweet, embed_references: bool) -> Post {
        let author = tweet
            .author_id
            .as_ref()
            .map(|id| match self.users.get(id) {
                Some(user) => Author {
                    id: user.id.clone(),
                    name: user.name.clone(),
                    handle: user.username.clone(),
                },
                None => Author {
                    id: id.clone(),
                    ..Default::default()
                },
            })
            .unwrap_or_default();

        let (media, fallback_media) = self.media_for(&tweet);

        let reference = |kind: &str| {
            tweet
                .referenced_tweets
                .iter()
                .find(|r| r.r#type == kind)
                .map(|r| r.id.clone())
        };
        let parent_id = reference("replied_to");
        let (kind, quoted_id) = match (reference("quoted"), reference("retweeted")) {
            (Some(id), _) => (PostKind::Quote, Some(id)),
            (None, Some(id)) => (PostKind::Repost, Some(id)),
            (None, None) => (PostKind::Simple, None),
        };

        let quoted = quoted_id
            .as_ref()
            .filter(|_| embed_references)
            .and_then(|id| self.tweets.get(id))
            .map(|quoted| Box::new(self.to_post(quoted.clone(), false)));

        let mentions = tweet
            .entities
            .map(|entities| {
                entities
                    .mentions
                    .into_iter()
                    .map(|m| Mention {
                        id: m.id,
                        handle: m.username,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Post {
            id: tweet.id,
            text: tweet.text,
            author,
            parent_id,
            quoted,
            quoted_id,
            kind,
            media,
            fallback_media,
            mentions,
        }
    }

    /// Media in attachment order. When some keys are missing from `includes`
    /// everything goes to the fallback list so the resolver re-fetches.
    fn media_for(&self, tweet: &Tweet) -> (Vec<Media>, Vec<Media>) {
        let keys = tweet
            .attachments
            .as_ref()
            .map(|a| a.media_keys.as_slice())
            .unwrap_or_default();

        let mut complete = true;
        let media: Vec<Media> = keys
            .iter()
            .map(|key| match self.media.get(key) {
                Some(object) => Media {
                    kind: media_kind(&object.r#type),
                    url: object.url.clone().unwrap_or_default(),
                    alt_text: object.alt_text.clone().filter(|a| !a.trim().is_empty()),
                },
                None => {
                    complete = false;
                    Media {
                        kind: kind_from_key(key),
                        url: String::new(),
                        alt_text: None,
                    }
                }
            })
            .collect();

        if complete {
            (media, vec![])
        } else {
            tracing::debug!(post_id = %tweet.id, keys = keys.len(), "Media expansion incomplete");
            (vec![], media)
        }
    }
}

fn media_kind(kind: &str) -> MediaKind {
    match kind {
        "photo" => MediaKind::Photo,
        "video" => MediaKind::Video,
        "animated_gif" => MediaKind::AnimatedImage,
        _ => MediaKind::Other,
    }
}

/// Media keys carry their type as a numeric prefix
fn kind_from_key(key: &str) -> MediaKind {
    match key.split_once('_').map(|(prefix, _)| prefix) {
        Some("3") => MediaKind::Photo,
        Some("7") => MediaKind::Video,
        Some("16") => MediaKind::AnimatedImage,
        _ => MediaKind::Other,
    }
}
