//! Media resolution - finds the nearest post that carries photos

use crate::errors::BotError;
use crate::model::Post;
use crate::ports::PostRepository;

/// Hops allowed above the mentioning post
pub const MAX_DEPTH: u8 = 2;

/// Walks from a post to the nearest ancestor or quoted post with photos
pub struct MediaResolver<'a> {
    posts: &'a dyn PostRepository,
}

impl<'a> MediaResolver<'a> {
    pub fn new(posts: &'a dyn PostRepository) -> Self {
        Self { posts }
    }

    /// Resolve starting at the mentioning post
    pub async fn resolve(&self, root: Post) -> Result<Post, BotError> {
        self.resolve_from(root, false, MAX_DEPTH).await
    }

    /// Resolve from an arbitrary point of the walk.
    ///
    /// `tried_refresh` is shared by the whole walk: at most one post is ever
    /// re-fetched to complete its media.
    pub async fn resolve_from(
        &self,
        mut post: Post,
        mut tried_refresh: bool,
        mut depth_remaining: u8,
    ) -> Result<Post, BotError> {
        loop {
            if post.media.is_empty() && !post.fallback_media.is_empty() {
                if tried_refresh {
                    post.media = post.fallback_media.clone();
                } else {
                    tried_refresh = true;
                    post = self.refresh(post).await;
                    continue;
                }
            }

            if post.has_photos() {
                tracing::debug!(post_id = %post.id, media = post.media.len(), "Resolved photos");
                return Ok(post);
            }

            if !post.media.is_empty() {
                tracing::debug!(post_id = %post.id, "Post has media but no photos");
                return Err(BotError::WrongMediaType);
            }

            let Some(next_depth) = depth_remaining.checked_sub(1) else {
                tracing::debug!(post_id = %post.id, "Search depth exhausted");
                return Err(BotError::NoPhotosFound);
            };

            let (parent, parent_depth) = self.locate_parent(&post, next_depth).await?;
            tracing::debug!(
                post_id = %post.id,
                parent_id = %parent.id,
                depth_remaining = parent_depth,
                "Walking to parent"
            );
            post = parent;
            depth_remaining = parent_depth;
        }
    }

    /// Re-fetch a post whose media came back incomplete; on failure keep the
    /// fallback media so the walk can still use it
    async fn refresh(&self, mut post: Post) -> Post {
        match self.posts.get_post(&post.id).await {
            Ok(refreshed) => {
                tracing::debug!(post_id = %post.id, "Refreshed post media");
                refreshed
            }
            Err(error) => {
                tracing::warn!(post_id = %post.id, error = %error, "Failed to refresh post, using fallback media");
                post.media = post.fallback_media.clone();
                post
            }
        }
    }

    /// Find the next post to inspect. Quote hops leave no depth behind them
    /// since timelines never expand a quoted post's own ancestry.
    async fn locate_parent(&self, post: &Post, next_depth: u8) -> Result<(Post, u8), BotError> {
        if let Some(quoted) = &post.quoted {
            return Ok(((**quoted).clone(), 0));
        }

        let (parent_id, depth) = match (&post.quoted_id, &post.parent_id) {
            (Some(quoted_id), _) => (quoted_id, 0),
            (None, Some(parent_id)) => (parent_id, next_depth),
            (None, None) => return Err(BotError::NoPhotosFound),
        };

        match self.posts.get_post(parent_id).await {
            Ok(parent) => Ok((parent, depth)),
            Err(error) => {
                tracing::warn!(
                    post_id = %post.id,
                    parent_id = %parent_id,
                    error = %error,
                    "Failed to fetch parent post"
                );
                Err(BotError::NoPhotosFound)
            }
        }
    }
}
