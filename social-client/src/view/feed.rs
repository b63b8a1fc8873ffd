//! The post feed: composer, likes, comments.

use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::models::{Post, PostDraft, PostUpdate};
use crate::notice::Notices;
use crate::sync::{ActionKey, Lifecycle, Outcome};
use crate::view::ViewContext;

#[derive(Default)]
struct FeedState {
    posts: Vec<Post>,
    loaded: bool,
}

/// Per-action state strategy: like toggles patch the affected item in place
/// from the server's count/flag response; everything else reloads the feed
/// wholesale so server-computed fields (ids, timestamps) come back with it.
pub struct FeedView {
    ctx: ViewContext,
    state: Mutex<FeedState>,
    lifecycle: Lifecycle,
    notices: Notices,
}

impl FeedView {
    pub(crate) fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(FeedState::default()),
            lifecycle: Lifecycle::default(),
            notices: Notices::new(),
        }
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.state.lock().await.posts.clone()
    }

    /// False until the first successful load; lets callers show a loading
    /// placeholder instead of "no posts yet".
    pub async fn has_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Marks the view as gone. Responses still in flight will be dropped
    /// instead of written into state nobody is showing.
    pub fn detach(&self) {
        self.lifecycle.detach();
    }

    pub async fn refresh(&self) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::FeedRefresh) else {
            return Outcome::AlreadyPending;
        };
        self.reload(self.lifecycle.current()).await
    }

    pub async fn create_post(&self, draft: PostDraft) -> Outcome {
        if draft.title.is_empty() || draft.content.is_empty() {
            return Outcome::Invalid("title and content are required".into());
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::PostCreate) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.http.create_post(&draft).await;
        self.dispatch_and_reload(result, epoch, "Failed to create post")
            .await
    }

    pub async fn update_post(&self, post_id: i64, update: PostUpdate) -> Outcome {
        if update.title.is_none() && update.content.is_none() {
            return Outcome::Invalid("nothing to update".into());
        }
        let blank = |field: &Option<String>| field.as_deref().is_some_and(str::is_empty);
        if blank(&update.title) || blank(&update.content) {
            return Outcome::Invalid("updated fields must not be empty".into());
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::PostSave(post_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.http.update_post(post_id, &update).await;
        self.dispatch_and_reload(result, epoch, "Failed to update post")
            .await
    }

    pub async fn delete_post(&self, post_id: i64) -> Outcome {
        if !self
            .ctx
            .confirm
            .confirm("Are you sure you want to delete this post?")
        {
            return Outcome::Declined;
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::PostDelete(post_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.http.delete_post(post_id).await;
        self.dispatch_and_reload(result, epoch, "Failed to delete post")
            .await
    }

    pub async fn toggle_post_like(&self, post_id: i64) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::PostLike(post_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        match self.ctx.http.toggle_post_like(post_id).await {
            Ok(like) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                let mut state = self.state.lock().await;
                if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
                    post.likes = like.likes;
                    post.liked_by_user = like.liked_by_user;
                }
                Outcome::Completed
            }
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to update like")
                    .await
            }
        }
    }

    pub async fn add_comment(&self, post_id: i64, content: &str) -> Outcome {
        if content.trim().is_empty() {
            return Outcome::Invalid("comment cannot be empty".into());
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::CommentCreate(post_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.http.add_comment(post_id, content).await;
        self.dispatch_and_reload(result, epoch, "Failed to post comment")
            .await
    }

    pub async fn delete_comment(&self, post_id: i64, comment_id: i64) -> Outcome {
        if !self
            .ctx
            .confirm
            .confirm("Are you sure you want to delete this comment?")
        {
            return Outcome::Declined;
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::CommentDelete(comment_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.http.delete_comment(post_id, comment_id).await;
        self.dispatch_and_reload(result, epoch, "Failed to delete comment")
            .await
    }

    pub async fn toggle_comment_like(&self, post_id: i64, comment_id: i64) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::CommentLike(comment_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        match self.ctx.http.toggle_comment_like(post_id, comment_id).await {
            Ok(like) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                let mut state = self.state.lock().await;
                if let Some(comment) = state
                    .posts
                    .iter_mut()
                    .find(|p| p.id == post_id)
                    .and_then(|p| p.comments.iter_mut().find(|c| c.id == comment_id))
                {
                    comment.likes = like.likes;
                    comment.liked_by_user = like.liked_by_user;
                }
                Outcome::Completed
            }
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to update like")
                    .await
            }
        }
    }

    /// Feed reload shared by refresh and the mutations that pick up
    /// server-computed fields via a full re-fetch.
    async fn reload(&self, epoch: u64) -> Outcome {
        match self.ctx.http.fetch_feed().await {
            Ok(payload) => {
                if let Some(user) = payload.user {
                    self.ctx.session.capture(user).await;
                }
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                let mut state = self.state.lock().await;
                state.posts = payload.posts;
                state.loaded = true;
                Outcome::Completed
            }
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                // Prior posts stay visible; the banner carries the failure.
                self.ctx
                    .fail(&self.notices, error, "Failed to fetch posts")
                    .await
            }
        }
    }

    async fn dispatch_and_reload(
        &self,
        result: Result<(), ApiError>,
        epoch: u64,
        fallback: &str,
    ) -> Outcome {
        match result {
            Ok(()) => self.reload(epoch).await,
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx.fail(&self.notices, error, fallback).await
            }
        }
    }
}
