//! Profile page for the viewer or another user: their posts with comment
//! forms, the friendship controls, avatar management, and account deletion.
//!
//! Unlike the friends screen, mutations here re-fetch the whole profile
//! payload, because the server recomputes the friendship arrays and avatar
//! URL on its side.

use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::models::{FriendshipStatus, ImageUpload, Post, User};
use crate::notice::Notices;
use crate::sync::{ActionKey, Lifecycle, Outcome};
use crate::view::ViewContext;

#[derive(Default)]
struct ProfileState {
    profile_user: Option<User>,
    posts: Vec<Post>,
    loaded: bool,
}

pub struct ProfileView {
    ctx: ViewContext,
    /// `None` means the viewer's own page.
    target: Option<i64>,
    state: Mutex<ProfileState>,
    lifecycle: Lifecycle,
    notices: Notices,
}

impl ProfileView {
    pub(crate) fn new(ctx: ViewContext, target: Option<i64>) -> Self {
        Self {
            ctx,
            target,
            state: Mutex::new(ProfileState::default()),
            lifecycle: Lifecycle::default(),
            notices: Notices::new(),
        }
    }

    pub fn target(&self) -> Option<i64> {
        self.target
    }

    pub async fn profile_user(&self) -> Option<User> {
        self.state.lock().await.profile_user.clone()
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.state.lock().await.posts.clone()
    }

    pub async fn has_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    pub async fn is_self(&self) -> bool {
        if self.target.is_none() {
            return true;
        }
        let viewer = self.ctx.session.current_user().await;
        let profile = self.state.lock().await.profile_user.clone();
        matches!((viewer, profile), (Some(v), Some(p)) if v.id == p.id)
    }

    /// Relationship between the viewer and the profiled user. `None` on the
    /// viewer's own page.
    pub async fn friendship_status(&self) -> Option<FriendshipStatus> {
        match self.target {
            Some(id) => Some(self.ctx.graph.status(id).await),
            None => None,
        }
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn detach(&self) {
        self.lifecycle.detach();
    }

    pub async fn refresh(&self) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::ProfileRefresh) else {
            return Outcome::AlreadyPending;
        };
        self.reload(self.lifecycle.current()).await
    }

    pub async fn send_friend_request(&self) -> Outcome {
        let Some(target) = self.target else {
            return Outcome::Invalid("no profile selected".into());
        };
        if self.ctx.graph.status(target).await != FriendshipStatus::None {
            return Outcome::Invalid("a friendship or request already exists".into());
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::FriendRequest(target)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.graph.send_request(target).await;
        self.dispatch_and_reload(result, epoch, "Failed to send friend request")
            .await
    }

    pub async fn accept_friend_request(&self, request_id: i64) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::FriendAccept(request_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.graph.accept(request_id).await;
        self.dispatch_and_reload(result, epoch, "Failed to accept request")
            .await
    }

    pub async fn unfriend(&self, friend_id: i64) -> Outcome {
        if !self
            .ctx
            .confirm
            .confirm("Are you sure you want to unfriend this user?")
        {
            return Outcome::Declined;
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::Unfriend(friend_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.http.unfriend(friend_id).await;
        self.dispatch_and_reload(result, epoch, "Failed to unfriend")
            .await
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

    pub async fn upload_avatar(&self, image: ImageUpload) -> Outcome {
        if image.bytes.is_empty() {
            self.notices.set_error("Please select a file to upload.");
            return Outcome::Invalid("no file selected".into());
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::AvatarUpload) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.http.upload_avatar(&image).await;
        self.dispatch_and_reload(
            result,
            epoch,
            "Failed to upload profile picture. Please try again.",
        )
        .await
    }

    pub async fn remove_avatar(&self) -> Outcome {
        if !self
            .ctx
            .confirm
            .confirm("Are you sure you want to remove your profile picture?")
        {
            return Outcome::Declined;
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::AvatarRemove) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        let result = self.ctx.http.remove_avatar().await;
        self.dispatch_and_reload(
            result,
            epoch,
            "Failed to delete profile picture. Please try again.",
        )
        .await
    }

    /// Deletes the viewer's account. On success the session is gone and the
    /// caller should return to the login screen.
    pub async fn delete_account(&self) -> Outcome {
        if !self
            .ctx
            .confirm
            .confirm("Are you sure you want to delete your account? This cannot be undone.")
        {
            return Outcome::Declined;
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::AccountDelete) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        match self.ctx.session.delete_account().await {
            Ok(()) => Outcome::Completed,
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to delete profile")
                    .await
            }
        }
    }

    async fn reload(&self, epoch: u64) -> Outcome {
        match self.ctx.http.fetch_profile(self.target).await {
            Ok(payload) => {
                // The viewer and their graph are session truth; they apply
                // even if this view has since been detached.
                self.ctx.session.capture(payload.viewer.clone()).await;
                self.ctx
                    .graph
                    .replace(payload.friends, payload.incoming_requests)
                    .await;
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                let mut state = self.state.lock().await;
                state.profile_user = payload.profile_user.or(Some(payload.viewer));
                state.posts = payload.posts;
                state.loaded = true;
                Outcome::Completed
            }
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Could not load profile.")
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
