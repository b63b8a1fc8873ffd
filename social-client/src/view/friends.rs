//! Friends screen: the viewer's friends, incoming requests, and the user
//! directory for finding new people.
//!
//! Friend mutations here patch the shared graph locally instead of
//! reloading; the next full fetch reconciles with the server.

use crate::models::{Friendship, IncomingRequest, User};
use crate::notice::Notices;
use crate::sync::{ActionKey, Lifecycle, Outcome};
use crate::view::ViewContext;

pub struct FriendsView {
    ctx: ViewContext,
    lifecycle: Lifecycle,
    notices: Notices,
}

impl FriendsView {
    pub(crate) fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            lifecycle: Lifecycle::default(),
            notices: Notices::new(),
        }
    }

    pub async fn friends(&self) -> Vec<Friendship> {
        self.ctx.graph.friends().await
    }

    pub async fn incoming_requests(&self) -> Vec<IncomingRequest> {
        self.ctx.graph.incoming().await
    }

    /// Directory entries whose username contains the search text,
    /// case-insensitively. An empty search matches everyone.
    pub async fn find_users(&self, search: &str) -> Vec<User> {
        let needle = search.to_lowercase();
        self.ctx
            .graph
            .directory()
            .await
            .into_iter()
            .filter(|user| user.username.to_lowercase().contains(&needle))
            .collect()
    }

    pub async fn has_loaded(&self) -> bool {
        self.ctx.graph.loaded().await
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn detach(&self) {
        self.lifecycle.detach();
    }

    pub async fn refresh(&self) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::FriendsRefresh) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        match self.ctx.graph.load().await {
            Ok(()) => Outcome::Completed,
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to load friends")
                    .await
            }
        }
    }

    /// Loads the user directory. Failures here are deliberately quiet: the
    /// search box just stays empty. A 401 still ends the session.
    pub async fn refresh_directory(&self) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::DirectoryRefresh) else {
            return Outcome::AlreadyPending;
        };
        match self.ctx.graph.load_directory().await {
            Ok(()) => Outcome::Completed,
            Err(error) if error.is_unauthorized() => {
                self.ctx.session.invalidate().await;
                Outcome::NeedsLogin
            }
            Err(error) => {
                tracing::debug!(%error, "user directory load failed");
                Outcome::Failed
            }
        }
    }

    pub async fn send_request(&self, user_id: i64) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::FriendRequest(user_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        match self.ctx.graph.send_request(user_id).await {
            Ok(()) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.notices.dismiss_error();
                self.notices.set_success("Friend request sent successfully!");
                Outcome::Completed
            }
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to send friend request")
                    .await
            }
        }
    }

    pub async fn accept_request(&self, request_id: i64) -> Outcome {
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::FriendAccept(request_id)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        match self.ctx.graph.accept(request_id).await {
            Ok(()) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.notices.dismiss_error();
                self.notices
                    .set_success("Friend request accepted successfully!");
                Outcome::Completed
            }
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to accept friend request")
                    .await
            }
        }
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
        match self.ctx.graph.unfriend(friend_id).await {
            Ok(()) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                Outcome::Completed
            }
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to unfriend")
                    .await
            }
        }
    }
}
