//! Direct messaging: a friends sidebar plus the conversation with one
//! selected partner.

use tokio::sync::Mutex;

use crate::models::{Friendship, Message};
use crate::notice::Notices;
use crate::sync::{ActionKey, Lifecycle, Outcome};
use crate::view::ViewContext;

#[derive(Default)]
struct ConversationState {
    partner: Option<i64>,
    messages: Vec<Message>,
    loaded: bool,
}

pub struct ConversationView {
    ctx: ViewContext,
    state: Mutex<ConversationState>,
    lifecycle: Lifecycle,
    notices: Notices,
}

impl ConversationView {
    pub(crate) fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(ConversationState::default()),
            lifecycle: Lifecycle::default(),
            notices: Notices::new(),
        }
    }

    pub async fn friends(&self) -> Vec<Friendship> {
        self.ctx.graph.friends().await
    }

    /// Messages of the open conversation, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn partner(&self) -> Option<i64> {
        self.state.lock().await.partner
    }

    pub async fn has_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn detach(&self) {
        self.lifecycle.detach();
    }

    pub async fn refresh_friends(&self) -> Outcome {
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

    /// Switches the open conversation. Messages from the previous partner
    /// are cleared immediately; call [`refresh_messages`] to load the new
    /// ones.
    ///
    /// [`refresh_messages`]: ConversationView::refresh_messages
    pub async fn select_partner(&self, partner: Option<i64>) {
        let mut state = self.state.lock().await;
        state.partner = partner;
        state.messages.clear();
        state.loaded = false;
    }

    pub async fn refresh_messages(&self) -> Outcome {
        let Some(partner) = self.state.lock().await.partner else {
            return Outcome::Completed;
        };
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::MessagesRefresh(partner)) else {
            return Outcome::AlreadyPending;
        };
        self.reload_messages(self.lifecycle.current(), partner).await
    }

    pub async fn send(&self, content: &str) -> Outcome {
        let partner = self.state.lock().await.partner;
        let Some(partner) = partner else {
            return Outcome::Invalid("no conversation selected".into());
        };
        if content.trim().is_empty() {
            return Outcome::Invalid("message cannot be empty".into());
        }
        let Some(_token) = self.ctx.in_flight.claim(ActionKey::MessageSend(partner)) else {
            return Outcome::AlreadyPending;
        };
        let epoch = self.lifecycle.current();
        match self.ctx.http.send_message(partner, content).await {
            // The server assigns id and timestamp, so a reload brings the
            // sent message back in its final form.
            Ok(()) => self.reload_messages(epoch, partner).await,
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to send message")
                    .await
            }
        }
    }

    /// Removes a friendship from the sidebar. If it was the open
    /// conversation, the conversation closes too.
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
        let result = async {
            self.ctx.http.unfriend(friend_id).await?;
            self.ctx.graph.load().await
        }
        .await;
        match result {
            Ok(()) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                let mut state = self.state.lock().await;
                if state.partner == Some(friend_id) {
                    state.partner = None;
                    state.messages.clear();
                    state.loaded = false;
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

    async fn reload_messages(&self, epoch: u64, partner: i64) -> Outcome {
        match self.ctx.http.fetch_conversation(partner).await {
            Ok(payload) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                let mut messages = payload.messages;
                messages.sort_by(|a, b| {
                    a.created_at
                        .cmp(&b.created_at)
                        .then_with(|| a.id.cmp(&b.id))
                });
                let mut state = self.state.lock().await;
                // The partner may have changed while the fetch was out.
                if state.partner != Some(partner) {
                    return Outcome::Discarded;
                }
                state.messages = messages;
                state.loaded = true;
                Outcome::Completed
            }
            Err(error) => {
                if !self.lifecycle.is_current(epoch) {
                    return Outcome::Discarded;
                }
                self.ctx
                    .fail(&self.notices, error, "Failed to load messages")
                    .await
            }
        }
    }
}
