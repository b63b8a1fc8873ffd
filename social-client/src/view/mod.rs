//! View components, one per screen of the client.
//!
//! Each view instance owns its local collection state, its banners, and a
//! detachment lifecycle. Session identity and the friend graph are shared
//! and injected. The rule for late responses: writes to the shared stores
//! always apply (they carry fresh server truth), while view-local state and
//! banners are dropped once the view has been detached.

mod conversation;
mod feed;
mod friends;
mod profile;

pub use conversation::ConversationView;
pub use feed::FeedView;
pub use friends::FriendsView;
pub use profile::ProfileView;

use std::sync::Arc;

use crate::error::ApiError;
use crate::graph::FriendGraph;
use crate::http::HttpClient;
use crate::notice::Notices;
use crate::session::Session;
use crate::sync::{Confirm, InFlight, Outcome};

/// Everything a view needs that it does not own itself.
#[derive(Clone)]
pub(crate) struct ViewContext {
    pub(crate) http: Arc<HttpClient>,
    pub(crate) session: Arc<Session>,
    pub(crate) graph: Arc<FriendGraph>,
    pub(crate) in_flight: InFlight,
    pub(crate) confirm: Arc<dyn Confirm>,
}

impl ViewContext {
    /// Common failure tail. A 401 kills the session and asks for login;
    /// anything else lands in the error banner, preferring the server's
    /// message over the action's fallback text.
    pub(crate) async fn fail(
        &self,
        notices: &Notices,
        error: ApiError,
        fallback: &str,
    ) -> Outcome {
        if error.is_unauthorized() {
            self.session.invalidate().await;
            return Outcome::NeedsLogin;
        }
        tracing::warn!(%error, "request failed");
        let message = match &error {
            ApiError::Request { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_owned(),
        };
        notices.set_error(message);
        Outcome::Failed
    }
}
