//! Client library for the social API.
//!
//! One [`SocialClient`] holds the session, the cookie jar, and the shared
//! friend graph; screens are driven through view objects created from it.
//! All state synchronization semantics live here so every frontend (the
//! bundled CLI, or anything else) behaves the same way.

pub mod error;
pub mod models;
pub mod notice;
pub mod session;
pub mod view;

mod graph;
mod http;
mod sync;

pub use error::ApiError;
pub use notice::Notices;
pub use session::{Session, SessionState};
pub use sync::{AlwaysConfirm, Confirm, Outcome};
pub use view::{ConversationView, FeedView, FriendsView, ProfileView};

use std::sync::Arc;

use graph::FriendGraph;
use http::HttpClient;
use sync::InFlight;
use view::ViewContext;

/// Unified client: one session, one friend graph, views created per screen.
#[derive(Clone)]
pub struct SocialClient {
    http: Arc<HttpClient>,
    session: Arc<Session>,
    graph: Arc<FriendGraph>,
    in_flight: InFlight,
    confirm: Arc<dyn Confirm>,
}

impl SocialClient {
    /// Creates a client against the given API base URL. Destructive actions
    /// are auto-approved; install a prompter with [`with_confirm`] to ask
    /// the user instead.
    ///
    /// [`with_confirm`]: SocialClient::with_confirm
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_confirm(base_url, Arc::new(AlwaysConfirm))
    }

    pub fn with_confirm(
        base_url: impl Into<String>,
        confirm: Arc<dyn Confirm>,
    ) -> Result<Self, ApiError> {
        let http = Arc::new(HttpClient::new(base_url)?);
        let session = Arc::new(Session::new(Arc::clone(&http)));
        let graph = Arc::new(FriendGraph::new(Arc::clone(&http), Arc::clone(&session)));
        Ok(Self {
            http,
            session,
            graph,
            in_flight: InFlight::new(),
            confirm,
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url().as_str()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current session cookie, for persisting the login across runs.
    pub fn session_cookie(&self) -> Option<String> {
        self.http.session_cookie()
    }

    /// Restores a cookie previously taken from [`session_cookie`].
    ///
    /// [`session_cookie`]: SocialClient::session_cookie
    pub fn restore_session(&self, cookie: &str) {
        self.http.restore_session(cookie);
    }

    /// A fresh feed view. Every call is a new mount with empty local state.
    pub fn feed(&self) -> FeedView {
        FeedView::new(self.context())
    }

    pub fn friends(&self) -> FriendsView {
        FriendsView::new(self.context())
    }

    /// Profile view for another user, or the viewer's own page when
    /// `user_id` is `None`.
    pub fn profile(&self, user_id: Option<i64>) -> ProfileView {
        ProfileView::new(self.context(), user_id)
    }

    pub fn conversation(&self) -> ConversationView {
        ConversationView::new(self.context())
    }

    fn context(&self) -> ViewContext {
        ViewContext {
            http: Arc::clone(&self.http),
            session: Arc::clone(&self.session),
            graph: Arc::clone(&self.graph),
            in_flight: self.in_flight.clone(),
            confirm: Arc::clone(&self.confirm),
        }
    }
}
