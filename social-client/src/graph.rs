//! Session-scoped friend graph.
//!
//! Friends, incoming requests, and the user directory live here once,
//! injected into every view that shows them, instead of each view keeping
//! its own copy of the same lists.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::models::{Friendship, FriendshipStatus, IncomingRequest, User};
use crate::session::Session;

#[derive(Default)]
struct GraphState {
    friends: Vec<Friendship>,
    incoming: Vec<IncomingRequest>,
    directory: Vec<User>,
    loaded: bool,
}

pub(crate) struct FriendGraph {
    http: Arc<HttpClient>,
    session: Arc<Session>,
    state: Mutex<GraphState>,
}

impl FriendGraph {
    pub(crate) fn new(http: Arc<HttpClient>, session: Arc<Session>) -> Self {
        Self {
            http,
            session,
            state: Mutex::new(GraphState::default()),
        }
    }

    /// Replaces the graph from a fresh profile payload and captures the
    /// viewer that rides along.
    pub(crate) async fn load(&self) -> Result<(), ApiError> {
        let payload = self.http.fetch_profile(None).await?;
        self.session.capture(payload.viewer).await;
        self.replace(payload.friends, payload.incoming_requests)
            .await;
        Ok(())
    }

    /// The profile view fetches with a target id but still receives the
    /// viewer's own graph alongside; it hands the lists over here.
    pub(crate) async fn replace(&self, friends: Vec<Friendship>, incoming: Vec<IncomingRequest>) {
        let mut state = self.state.lock().await;
        state.friends = friends;
        state.incoming = incoming;
        state.loaded = true;
    }

    pub(crate) async fn load_directory(&self) -> Result<(), ApiError> {
        let payload = self.http.fetch_users().await?;
        self.state.lock().await.directory = payload.users;
        Ok(())
    }

    pub(crate) async fn send_request(&self, user_id: i64) -> Result<(), ApiError> {
        self.http.send_friend_request(user_id).await?;
        // Dropping the row from the directory is what marks it "sent".
        self.state.lock().await.directory.retain(|u| u.id != user_id);
        Ok(())
    }

    pub(crate) async fn accept(&self, request_id: i64) -> Result<(), ApiError> {
        self.http.accept_friend_request(request_id).await?;
        let mut state = self.state.lock().await;
        if let Some(pos) = state.incoming.iter().position(|r| r.id == request_id) {
            let request = state.incoming.remove(pos);
            // The request row becomes the friendship row server-side, so its
            // id is the right local stand-in until the next full fetch.
            state.friends.push(Friendship {
                id: request.id,
                friend: request.user,
                friended: true,
            });
        }
        Ok(())
    }

    /// Ends a friendship, addressed by the friend's user id.
    pub(crate) async fn unfriend(&self, friend_id: i64) -> Result<(), ApiError> {
        self.http.unfriend(friend_id).await?;
        self.state
            .lock()
            .await
            .friends
            .retain(|f| f.friend.id != friend_id);
        Ok(())
    }

    pub(crate) async fn friends(&self) -> Vec<Friendship> {
        self.state.lock().await.friends.clone()
    }

    pub(crate) async fn incoming(&self) -> Vec<IncomingRequest> {
        self.state.lock().await.incoming.clone()
    }

    pub(crate) async fn directory(&self) -> Vec<User> {
        self.state.lock().await.directory.clone()
    }

    pub(crate) async fn loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    /// The one place friendship status is derived from the two lists.
    pub(crate) async fn status(&self, user_id: i64) -> FriendshipStatus {
        let state = self.state.lock().await;
        FriendshipStatus::derive(user_id, &state.friends, &state.incoming)
    }
}
