//! Canonical wire schema for the social API.
//!
//! The backend has shipped both camelCase and snake_case spellings of the
//! same fields over time; the aliases below absorb that at the network
//! boundary so nothing past this module has to care.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(default, alias = "last_name")]
    pub last_name: Option<String>,
    #[serde(default, alias = "profile_picture")]
    pub profile_picture: Option<String>,
}

impl User {
    /// "First Last (@username)", falling back to the handle alone when the
    /// name parts are absent.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {} (@{})", first, last, self.username),
            (Some(first), None) => format!("{} (@{})", first, self.username),
            _ => format!("@{}", self.username),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub id: Option<i64>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default, alias = "liked_by_user")]
    pub liked_by_user: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default, alias = "liked_by_user")]
    pub liked_by_user: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// One row of the viewer's side of the friendship table. `friended` is false
/// while the request the viewer sent is still pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: i64,
    pub friend: User,
    pub friended: bool,
}

/// A request someone else sent to the viewer. `friended` flips to true once
/// accepted, at which point the same row shows up in `friends`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingRequest {
    pub id: i64,
    pub user: User,
    pub friended: bool,
}

/// Relationship between the viewer and one other user, made explicit instead
/// of being re-derived by array scans at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    None,
    OutgoingPending,
    IncomingPending { request_id: i64 },
    Accepted,
}

impl FriendshipStatus {
    /// Single place the status is computed. Accepted wins over a stale
    /// pending row, outgoing over incoming, matching how the server keeps
    /// the two arrays.
    pub fn derive(user_id: i64, friends: &[Friendship], incoming: &[IncomingRequest]) -> Self {
        if friends.iter().any(|f| f.friend.id == user_id && f.friended) {
            return Self::Accepted;
        }
        if friends.iter().any(|f| f.friend.id == user_id && !f.friended) {
            return Self::OutgoingPending;
        }
        if let Some(request) = incoming.iter().find(|r| r.user.id == user_id && !r.friended) {
            return Self::IncomingPending {
                request_id: request.id,
            };
        }
        Self::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    #[serde(alias = "sender_id")]
    pub sender_id: i64,
    #[serde(default, alias = "receiver_id")]
    pub receiver_id: Option<i64>,
    pub content: String,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// Body returned by both like endpoints: the authoritative count/flag pair
/// after the toggle. Applying it verbatim is the optimistic patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub likes: u32,
    #[serde(alias = "liked_by_user")]
    pub liked_by_user: bool,
}

// ---------- Response envelopes ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub viewer: User,
    #[serde(default, alias = "profile_user")]
    pub profile_user: Option<User>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub friends: Vec<Friendship>,
    #[serde(default, alias = "incoming_requests")]
    pub incoming_requests: Vec<IncomingRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPayload {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersPayload {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPayload {
    #[serde(default)]
    pub messages: Vec<Message>,
}

// ---------- Request bodies ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub content: String,
}

/// Input for creating a post. Goes out as multipart, so this is not a serde
/// type; the optional image rides along as a file part.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub image: Option<ImageUpload>,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageUpload) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
