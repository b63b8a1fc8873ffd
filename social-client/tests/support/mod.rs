//! In-process stub of the social API for integration tests.
//!
//! Cookie-authenticated like the real backend, with per-endpoint hit
//! counters so tests can assert that an action did (or did not) reach the
//! network, and optional response delays for exercising the in-flight
//! guard and detachment.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use social_client::models::{Comment, Friendship, Image, IncomingRequest, Message, Post, User};

const SESSION: &str = "sid=stub-session";

#[derive(Default)]
pub struct Hits {
    pub feed_gets: AtomicUsize,
    pub profile_gets: AtomicUsize,
    pub content_posts: AtomicUsize,
    pub post_deletes: AtomicUsize,
    pub like_posts: AtomicUsize,
    pub comment_posts: AtomicUsize,
    pub friend_requests: AtomicUsize,
    pub accepts: AtomicUsize,
    pub unfriends: AtomicUsize,
    pub message_posts: AtomicUsize,
    pub account_deletes: AtomicUsize,
}

struct ServerState {
    authed: Mutex<bool>,
    viewer: Mutex<User>,
    directory: Mutex<Vec<User>>,
    posts: Mutex<Vec<Post>>,
    friends: Mutex<Vec<Friendship>>,
    incoming: Mutex<Vec<IncomingRequest>>,
    messages: Mutex<HashMap<i64, Vec<Message>>>,
    next_id: AtomicI64,
    hits: Hits,
    like_delay: Mutex<Option<Duration>>,
    feed_delay: Mutex<Option<Duration>>,
    message_delay: Mutex<Option<Duration>>,
    friend_request_delay: Mutex<Option<Duration>>,
    fail_feed: AtomicBool,
    fail_users: AtomicBool,
}

impl ServerState {
    fn new() -> Self {
        Self {
            authed: Mutex::new(false),
            viewer: Mutex::new(user(1, "viewer")),
            directory: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            friends: Mutex::new(Vec::new()),
            incoming: Mutex::new(Vec::new()),
            messages: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1000),
            hits: Hits::default(),
            like_delay: Mutex::new(None),
            feed_delay: Mutex::new(None),
            message_delay: Mutex::new(None),
            friend_request_delay: Mutex::new(None),
            fail_feed: AtomicBool::new(false),
            fail_users: AtomicBool::new(false),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn require_auth(&self, headers: &HeaderMap) -> Result<(), Response> {
        let cookie = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if *self.authed.lock().unwrap() && cookie.contains(SESSION) {
            Ok(())
        } else {
            Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Not authenticated",
            ))
        }
    }

    fn find_user(&self, id: i64) -> Option<User> {
        if let Some(found) = self
            .directory
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
        {
            return Some(found);
        }
        if let Some(found) = self
            .friends
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.friend.id == id)
            .map(|f| f.friend.clone())
        {
            return Some(found);
        }
        self.incoming
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone())
    }
}

pub fn user(id: i64, username: &str) -> User {
    User {
        id,
        username: username.to_owned(),
        email: Some(format!("{}@example.com", username)),
        first_name: Some(username.to_owned()),
        last_name: Some("Tester".to_owned()),
        profile_picture: None,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Handle to the running stub: its address, state seeds, and hit counters.
pub struct Backend {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl Backend {
    pub async fn start() -> Backend {
        let state = Arc::new(ServerState::new());
        let app = Router::new()
            .route("/api/signup", post(signup))
            .route("/api/login", post(login))
            .route("/api/logout", post(logout))
            .route("/api/profile", get(profile).delete(delete_account))
            .route(
                "/api/profile/picture",
                post(upload_avatar).delete(remove_avatar),
            )
            .route("/api/profile/accept/{id}", post(accept_request))
            .route("/api/profile/unfriend/{id}", delete(unfriend))
            .route("/api/profile/{id}", post(send_request))
            .route("/api/users", get(users))
            .route("/api/content", get(feed).post(create_post))
            .route("/api/content/{id}", put(update_post).delete(delete_post))
            .route("/api/content/{id}/like", post(like_post))
            .route("/api/content/{id}/comment", post(add_comment))
            .route("/api/content/{id}/comment/{cid}", delete(delete_comment))
            .route("/api/content/{id}/comment/{cid}/like", post(like_comment))
            .route("/api/message/{id}", get(conversation).post(send_message))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Backend { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> &Hits {
        &self.state.hits
    }

    // ---------- Seeds ----------

    pub fn seed_post(&self, title: &str, content: &str, likes: u32, liked: bool) -> i64 {
        let id = self.state.next_id();
        self.state.posts.lock().unwrap().push(Post {
            id,
            title: title.to_owned(),
            content: content.to_owned(),
            author: Some(self.state.viewer.lock().unwrap().clone()),
            images: Vec::new(),
            created_at: Utc::now(),
            likes,
            liked_by_user: liked,
            comments: Vec::new(),
        });
        id
    }

    pub fn seed_comment(&self, post_id: i64, content: &str) -> i64 {
        let id = self.state.next_id();
        let mut posts = self.state.posts.lock().unwrap();
        let post = posts.iter_mut().find(|p| p.id == post_id).unwrap();
        post.comments.push(Comment {
            id,
            content: content.to_owned(),
            author: Some(user(2, "commenter")),
            created_at: Utc::now(),
            likes: 0,
            liked_by_user: false,
        });
        id
    }

    pub fn seed_directory_user(&self, id: i64, username: &str) {
        self.state.directory.lock().unwrap().push(user(id, username));
    }

    pub fn seed_friend(&self, user_id: i64, username: &str) -> i64 {
        let id = self.state.next_id();
        self.state.friends.lock().unwrap().push(Friendship {
            id,
            friend: user(user_id, username),
            friended: true,
        });
        id
    }

    pub fn seed_incoming_request(&self, request_id: i64, user_id: i64, username: &str) {
        self.state.incoming.lock().unwrap().push(IncomingRequest {
            id: request_id,
            user: user(user_id, username),
            friended: false,
        });
    }

    pub fn seed_message(
        &self,
        friend_id: i64,
        sender_id: i64,
        content: &str,
        at: DateTime<Utc>,
    ) -> i64 {
        let id = self.state.next_id();
        self.state
            .messages
            .lock()
            .unwrap()
            .entry(friend_id)
            .or_default()
            .push(Message {
                id,
                sender_id,
                receiver_id: Some(if sender_id == friend_id { 1 } else { friend_id }),
                content: content.to_owned(),
                created_at: at,
            });
        id
    }

    // ---------- Knobs and probes ----------

    pub fn set_like_delay(&self, delay: Duration) {
        *self.state.like_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_feed_delay(&self, delay: Duration) {
        *self.state.feed_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_message_delay(&self, delay: Duration) {
        *self.state.message_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_friend_request_delay(&self, delay: Duration) {
        *self.state.friend_request_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_next_feed(&self) {
        self.state.fail_feed.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_users(&self) {
        self.state.fail_users.store(true, Ordering::SeqCst);
    }

    /// Expires the session server-side, as if it timed out between requests.
    pub fn force_logout(&self) {
        *self.state.authed.lock().unwrap() = false;
    }

    pub fn post_like_state(&self, post_id: i64) -> (u32, bool) {
        let posts = self.state.posts.lock().unwrap();
        let post = posts.iter().find(|p| p.id == post_id).unwrap();
        (post.likes, post.liked_by_user)
    }

    pub fn has_friendship_with(&self, user_id: i64) -> bool {
        self.state
            .friends
            .lock()
            .unwrap()
            .iter()
            .any(|f| f.friend.id == user_id)
    }

    pub fn viewer_avatar(&self) -> Option<String> {
        self.state.viewer.lock().unwrap().profile_picture.clone()
    }
}

// ---------- Handlers ----------

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Arc<ServerState>>, Json(body): Json<LoginBody>) -> Response {
    if body.password == "wrong" {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let _ = body.email;
    *state.authed.lock().unwrap() = true;
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{}; Path=/", SESSION))],
        Json(json!({})),
    )
        .into_response()
}

async fn signup(Json(body): Json<serde_json::Value>) -> Response {
    for field in ["username", "email", "password", "firstName", "lastName"] {
        if body.get(field).and_then(|v| v.as_str()).is_none() {
            return error_response(StatusCode::BAD_REQUEST, "Missing field");
        }
    }
    (StatusCode::CREATED, Json(json!({}))).into_response()
}

async fn logout(State(state): State<Arc<ServerState>>) -> Response {
    *state.authed.lock().unwrap() = false;
    Json(json!({})).into_response()
}

#[derive(Deserialize)]
struct ProfileQuery {
    id: Option<i64>,
}

async fn profile(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ProfileQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.hits.profile_gets.fetch_add(1, Ordering::SeqCst);

    let viewer = state.viewer.lock().unwrap().clone();
    let profile_user = match query.id {
        Some(id) if id != viewer.id => match state.find_user(id) {
            Some(found) => found,
            None => return error_response(StatusCode::NOT_FOUND, "No such user"),
        },
        _ => viewer.clone(),
    };
    let posts = state.posts.lock().unwrap().clone();
    let friends = state.friends.lock().unwrap().clone();
    let incoming = state.incoming.lock().unwrap().clone();

    Json(json!({
        "viewer": viewer,
        "profileUser": profile_user,
        "posts": posts,
        "friends": friends,
        "incomingRequests": incoming,
    }))
    .into_response()
}

async fn delete_account(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.hits.account_deletes.fetch_add(1, Ordering::SeqCst);
    *state.authed.lock().unwrap() = false;
    Json(json!({})).into_response()
}

async fn upload_avatar(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_owned();
        if name == "profilePicture" {
            let file_name = field.file_name().unwrap_or("avatar").to_owned();
            let _ = field.bytes().await.unwrap();
            state.viewer.lock().unwrap().profile_picture =
                Some(format!("https://cdn.example.com/{}", file_name));
        }
    }
    Json(json!({})).into_response()
}

async fn remove_avatar(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.viewer.lock().unwrap().profile_picture = None;
    Json(json!({})).into_response()
}

async fn send_request(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    let delay = *state.friend_request_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    state.hits.friend_requests.fetch_add(1, Ordering::SeqCst);
    let Some(target) = state.find_user(id) else {
        return error_response(StatusCode::NOT_FOUND, "No such user");
    };
    let row_id = state.next_id();
    state.friends.lock().unwrap().push(Friendship {
        id: row_id,
        friend: target,
        friended: false,
    });
    (StatusCode::CREATED, Json(json!({}))).into_response()
}

async fn accept_request(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.hits.accepts.fetch_add(1, Ordering::SeqCst);
    let mut incoming = state.incoming.lock().unwrap();
    let Some(pos) = incoming.iter().position(|r| r.id == id) else {
        return error_response(StatusCode::NOT_FOUND, "No such request");
    };
    let request = incoming.remove(pos);
    state.friends.lock().unwrap().push(Friendship {
        id: request.id,
        friend: request.user,
        friended: true,
    });
    Json(json!({})).into_response()
}

async fn unfriend(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.hits.unfriends.fetch_add(1, Ordering::SeqCst);
    state.friends.lock().unwrap().retain(|f| f.friend.id != id);
    Json(json!({})).into_response()
}

async fn users(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    if state.fail_users.swap(false, Ordering::SeqCst) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Directory backend down");
    }
    // Older payload shape: snake_case spellings, which the client's schema
    // aliases must absorb.
    let users: Vec<serde_json::Value> = state
        .directory
        .lock()
        .unwrap()
        .iter()
        .map(|u| {
            json!({
                "id": u.id,
                "username": u.username,
                "first_name": u.first_name,
                "last_name": u.last_name,
                "profile_picture": u.profile_picture,
            })
        })
        .collect();
    Json(json!({ "users": users })).into_response()
}

async fn feed(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    let delay = *state.feed_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    state.hits.feed_gets.fetch_add(1, Ordering::SeqCst);
    if state.fail_feed.swap(false, Ordering::SeqCst) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Feed backend down");
    }
    let posts = state.posts.lock().unwrap().clone();
    let viewer = state.viewer.lock().unwrap().clone();
    Json(json!({ "posts": posts, "user": viewer })).into_response()
}

async fn create_post(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.hits.content_posts.fetch_add(1, Ordering::SeqCst);

    let mut title = String::new();
    let mut content = String::new();
    let mut images = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_owned();
        match name.as_str() {
            "title" => title = field.text().await.unwrap(),
            "content" => content = field.text().await.unwrap(),
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let _ = field.bytes().await.unwrap();
                images.push(Image {
                    id: Some(state.next_id()),
                    url: format!("https://cdn.example.com/{}", file_name),
                });
            }
            _ => {}
        }
    }
    if title.is_empty() || content.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Title and content are required");
    }

    let post = Post {
        id: state.next_id(),
        title,
        content,
        author: Some(state.viewer.lock().unwrap().clone()),
        images,
        created_at: Utc::now(),
        likes: 0,
        liked_by_user: false,
        comments: Vec::new(),
    };
    state.posts.lock().unwrap().push(post);
    (StatusCode::CREATED, Json(json!({}))).into_response()
}

#[derive(Deserialize)]
struct UpdateBody {
    title: Option<String>,
    content: Option<String>,
}

async fn update_post(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    let mut posts = state.posts.lock().unwrap();
    let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
        return error_response(StatusCode::NOT_FOUND, "No such post");
    };
    if let Some(title) = body.title {
        post.title = title;
    }
    if let Some(content) = body.content {
        post.content = content;
    }
    Json(json!({})).into_response()
}

async fn delete_post(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.hits.post_deletes.fetch_add(1, Ordering::SeqCst);
    state.posts.lock().unwrap().retain(|p| p.id != id);
    Json(json!({})).into_response()
}

async fn like_post(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    let delay = *state.like_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    state.hits.like_posts.fetch_add(1, Ordering::SeqCst);

    let mut posts = state.posts.lock().unwrap();
    let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
        return error_response(StatusCode::NOT_FOUND, "No such post");
    };
    if post.liked_by_user {
        post.liked_by_user = false;
        post.likes -= 1;
    } else {
        post.liked_by_user = true;
        post.likes += 1;
    }
    Json(json!({ "likes": post.likes, "likedByUser": post.liked_by_user })).into_response()
}

#[derive(Deserialize)]
struct CommentBody {
    content: String,
}

async fn add_comment(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<CommentBody>,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.hits.comment_posts.fetch_add(1, Ordering::SeqCst);
    let comment = Comment {
        id: state.next_id(),
        content: body.content,
        author: Some(state.viewer.lock().unwrap().clone()),
        created_at: Utc::now(),
        likes: 0,
        liked_by_user: false,
    };
    let mut posts = state.posts.lock().unwrap();
    let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
        return error_response(StatusCode::NOT_FOUND, "No such post");
    };
    post.comments.push(comment);
    (StatusCode::CREATED, Json(json!({}))).into_response()
}

async fn delete_comment(
    State(state): State<Arc<ServerState>>,
    Path((id, cid)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    let mut posts = state.posts.lock().unwrap();
    let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
        return error_response(StatusCode::NOT_FOUND, "No such post");
    };
    post.comments.retain(|c| c.id != cid);
    Json(json!({})).into_response()
}

async fn like_comment(
    State(state): State<Arc<ServerState>>,
    Path((id, cid)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    let mut posts = state.posts.lock().unwrap();
    let Some(comment) = posts
        .iter_mut()
        .find(|p| p.id == id)
        .and_then(|p| p.comments.iter_mut().find(|c| c.id == cid))
    else {
        return error_response(StatusCode::NOT_FOUND, "No such comment");
    };
    if comment.liked_by_user {
        comment.liked_by_user = false;
        comment.likes -= 1;
    } else {
        comment.liked_by_user = true;
        comment.likes += 1;
    }
    Json(json!({ "likes": comment.likes, "likedByUser": comment.liked_by_user })).into_response()
}

async fn conversation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    let delay = *state.message_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let messages = state
        .messages
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .unwrap_or_default();
    Json(json!({ "messages": messages })).into_response()
}

#[derive(Deserialize)]
struct MessageBody {
    content: String,
}

async fn send_message(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<MessageBody>,
) -> Response {
    if let Err(resp) = state.require_auth(&headers) {
        return resp;
    }
    state.hits.message_posts.fetch_add(1, Ordering::SeqCst);
    let message = Message {
        id: state.next_id(),
        sender_id: state.viewer.lock().unwrap().id,
        receiver_id: Some(id),
        content: body.content,
        created_at: Utc::now(),
    };
    state.messages.lock().unwrap().entry(id).or_default().push(message);
    (StatusCode::CREATED, Json(json!({}))).into_response()
}

// ---------- Test-side helpers ----------

/// Fresh client logged in as the stub's viewer (user id 1).
pub async fn logged_in(backend: &Backend) -> social_client::SocialClient {
    let client = social_client::SocialClient::new(backend.url()).expect("client");
    client
        .session()
        .login("viewer@example.com", "secret")
        .await
        .expect("login");
    client
}

/// Declines every prompt, for asserting that nothing goes out.
pub struct DeclineAll;

impl social_client::Confirm for DeclineAll {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}
