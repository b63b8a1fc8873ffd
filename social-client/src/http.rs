//! Thin typed wrapper over the HTTP API.
//!
//! One method per endpoint, no state beyond the cookie jar. Everything above
//! this layer works with the types from [`crate::models`] and never sees a
//! raw status code.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{
    CommentBody, ConversationPayload, FeedPayload, ImageUpload, LikeState, LoginRequest,
    MessageBody, PostDraft, PostUpdate, ProfilePayload, SignupRequest, UsersPayload,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error body the backend sends on 4xx/5xx: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw)
            .map_err(|e| ApiError::Config(format!("invalid base URL {:?}: {}", raw, e)))?;

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session cookie as a `Cookie` header value, if one is set. Lets an
    /// embedding program persist the session across runs.
    pub fn session_cookie(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|v| v.to_str().map(str::to_owned).ok())
    }

    /// Re-injects a cookie string previously taken from [`session_cookie`].
    ///
    /// [`session_cookie`]: HttpClient::session_cookie
    pub fn restore_session(&self, cookie: &str) {
        for part in cookie.split("; ") {
            if !part.is_empty() {
                self.jar.add_cookie_str(part, &self.base_url);
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn error_from(response: Response) -> ApiError {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::NOT_FOUND => ApiError::NotFound,
            _ => {
                let message = response
                    .json::<ErrorBody>()
                    .await
                    .map(|body| body.error)
                    .unwrap_or_else(|_| format!("request failed with status {}", status));
                ApiError::Request {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn ok(response: Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    // ---------- Session ----------

    pub async fn signup(&self, body: &SignupRequest) -> Result<(), ApiError> {
        tracing::debug!(username = %body.username, "signing up");
        let response = self
            .client
            .post(self.url("/api/signup"))
            .json(body)
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn login(&self, body: &LoginRequest) -> Result<(), ApiError> {
        tracing::debug!(email = %body.email, "logging in");
        let response = self
            .client
            .post(self.url("/api/login"))
            .json(body)
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self.client.post(self.url("/api/logout")).send().await?;
        Self::ok(response).await
    }

    // ---------- Profile ----------

    pub async fn fetch_profile(&self, user_id: Option<i64>) -> Result<ProfilePayload, ApiError> {
        tracing::debug!(?user_id, "fetching profile");
        let mut request = self.client.get(self.url("/api/profile"));
        if let Some(id) = user_id {
            request = request.query(&[("id", id)]);
        }
        Self::json(request.send().await?).await
    }

    pub async fn upload_avatar(&self, image: &ImageUpload) -> Result<(), ApiError> {
        let part = multipart::Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
        let form = multipart::Form::new().part("profilePicture", part);
        let response = self
            .client
            .post(self.url("/api/profile/picture"))
            .multipart(form)
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn remove_avatar(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url("/api/profile/picture"))
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn delete_account(&self) -> Result<(), ApiError> {
        let response = self.client.delete(self.url("/api/profile")).send().await?;
        Self::ok(response).await
    }

    // ---------- Friends ----------

    pub async fn send_friend_request(&self, user_id: i64) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/api/profile/{}", user_id)))
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn accept_friend_request(&self, request_id: i64) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/api/profile/accept/{}", request_id)))
            .send()
            .await?;
        Self::ok(response).await
    }

    /// The path segment is the friend's user id, not the friendship row id.
    pub async fn unfriend(&self, friend_id: i64) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/profile/unfriend/{}", friend_id)))
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn fetch_users(&self) -> Result<UsersPayload, ApiError> {
        tracing::debug!("fetching user directory");
        let response = self.client.get(self.url("/api/users")).send().await?;
        Self::json(response).await
    }

    // ---------- Posts ----------

    pub async fn fetch_feed(&self) -> Result<FeedPayload, ApiError> {
        tracing::debug!("fetching feed");
        let response = self.client.get(self.url("/api/content")).send().await?;
        Self::json(response).await
    }

    pub async fn create_post(&self, draft: &PostDraft) -> Result<(), ApiError> {
        tracing::debug!(title = %draft.title, "creating post");
        let mut form = multipart::Form::new()
            .text("title", draft.title.clone())
            .text("content", draft.content.clone());
        if let Some(image) = &draft.image {
            let part =
                multipart::Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
            form = form.part("image", part);
        }
        let response = self
            .client
            .post(self.url("/api/content"))
            .multipart(form)
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn update_post(&self, post_id: i64, update: &PostUpdate) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(&format!("/api/content/{}", post_id)))
            .json(update)
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn delete_post(&self, post_id: i64) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/content/{}", post_id)))
            .send()
            .await?;
        Self::ok(response).await
    }

    /// Returns the post's like count and viewer flag after the toggle.
    pub async fn toggle_post_like(&self, post_id: i64) -> Result<LikeState, ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/api/content/{}/like", post_id)))
            .send()
            .await?;
        Self::json(response).await
    }

    // ---------- Comments ----------

    pub async fn add_comment(&self, post_id: i64, content: &str) -> Result<(), ApiError> {
        let body = CommentBody {
            content: content.to_owned(),
        };
        let response = self
            .client
            .post(self.url(&format!("/api/content/{}/comment", post_id)))
            .json(&body)
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn delete_comment(&self, post_id: i64, comment_id: i64) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/content/{}/comment/{}", post_id, comment_id)))
            .send()
            .await?;
        Self::ok(response).await
    }

    pub async fn toggle_comment_like(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<LikeState, ApiError> {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/content/{}/comment/{}/like",
                post_id, comment_id
            )))
            .send()
            .await?;
        Self::json(response).await
    }

    // ---------- Messages ----------

    pub async fn fetch_conversation(
        &self,
        friend_id: i64,
    ) -> Result<ConversationPayload, ApiError> {
        tracing::debug!(friend_id, "fetching conversation");
        let response = self
            .client
            .get(self.url(&format!("/api/message/{}", friend_id)))
            .send()
            .await?;
        Self::json(response).await
    }

    pub async fn send_message(&self, friend_id: i64, content: &str) -> Result<(), ApiError> {
        let body = MessageBody {
            content: content.to_owned(),
        };
        let response = self
            .client
            .post(self.url(&format!("/api/message/{}", friend_id)))
            .json(&body)
            .send()
            .await?;
        Self::ok(response).await
    }
}
