//! Transient user-facing banners.
//!
//! One error slot and one success slot per view. Setting a notice while one
//! is showing replaces it and restarts the clock, so a slow older banner can
//! never blank out a newer one. Expiry is checked on read; there are no
//! background tasks to clean up.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// How long a success banner stays up.
pub const SUCCESS_TTL: Duration = Duration::from_secs(3);
/// Error banners linger a little longer.
pub const ERROR_TTL: Duration = Duration::from_secs(5);

struct TimedNotice {
    text: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct Notices {
    error: Mutex<Option<TimedNotice>>,
    success: Mutex<Option<TimedNotice>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(%text, "error notice");
        Self::put(&self.error, text, ERROR_TTL);
    }

    pub fn set_success(&self, text: impl Into<String>) {
        Self::put(&self.success, text.into(), SUCCESS_TTL);
    }

    /// Current error banner, if it has not timed out.
    pub fn error(&self) -> Option<String> {
        Self::read(&self.error)
    }

    /// Current success banner, if it has not timed out.
    pub fn success(&self) -> Option<String> {
        Self::read(&self.success)
    }

    pub fn dismiss_error(&self) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn dismiss_success(&self) {
        *self.success.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn put(slot: &Mutex<Option<TimedNotice>>, text: String, ttl: Duration) {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(TimedNotice {
            text,
            expires_at: Instant::now() + ttl,
        });
    }

    fn read(slot: &Mutex<Option<TimedNotice>>) -> Option<String> {
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        match &*guard {
            Some(notice) if Instant::now() < notice.expires_at => Some(notice.text.clone()),
            Some(_) => {
                *guard = None;
                None
            }
            None => None,
        }
    }
}
