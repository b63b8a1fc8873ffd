//! Machinery shared by every view: action outcomes, the per-item in-flight
//! guard, confirmation prompts, and view lifecycle tracking.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// How a user action ended.
///
/// Failures never propagate out of a view as errors; they end here, with the
/// banner already set where one applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action ran and local state was updated.
    Completed,
    /// The same action on the same target is still in flight; nothing was
    /// sent.
    AlreadyPending,
    /// The confirmation prompt was declined; nothing was sent.
    Declined,
    /// Local validation failed; nothing was sent. Carries the reason for
    /// callers that want to show it.
    Invalid(String),
    /// A request came back 401. The session has been marked gone; send the
    /// user to the login screen.
    NeedsLogin,
    /// The request failed. An error banner was set (where the action shows
    /// one) and prior state was kept.
    Failed,
    /// The view was detached before the response arrived; the result was
    /// dropped.
    Discarded,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

/// Seam for destructive-action prompts. Deletions ask before any request
/// goes out; declining aborts silently.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Approves every prompt. The default when no prompter is installed.
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Identity of a mutating action for the in-flight guard. Two attempts with
/// the same key cannot overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ActionKey {
    FeedRefresh,
    ProfileRefresh,
    FriendsRefresh,
    DirectoryRefresh,
    MessagesRefresh(i64),
    PostCreate,
    PostSave(i64),
    PostDelete(i64),
    PostLike(i64),
    CommentCreate(i64),
    CommentDelete(i64),
    CommentLike(i64),
    FriendRequest(i64),
    FriendAccept(i64),
    Unfriend(i64),
    MessageSend(i64),
    AvatarUpload,
    AvatarRemove,
    AccountDelete,
}

/// Set of actions currently in flight, shared across all views of one
/// client so the guard holds no matter which view dispatched first.
#[derive(Clone, Default)]
pub(crate) struct InFlight {
    keys: Arc<Mutex<HashSet<ActionKey>>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claims the key for the duration of the returned token's lifetime, or
    /// `None` when the same action is already running.
    pub(crate) fn claim(&self, key: ActionKey) -> Option<InFlightToken> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if keys.insert(key) {
            Some(InFlightToken {
                keys: Arc::clone(&self.keys),
                key,
            })
        } else {
            tracing::debug!(?key, "action already in flight");
            None
        }
    }
}

/// Releases its key when dropped, on every exit path alike.
pub(crate) struct InFlightToken {
    keys: Arc<Mutex<HashSet<ActionKey>>>,
    key: ActionKey,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Detachment epoch for one view instance. A response that started before
/// [`Lifecycle::detach`] must not write view state after it.
#[derive(Default)]
pub(crate) struct Lifecycle {
    epoch: AtomicU64,
}

impl Lifecycle {
    pub(crate) fn current(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }

    pub(crate) fn detach(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}
