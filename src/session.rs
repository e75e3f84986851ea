//! Sessions
//!
//! The signed-in user is passed explicitly to everything that acts on their behalf;
//! nothing reads authentication state from a global.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tokio::sync::watch;

use crate::uuids::TypedUuid;

/// Marker for user identifiers.
#[derive(Debug)]
pub struct User;

/// User UUID
pub type UserUuid = TypedUuid<User>;

/// Session errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Nobody is signed in.
    #[error("you need to sign in to continue")]
    SignedOut,
}

/// Authentication provider contract.
#[automock]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The currently signed-in user, if any.
    async fn current_user(&self) -> Option<UserUuid>;

    /// Auth state changes; the receiver observes `None` on sign-out.
    fn watch(&self) -> watch::Receiver<Option<UserUuid>>;
}

/// An authenticated user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    user: UserUuid,
}

impl Session {
    /// Create a session for a known user.
    pub const fn new(user: UserUuid) -> Self {
        Self { user }
    }

    /// Resolve the session of whoever is signed in.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SignedOut`] when no user is signed in.
    pub async fn current(auth: &dyn AuthProvider) -> Result<Self, SessionError> {
        auth.current_user()
            .await
            .map(Self::new)
            .ok_or(SessionError::SignedOut)
    }

    /// The session's user.
    pub const fn user(&self) -> UserUuid {
        self.user
    }
}
