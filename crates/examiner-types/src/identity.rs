//! Authenticated user identity attached to an interview session.

use serde::{Deserialize, Serialize};

/// Numeric primary key of a user row.
pub type UserId = i64;

/// The identity a session is opened for.
///
/// Resolved from an access token before the WebSocket upgrade; quota is
/// loaded and settled against `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub username: String,
}

impl UserIdentity {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}
