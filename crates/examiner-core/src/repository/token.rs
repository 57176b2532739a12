//! Access token repository trait definition.

use examiner_types::error::RepositoryError;
use examiner_types::identity::{UserId, UserIdentity};

/// Opaque bearer tokens that identify the user opening an interview socket.
pub trait AccessTokenRepository: Send + Sync {
    /// Resolve a plaintext token to its user. `None` for unknown or revoked tokens.
    fn resolve(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserIdentity>, RepositoryError>> + Send;

    /// Create a new token for an existing user. Returns the plaintext token,
    /// which is not stored and cannot be recovered later.
    fn issue(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<String, RepositoryError>> + Send;

    /// Revoke a token so it no longer resolves.
    fn revoke(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
