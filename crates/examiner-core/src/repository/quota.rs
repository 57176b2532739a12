//! Quota repository trait definition.

use examiner_types::error::RepositoryError;
use examiner_types::identity::UserId;

/// Persistence of prepaid interview time, in seconds, keyed by user.
///
/// Implementations live in examiner-infra (e.g., SqliteQuotaRepository).
pub trait QuotaRepository: Send + Sync {
    /// Seconds the user may still spend. Unknown users have no quota.
    fn load_quota(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Overwrite the user's quota with what is left after a session.
    fn commit_remaining_quota(
        &self,
        user_id: UserId,
        remaining_seconds: i64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
