use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_model::Identity;

use crate::error::Result;

/// Read-only view of sessions issued by the external auth collaborator.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Resolve a hashed bearer token to an identity. Expired or revoked
    /// sessions resolve to `None`.
    async fn resolve_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>>;
}
