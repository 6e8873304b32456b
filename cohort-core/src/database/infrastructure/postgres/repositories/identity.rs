use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_model::{Identity, Role};
use sqlx::PgPool;
use uuid::Uuid;

use super::rows::column;
use crate::database::ports::identity::IdentityRepository;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn resolve_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, role
            FROM auth_sessions
            WHERE token_hash = $1
              AND NOT revoked
              AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to resolve session: {e}"))
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user_id: Uuid = column(&row, "user_id")?;
        let role: String = column(&row, "role")?;
        Ok(Some(Identity {
            user_id,
            role: role.parse::<Role>()?,
        }))
    }
}
