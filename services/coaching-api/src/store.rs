//! Persistence seam for strategies, AEs, prompts and email logs.
//!
//! Uniqueness rules (AE email, AE/call pair) are enforced by the backing
//! store and surface as [`StoreError::UniqueViolation`]; callers may check
//! beforehand but must still handle losing the race.

use async_trait::async_trait;
use shared::dto::{Ae, EmailLog, EmailStatus, Prompt, Strategy};
use thiserror::Error;
use uuid::Uuid;

pub const AES_EMAIL_KEY: &str = "aes_email_key";
pub const EMAIL_LOGS_AE_CALL_KEY: &str = "email_logs_ae_call_key";

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint `{constraint}` violated")]
    UniqueViolation { constraint: String },
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::UniqueViolation {
                    constraint: db.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Strategy currently owning an AE email.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AeOwner {
    pub ae_id: Uuid,
    pub strategy_id: Uuid,
    pub strategy_name: String,
}

#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub ae_email: String,
    pub gong_call_id: String,
    pub status: EmailStatus,
    pub subject: String,
    pub body: String,
    pub strategy_id: Uuid,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Round trip used by the health check.
    async fn ping(&self) -> StoreResult<()>;

    /// All strategies, oldest first.
    async fn list_strategies(&self) -> StoreResult<Vec<Strategy>>;

    async fn create_strategy(&self, name: &str) -> StoreResult<Strategy>;

    async fn find_strategy(&self, id: Uuid) -> StoreResult<Option<Strategy>>;

    /// AEs of a strategy, newest first.
    async fn list_aes(&self, strategy_id: Uuid) -> StoreResult<Vec<Ae>>;

    async fn find_ae(&self, id: Uuid) -> StoreResult<Option<Ae>>;

    /// Looks up which strategy, if any, owns `email`.
    async fn find_ae_owner(&self, email: &str) -> StoreResult<Option<AeOwner>>;

    async fn ae_in_strategy(&self, email: &str, strategy_id: Uuid) -> StoreResult<bool>;

    /// Inserts an enabled AE. Fails with a unique violation if the email exists.
    async fn insert_ae(&self, email: &str, strategy_id: Uuid) -> StoreResult<Ae>;

    /// Reassigns an AE; `None` when the AE does not exist.
    async fn move_ae(&self, id: Uuid, strategy_id: Uuid) -> StoreResult<Option<Ae>>;

    /// Most recently created active prompt of a strategy.
    async fn active_prompt(&self, strategy_id: Uuid) -> StoreResult<Option<Prompt>>;

    /// Deactivates every prompt of the strategy and inserts `body` as the
    /// new active one, all or nothing.
    async fn activate_prompt(&self, strategy_id: Uuid, body: &str) -> StoreResult<Prompt>;

    /// Newest logs of a strategy, at most `limit`.
    async fn list_email_logs(&self, strategy_id: Uuid, limit: i64) -> StoreResult<Vec<EmailLog>>;

    /// Fails with a unique violation if the AE/call pair already has a log.
    async fn insert_email_log(&self, log: NewEmailLog) -> StoreResult<EmailLog>;
}
