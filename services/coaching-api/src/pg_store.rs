//! Postgres implementation of [`Store`] on top of an sqlx pool.

use async_trait::async_trait;
use shared::dto::{Ae, EmailLog, Prompt, Strategy};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{AeOwner, NewEmailLog, Store, StoreResult};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_strategies(&self) -> StoreResult<Vec<Strategy>> {
        let rows = sqlx::query_as::<_, Strategy>(
            "SELECT id, name, created_at FROM strategies ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_strategy(&self, name: &str) -> StoreResult<Strategy> {
        let row = sqlx::query_as::<_, Strategy>(
            "INSERT INTO strategies (name, created_at) VALUES ($1, now()) \
             RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_strategy(&self, id: Uuid) -> StoreResult<Option<Strategy>> {
        let row = sqlx::query_as::<_, Strategy>(
            "SELECT id, name, created_at FROM strategies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_aes(&self, strategy_id: Uuid) -> StoreResult<Vec<Ae>> {
        let rows = sqlx::query_as::<_, Ae>(
            "SELECT id, email, enabled, strategy_id, created_at FROM aes \
             WHERE strategy_id = $1 ORDER BY created_at DESC",
        )
        .bind(strategy_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_ae(&self, id: Uuid) -> StoreResult<Option<Ae>> {
        let row = sqlx::query_as::<_, Ae>(
            "SELECT id, email, enabled, strategy_id, created_at FROM aes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_ae_owner(&self, email: &str) -> StoreResult<Option<AeOwner>> {
        let row = sqlx::query_as::<_, AeOwner>(
            "SELECT a.id AS ae_id, a.strategy_id, s.name AS strategy_name \
             FROM aes a JOIN strategies s ON a.strategy_id = s.id \
             WHERE a.email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn ae_in_strategy(&self, email: &str, strategy_id: Uuid) -> StoreResult<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM aes WHERE email = $1 AND strategy_id = $2")
                .bind(email)
                .bind(strategy_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn insert_ae(&self, email: &str, strategy_id: Uuid) -> StoreResult<Ae> {
        let row = sqlx::query_as::<_, Ae>(
            "INSERT INTO aes (email, enabled, strategy_id, created_at) \
             VALUES ($1, true, $2, now()) \
             RETURNING id, email, enabled, strategy_id, created_at",
        )
        .bind(email)
        .bind(strategy_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn move_ae(&self, id: Uuid, strategy_id: Uuid) -> StoreResult<Option<Ae>> {
        let row = sqlx::query_as::<_, Ae>(
            "UPDATE aes SET strategy_id = $1 WHERE id = $2 \
             RETURNING id, email, enabled, strategy_id, created_at",
        )
        .bind(strategy_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn active_prompt(&self, strategy_id: Uuid) -> StoreResult<Option<Prompt>> {
        let row = sqlx::query_as::<_, Prompt>(
            "SELECT id, body, is_active, strategy_id, created_at FROM prompts \
             WHERE strategy_id = $1 AND is_active = true \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(strategy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn activate_prompt(&self, strategy_id: Uuid, body: &str) -> StoreResult<Prompt> {
        // Dropping `tx` before commit rolls back and hands the connection back.
        let mut tx = self.pool.begin().await?;

        // Serialisiert parallele Aktivierungen derselben Strategie.
        sqlx::query("SELECT id FROM strategies WHERE id = $1 FOR UPDATE")
            .bind(strategy_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE prompts SET is_active = false WHERE strategy_id = $1 AND is_active")
            .bind(strategy_id)
            .execute(&mut *tx)
            .await?;

        let prompt = sqlx::query_as::<_, Prompt>(
            "INSERT INTO prompts (body, is_active, strategy_id, created_at) \
             VALUES ($1, true, $2, now()) \
             RETURNING id, body, is_active, strategy_id, created_at",
        )
        .bind(body)
        .bind(strategy_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(prompt)
    }

    async fn list_email_logs(&self, strategy_id: Uuid, limit: i64) -> StoreResult<Vec<EmailLog>> {
        let rows = sqlx::query_as::<_, EmailLog>(
            "SELECT id, ae_email, gong_call_id, status, subject, body, error_message, \
                    strategy_id, created_at \
             FROM email_logs WHERE strategy_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(strategy_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_email_log(&self, log: NewEmailLog) -> StoreResult<EmailLog> {
        let row = sqlx::query_as::<_, EmailLog>(
            "INSERT INTO email_logs \
               (ae_email, gong_call_id, status, subject, body, error_message, strategy_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, NULL, $6, now()) \
             RETURNING id, ae_email, gong_call_id, status, subject, body, error_message, \
                       strategy_id, created_at",
        )
        .bind(&log.ae_email)
        .bind(&log.gong_call_id)
        .bind(log.status)
        .bind(&log.subject)
        .bind(&log.body)
        .bind(log.strategy_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
