//! Idempotent schema bootstrap, run once at startup.

use shared::dto::{DEFAULT_STRATEGY_ID, DEFAULT_STRATEGY_NAME};
use sqlx::PgPool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS strategies (
        id          uuid PRIMARY KEY DEFAULT gen_random_uuid(),
        name        text NOT NULL,
        created_at  timestamptz NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS aes (
        id           uuid PRIMARY KEY DEFAULT gen_random_uuid(),
        email        text NOT NULL,
        enabled      boolean NOT NULL DEFAULT true,
        strategy_id  uuid NOT NULL REFERENCES strategies(id),
        created_at   timestamptz NOT NULL DEFAULT now(),
        CONSTRAINT aes_email_key UNIQUE (email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prompts (
        id           uuid PRIMARY KEY DEFAULT gen_random_uuid(),
        body         text NOT NULL,
        is_active    boolean NOT NULL DEFAULT false,
        strategy_id  uuid NOT NULL REFERENCES strategies(id),
        created_at   timestamptz NOT NULL DEFAULT now()
    )
    "#,
    // at most one active prompt per strategy
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS prompts_one_active_per_strategy
        ON prompts (strategy_id) WHERE is_active
    "#,
    r#"
    DO $$
    BEGIN
        IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'email_status') THEN
            CREATE TYPE email_status AS ENUM ('queued','sent','failed','skipped');
        END IF;
    END$$;
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS email_logs (
        id             uuid PRIMARY KEY DEFAULT gen_random_uuid(),
        ae_email       text NOT NULL,
        gong_call_id   text NOT NULL,
        status         email_status NOT NULL DEFAULT 'queued',
        subject        text NOT NULL,
        body           text NOT NULL,
        error_message  text,
        strategy_id    uuid NOT NULL REFERENCES strategies(id),
        created_at     timestamptz NOT NULL DEFAULT now(),
        CONSTRAINT email_logs_ae_call_key UNIQUE (ae_email, gong_call_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS email_logs_strategy_created_idx
        ON email_logs (strategy_id, created_at DESC)
    "#,
];

/// Creates the tables, constraints and the default strategy if missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for stmt in STATEMENTS {
        sqlx::query(*stmt).execute(pool).await?;
    }

    sqlx::query("INSERT INTO strategies (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
        .bind(DEFAULT_STRATEGY_ID)
        .bind(DEFAULT_STRATEGY_NAME)
        .execute(pool)
        .await?;

    info!("database schema ensured");
    Ok(())
}
