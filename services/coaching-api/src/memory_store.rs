//! In-memory [`Store`] used by the router tests. Mirrors the Postgres
//! constraints: unique AE email, unique AE/call pair, one active prompt.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shared::dto::{Ae, EmailLog, Prompt, Strategy, DEFAULT_STRATEGY_ID, DEFAULT_STRATEGY_NAME};
use uuid::Uuid;

use crate::store::{
    AeOwner, NewEmailLog, Store, StoreError, StoreResult, AES_EMAIL_KEY, EMAIL_LOGS_AE_CALL_KEY,
};

#[derive(Default)]
struct Tables {
    strategies: Vec<Strategy>,
    aes: Vec<Ae>,
    prompts: Vec<Prompt>,
    email_logs: Vec<EmailLog>,
    /// Logical clock so ordering by `created_at` is deterministic.
    ticks: i64,
}

impl Tables {
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        Utc.timestamp_opt(1_700_000_000 + self.ticks, 0).unwrap()
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Number of upcoming owner lookups that miss, as if a concurrent insert
    /// had not committed yet.
    stale_owner_reads: AtomicUsize,
    /// Number of upcoming `ping`/`activate_prompt` calls that fail as if the
    /// database had gone away.
    failing_round_trips: AtomicUsize,
}

impl MemoryStore {
    /// Empty store seeded with the default strategy, like a fresh schema.
    pub fn new() -> Self {
        let mut tables = Tables::default();
        let created_at = tables.now();
        tables.strategies.push(Strategy {
            id: DEFAULT_STRATEGY_ID,
            name: DEFAULT_STRATEGY_NAME.into(),
            created_at,
        });
        Self {
            tables: Mutex::new(tables),
            stale_owner_reads: AtomicUsize::new(0),
            failing_round_trips: AtomicUsize::new(0),
        }
    }

    pub fn miss_next_owner_lookups(&self, n: usize) {
        self.stale_owner_reads.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_round_trips(&self, n: usize) {
        self.failing_round_trips.store(n, Ordering::SeqCst);
    }

    fn round_trip(&self) -> StoreResult<()> {
        let failing = self
            .failing_round_trips
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.tables.lock().unwrap().prompts.clone()
    }

    pub fn email_log_count(&self) -> usize {
        self.tables.lock().unwrap().email_logs.len()
    }

    pub fn ae_count(&self) -> usize {
        self.tables.lock().unwrap().aes.len()
    }
}

fn newest_first<T>(mut rows: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.round_trip()
    }

    async fn list_strategies(&self) -> StoreResult<Vec<Strategy>> {
        let mut rows = self.tables.lock().unwrap().strategies.clone();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }

    async fn create_strategy(&self, name: &str) -> StoreResult<Strategy> {
        let mut t = self.tables.lock().unwrap();
        let created_at = t.now();
        let row = Strategy { id: Uuid::new_v4(), name: name.into(), created_at };
        t.strategies.push(row.clone());
        Ok(row)
    }

    async fn find_strategy(&self, id: Uuid) -> StoreResult<Option<Strategy>> {
        let t = self.tables.lock().unwrap();
        Ok(t.strategies.iter().find(|s| s.id == id).cloned())
    }

    async fn list_aes(&self, strategy_id: Uuid) -> StoreResult<Vec<Ae>> {
        let t = self.tables.lock().unwrap();
        let rows = t.aes.iter().filter(|a| a.strategy_id == strategy_id).cloned().collect();
        Ok(newest_first(rows, |a: &Ae| a.created_at))
    }

    async fn find_ae(&self, id: Uuid) -> StoreResult<Option<Ae>> {
        let t = self.tables.lock().unwrap();
        Ok(t.aes.iter().find(|a| a.id == id).cloned())
    }

    async fn find_ae_owner(&self, email: &str) -> StoreResult<Option<AeOwner>> {
        let stale = self
            .stale_owner_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        let t = self.tables.lock().unwrap();
        let owner = t.aes.iter().find(|a| a.email == email).and_then(|a| {
            t.strategies.iter().find(|s| s.id == a.strategy_id).map(|s| AeOwner {
                ae_id: a.id,
                strategy_id: s.id,
                strategy_name: s.name.clone(),
            })
        });
        Ok(owner)
    }

    async fn ae_in_strategy(&self, email: &str, strategy_id: Uuid) -> StoreResult<bool> {
        let t = self.tables.lock().unwrap();
        Ok(t.aes.iter().any(|a| a.email == email && a.strategy_id == strategy_id))
    }

    async fn insert_ae(&self, email: &str, strategy_id: Uuid) -> StoreResult<Ae> {
        let mut t = self.tables.lock().unwrap();
        if t.aes.iter().any(|a| a.email == email) {
            return Err(StoreError::UniqueViolation { constraint: AES_EMAIL_KEY.into() });
        }
        let created_at = t.now();
        let row = Ae {
            id: Uuid::new_v4(),
            email: email.into(),
            enabled: true,
            strategy_id,
            created_at,
        };
        t.aes.push(row.clone());
        Ok(row)
    }

    async fn move_ae(&self, id: Uuid, strategy_id: Uuid) -> StoreResult<Option<Ae>> {
        let mut t = self.tables.lock().unwrap();
        Ok(t.aes.iter_mut().find(|a| a.id == id).map(|a| {
            a.strategy_id = strategy_id;
            a.clone()
        }))
    }

    async fn active_prompt(&self, strategy_id: Uuid) -> StoreResult<Option<Prompt>> {
        let t = self.tables.lock().unwrap();
        let rows = t
            .prompts
            .iter()
            .filter(|p| p.strategy_id == strategy_id && p.is_active)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Prompt| p.created_at.unwrap_or_default())
            .into_iter()
            .next())
    }

    async fn activate_prompt(&self, strategy_id: Uuid, body: &str) -> StoreResult<Prompt> {
        self.round_trip()?;
        let mut t = self.tables.lock().unwrap();
        for p in t.prompts.iter_mut().filter(|p| p.strategy_id == strategy_id) {
            p.is_active = false;
        }
        let created_at = t.now();
        let row = Prompt {
            id: Some(Uuid::new_v4()),
            body: body.into(),
            is_active: true,
            strategy_id,
            created_at: Some(created_at),
        };
        t.prompts.push(row.clone());
        Ok(row)
    }

    async fn list_email_logs(&self, strategy_id: Uuid, limit: i64) -> StoreResult<Vec<EmailLog>> {
        let t = self.tables.lock().unwrap();
        let rows = t
            .email_logs
            .iter()
            .filter(|l| l.strategy_id == strategy_id)
            .cloned()
            .collect();
        let mut rows = newest_first(rows, |l: &EmailLog| l.created_at);
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn insert_email_log(&self, log: NewEmailLog) -> StoreResult<EmailLog> {
        let mut t = self.tables.lock().unwrap();
        if t
            .email_logs
            .iter()
            .any(|l| l.ae_email == log.ae_email && l.gong_call_id == log.gong_call_id)
        {
            return Err(StoreError::UniqueViolation { constraint: EMAIL_LOGS_AE_CALL_KEY.into() });
        }
        let created_at = t.now();
        let row = EmailLog {
            id: Uuid::new_v4(),
            ae_email: log.ae_email,
            gong_call_id: log.gong_call_id,
            status: log.status,
            subject: log.subject,
            body: log.body,
            error_message: None,
            strategy_id: log.strategy_id,
            created_at,
        };
        t.email_logs.push(row.clone());
        Ok(row)
    }
}
