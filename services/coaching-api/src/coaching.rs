//! Coaching-email generation.
//!
//! Transcript retrieval and text generation are collaborators behind
//! [`TranscriptSource`] and [`CoachingRenderer`]. The shipped implementations
//! are placeholders, so generation only persists a `queued` log row.

use std::sync::Arc;

use async_trait::async_trait;
use shared::dto::{EmailLog, EmailStatus};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{NewEmailLog, Store, StoreError, EMAIL_LOGS_AE_CALL_KEY};

pub const PLACEHOLDER_SUBJECT: &str = "Your Coaching Feedback";

pub const PLACEHOLDER_BODY: &str = "[Placeholder - AI coaching feedback will appear here]

This is where the AI-generated coaching feedback will be displayed based on the Gong call transcript.

The actual implementation will:
1. Fetch the call transcript from Gong
2. Send it to ChatGPT with your configured prompt
3. Return personalized coaching feedback";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Source of call transcripts, keyed by Gong call id.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_transcript(&self, call_id: &str) -> anyhow::Result<Option<String>>;
}

/// Turns a transcript and the strategy's prompt into an email.
#[async_trait]
pub trait CoachingRenderer: Send + Sync {
    async fn render(
        &self,
        transcript: Option<&str>,
        prompt: Option<&str>,
    ) -> anyhow::Result<RenderedEmail>;
}

/// Never has a transcript.
pub struct NoTranscripts;

#[async_trait]
impl TranscriptSource for NoTranscripts {
    async fn fetch_transcript(&self, call_id: &str) -> anyhow::Result<Option<String>> {
        debug!(call_id, "transcript retrieval not configured");
        Ok(None)
    }
}

/// Fixed placeholder text, independent of transcript and prompt.
pub struct PlaceholderRenderer;

#[async_trait]
impl CoachingRenderer for PlaceholderRenderer {
    async fn render(
        &self,
        _transcript: Option<&str>,
        _prompt: Option<&str>,
    ) -> anyhow::Result<RenderedEmail> {
        Ok(RenderedEmail {
            subject: PLACEHOLDER_SUBJECT.to_string(),
            body: PLACEHOLDER_BODY.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Already generated for this AE and call: {ae_email}, {gong_call_id}")]
    Duplicate { ae_email: String, gong_call_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("collaborator failed: {0}")]
    Collaborator(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct GenerateInput {
    pub ae_email: String,
    pub gong_call_id: String,
    pub strategy_id: Uuid,
}

pub struct CoachingGenerator {
    transcripts: Arc<dyn TranscriptSource>,
    renderer: Arc<dyn CoachingRenderer>,
}

impl CoachingGenerator {
    pub fn new(transcripts: Arc<dyn TranscriptSource>, renderer: Arc<dyn CoachingRenderer>) -> Self {
        Self { transcripts, renderer }
    }

    pub fn placeholder() -> Self {
        Self::new(Arc::new(NoTranscripts), Arc::new(PlaceholderRenderer))
    }

    /// Renders an email for the call and records it as a `queued` log.
    ///
    /// The `(ae_email, gong_call_id)` unique constraint makes this idempotent:
    /// a second attempt for the same pair yields [`GenerateError::Duplicate`]
    /// and writes nothing.
    pub async fn generate(
        &self,
        store: &dyn Store,
        input: GenerateInput,
    ) -> Result<EmailLog, GenerateError> {
        let prompt = store.active_prompt(input.strategy_id).await?;
        let transcript = self.transcripts.fetch_transcript(&input.gong_call_id).await?;
        let rendered = self
            .renderer
            .render(transcript.as_deref(), prompt.as_ref().map(|p| p.body.as_str()))
            .await?;

        let log = NewEmailLog {
            ae_email: input.ae_email.clone(),
            gong_call_id: input.gong_call_id.clone(),
            status: EmailStatus::Queued,
            subject: rendered.subject,
            body: rendered.body,
            strategy_id: input.strategy_id,
        };

        match store.insert_email_log(log).await {
            Ok(row) => {
                info!(ae_email = %row.ae_email, gong_call_id = %row.gong_call_id, "coaching email queued");
                Ok(row)
            }
            Err(StoreError::UniqueViolation { constraint }) if constraint == EMAIL_LOGS_AE_CALL_KEY => {
                Err(GenerateError::Duplicate {
                    ae_email: input.ae_email,
                    gong_call_id: input.gong_call_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
