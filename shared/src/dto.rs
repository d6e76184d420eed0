//! Wire types shared by the coaching API and its clients.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

/// Strategy every legacy (unscoped) route operates on.
pub const DEFAULT_STRATEGY_ID: Uuid = Uuid::from_u128(1);

/// Name of the seeded default strategy.
pub const DEFAULT_STRATEGY_NAME: &str = "Default Strategy";

/* ---------------- Entities ---------------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Strategy {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An account executive. The email is unique across all strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Ae {
    pub id: Uuid,
    pub email: String,
    pub enabled: bool,
    pub strategy_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Coaching prompt of a strategy.
///
/// `id` and `created_at` are `None` only for the empty placeholder returned
/// when a strategy has no active prompt yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Prompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub body: String,
    pub is_active: bool,
    pub strategy_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Prompt {
    pub fn placeholder(strategy_id: Uuid) -> Self {
        Self {
            id: None,
            body: String::new(),
            is_active: true,
            strategy_id,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "email_status", rename_all = "lowercase"))]
pub enum EmailStatus {
    Queued,
    Sent,
    Failed,
    Skipped,
}

/// One coaching-email generation attempt. `(ae_email, gong_call_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct EmailLog {
    pub id: Uuid,
    pub ae_email: String,
    pub gong_call_id: String,
    pub status: EmailStatus,
    pub subject: String,
    pub body: String,
    pub error_message: Option<String>,
    pub strategy_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/* ---------------- Requests ---------------- */

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStrategyRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Strategy name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAeRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_email_address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MoveAeRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_strategy_id"))]
    pub strategy_id: String,
}

impl MoveAeRequest {
    /// Target strategy; only meaningful after [`Validate::validate`] passed.
    pub fn target(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.strategy_id).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePromptRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Prompt body cannot be empty"))]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_email_address"))]
    pub ae_email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Gong call ID is required"))]
    pub gong_call_id: String,
}

/// RFC-style check plus a dotted domain, so `a@localhost` is rejected.
fn validate_email_address(value: &str) -> Result<(), ValidationError> {
    let dotted_domain = value
        .rsplit_once('@')
        .map(|(_, domain)| {
            domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        })
        .unwrap_or(false);
    if value.validate_email() && dotted_domain {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message(Cow::Borrowed("Invalid email address")))
    }
}

fn validate_strategy_id(value: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid").with_message(Cow::Borrowed("Invalid strategy ID")))
}

/* ---------------- Responses ---------------- */

/// Location and reason of one rejected input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub path: Vec<String>,
    pub message: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldIssue>,
}

/// 409 body when an AE email is already owned by a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeConflict {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_strategy_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_strategy_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
}
