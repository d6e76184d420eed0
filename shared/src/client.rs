//! Typed HTTP client for the coaching REST API.
//!
//! Every method maps to one endpoint. Passing `None` as strategy targets the
//! legacy unscoped route, which the server resolves to the default strategy.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::dto::{
    Ae, AeConflict, CreateAeRequest, CreateStrategyRequest, EmailLog, GenerateRequest,
    HelloResponse, MoveAeRequest, Prompt, Strategy, UpdatePromptRequest,
};
use crate::utils::join_url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-2xx status.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        body: Option<Value>,
    },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// Ownership details of a 409 returned when creating an AE.
    pub fn conflict(&self) -> Option<AeConflict> {
        match self {
            ClientError::Api { status: 409, body: Some(body), .. } => {
                serde_json::from_value(body.clone()).ok()
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct CoachingClient {
    http: Client,
    base_url: String,
}

fn scoped(strategy: Option<Uuid>, resource: &str) -> String {
    match strategy {
        Some(id) => format!("/strategies/{id}/{resource}"),
        None => format!("/{resource}"),
    }
}

impl CoachingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /* ---------------- Service ---------------- */

    pub async fn hello(&self) -> Result<HelloResponse> {
        self.send_json(self.request(Method::GET, "/"), "fetch API data").await
    }

    pub async fn health(&self) -> Result<String> {
        let res = self.request(Method::GET, "/health").send().await?;
        let res = check(res, "check health").await?;
        Ok(res.text().await?)
    }

    /* ---------------- Strategies ---------------- */

    pub async fn list_strategies(&self) -> Result<Vec<Strategy>> {
        self.send_json(self.request(Method::GET, "/strategies"), "fetch strategies").await
    }

    pub async fn create_strategy(&self, name: &str) -> Result<Strategy> {
        let req = CreateStrategyRequest { name: name.to_string() };
        self.send_json(self.request(Method::POST, "/strategies").json(&req), "create strategy")
            .await
    }

    /* ---------------- AEs ---------------- */

    pub async fn list_aes(&self, strategy: Option<Uuid>) -> Result<Vec<Ae>> {
        self.send_json(self.request(Method::GET, &scoped(strategy, "aes")), "fetch AEs").await
    }

    pub async fn create_ae(&self, strategy: Option<Uuid>, email: &str) -> Result<Ae> {
        let req = CreateAeRequest { email: email.to_string() };
        self.send_json(
            self.request(Method::POST, &scoped(strategy, "aes")).json(&req),
            "create AE",
        )
        .await
    }

    pub async fn move_ae(&self, ae_id: Uuid, strategy_id: Uuid) -> Result<Ae> {
        let req = MoveAeRequest { strategy_id: strategy_id.to_string() };
        let path = format!("/strategies/aes/{ae_id}/move");
        self.send_json(self.request(Method::PATCH, &path).json(&req), "move AE").await
    }

    /* ---------------- Prompts ---------------- */

    pub async fn get_prompt(&self, strategy: Option<Uuid>) -> Result<Prompt> {
        self.send_json(self.request(Method::GET, &scoped(strategy, "prompt")), "fetch prompt")
            .await
    }

    pub async fn update_prompt(&self, strategy: Option<Uuid>, body: &str) -> Result<Prompt> {
        let req = UpdatePromptRequest { body: body.to_string() };
        self.send_json(
            self.request(Method::PUT, &scoped(strategy, "prompt")).json(&req),
            "update prompt",
        )
        .await
    }

    /* ---------------- Email logs ---------------- */

    pub async fn list_email_logs(&self, strategy: Option<Uuid>) -> Result<Vec<EmailLog>> {
        self.send_json(
            self.request(Method::GET, &scoped(strategy, "email-logs")),
            "fetch email logs",
        )
        .await
    }

    pub async fn generate(
        &self,
        strategy: Option<Uuid>,
        ae_email: &str,
        gong_call_id: &str,
    ) -> Result<EmailLog> {
        let req = GenerateRequest {
            ae_email: ae_email.to_string(),
            gong_call_id: gong_call_id.to_string(),
        };
        self.send_json(
            self.request(Method::POST, &scoped(strategy, "generate")).json(&req),
            "generate email",
        )
        .await
    }

    /* ---------------- Helpers ---------------- */

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = join_url(&self.base_url, path);
        debug!(%method, %url, "\u{2192} coaching api");
        self.http.request(method, url)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder, action: &str) -> Result<T> {
        let res = check(req.send().await?, action).await?;
        Ok(res.json::<T>().await?)
    }
}

/// Turns a non-2xx response into [`ClientError::Api`], preferring the
/// server's `error` text over the generic status reason.
async fn check(res: Response, action: &str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body: Option<Value> = res.json().await.ok();
    let message = body
        .as_ref()
        .and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "Failed to {action}: {}",
                status.canonical_reason().unwrap_or("Unknown status")
            )
        });
    Err(ClientError::Api { status: status.as_u16(), message, body })
}
