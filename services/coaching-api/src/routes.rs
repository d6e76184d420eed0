//! REST handlers for strategies, AEs, prompts, email logs and generation.
//!
//! The unscoped routes (`/aes`, `/prompt`, `/email-logs`, `/generate`) predate
//! strategies and operate on the default strategy.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use shared::dto::{
    Ae, CreateAeRequest, CreateStrategyRequest, EmailLog, FieldIssue, GenerateRequest,
    HelloResponse, MoveAeRequest, Prompt, Strategy, UpdatePromptRequest, DEFAULT_STRATEGY_ID,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::coaching::{CoachingGenerator, GenerateInput};
use crate::error::{internal, ApiError};
use crate::store::{Store, StoreError, AES_EMAIL_KEY};
use crate::validation::{parse_id, ValidatedJson};

/// Number of email logs returned per listing.
pub const EMAIL_LOG_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub generator: Arc<CoachingGenerator>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, generator: CoachingGenerator) -> Self {
        Self { store, generator: Arc::new(generator) }
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health))
        .route("/strategies", get(list_strategies).post(create_strategy))
        .route("/strategies/aes/:ae_id/move", patch(move_ae))
        .route("/strategies/:strategy_id/aes", get(list_aes).post(create_ae))
        .route("/strategies/:strategy_id/prompt", get(get_prompt).put(set_prompt))
        .route("/strategies/:strategy_id/email-logs", get(list_email_logs))
        .route("/strategies/:strategy_id/generate", post(generate))
        .route("/aes", get(legacy_list_aes).post(legacy_create_ae))
        .route("/prompt", get(legacy_get_prompt).put(legacy_set_prompt))
        .route("/email-logs", get(legacy_list_email_logs))
        .route("/generate", post(legacy_generate))
        .with_state(state)
}

fn strategy_param(raw: &str) -> ApiResult<Uuid> {
    parse_id(raw, "strategyId", "strategy")
}

/* ---------------- Service ---------------- */

async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse { message: "Hello from Gong Call Coaching API!".into() })
}

/// Liveness plus a database round trip.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "OK".to_string()),
        Err(e) => {
            error!(%e, "health: database unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, format!("db not ok: {e}"))
        }
    }
}

/* ---------------- Strategies ---------------- */

async fn list_strategies(State(state): State<AppState>) -> ApiResult<Json<Vec<Strategy>>> {
    let rows = state.store.list_strategies().await.map_err(internal("fetch strategies"))?;
    Ok(Json(rows))
}

async fn create_strategy(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateStrategyRequest>,
) -> ApiResult<(StatusCode, Json<Strategy>)> {
    let row = state
        .store
        .create_strategy(&input.name)
        .await
        .map_err(internal("create strategy"))?;
    info!(strategy_id = %row.id, name = %row.name, "strategy created");
    Ok((StatusCode::CREATED, Json(row)))
}

/* ---------------- AEs ---------------- */

async fn list_aes(
    State(state): State<AppState>,
    Path(strategy_id): Path<String>,
) -> ApiResult<Json<Vec<Ae>>> {
    aes_of(&state, strategy_param(&strategy_id)?).await
}

async fn legacy_list_aes(State(state): State<AppState>) -> ApiResult<Json<Vec<Ae>>> {
    aes_of(&state, DEFAULT_STRATEGY_ID).await
}

async fn aes_of(state: &AppState, strategy_id: Uuid) -> ApiResult<Json<Vec<Ae>>> {
    let rows = state.store.list_aes(strategy_id).await.map_err(internal("fetch AEs"))?;
    Ok(Json(rows))
}

async fn create_ae(
    State(state): State<AppState>,
    Path(strategy_id): Path<String>,
    ValidatedJson(input): ValidatedJson<CreateAeRequest>,
) -> ApiResult<(StatusCode, Json<Ae>)> {
    add_ae(&state, strategy_param(&strategy_id)?, input).await
}

async fn legacy_create_ae(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateAeRequest>,
) -> ApiResult<(StatusCode, Json<Ae>)> {
    add_ae(&state, DEFAULT_STRATEGY_ID, input).await
}

/// Inserts an AE unless its email is owned by any strategy.
///
/// The owner lookup is optimistic; `aes_email_key` decides when two requests
/// race, and the loser gets the same 409 as a plain duplicate.
async fn add_ae(
    state: &AppState,
    strategy_id: Uuid,
    input: CreateAeRequest,
) -> ApiResult<(StatusCode, Json<Ae>)> {
    const ACTION: &str = "create AE";
    let store = &state.store;

    if store.find_strategy(strategy_id).await.map_err(internal(ACTION))?.is_none() {
        return Err(ApiError::NotFound("Strategy not found"));
    }

    if let Some(owner) = store.find_ae_owner(&input.email).await.map_err(internal(ACTION))? {
        return Err(ApiError::AeConflict {
            existing_strategy_id: Some(owner.strategy_id),
            existing_strategy_name: Some(owner.strategy_name),
        });
    }

    match store.insert_ae(&input.email, strategy_id).await {
        Ok(ae) => {
            info!(ae_id = %ae.id, %strategy_id, "AE created");
            Ok((StatusCode::CREATED, Json(ae)))
        }
        Err(StoreError::UniqueViolation { constraint }) if constraint == AES_EMAIL_KEY => {
            // Race verloren: Besitzer nachladen, falls inzwischen sichtbar.
            let owner = store.find_ae_owner(&input.email).await.ok().flatten();
            Err(ApiError::AeConflict {
                existing_strategy_id: owner.as_ref().map(|o| o.strategy_id),
                existing_strategy_name: owner.map(|o| o.strategy_name),
            })
        }
        Err(e) => Err(internal(ACTION)(e)),
    }
}

async fn move_ae(
    State(state): State<AppState>,
    Path(ae_id): Path<String>,
    ValidatedJson(input): ValidatedJson<MoveAeRequest>,
) -> ApiResult<Json<Ae>> {
    const ACTION: &str = "move AE";
    let ae_id = parse_id(&ae_id, "aeId", "AE")?;
    let target = input.target().ok_or_else(|| {
        ApiError::Validation(vec![FieldIssue {
            path: vec!["strategy_id".into()],
            message: "Invalid strategy ID".into(),
        }])
    })?;
    let store = &state.store;

    if store.find_ae(ae_id).await.map_err(internal(ACTION))?.is_none() {
        return Err(ApiError::NotFound("AE not found"));
    }
    if store.find_strategy(target).await.map_err(internal(ACTION))?.is_none() {
        return Err(ApiError::NotFound("Target strategy not found"));
    }

    let moved = store
        .move_ae(ae_id, target)
        .await
        .map_err(internal(ACTION))?
        .ok_or(ApiError::NotFound("AE not found"))?;
    info!(%ae_id, strategy_id = %target, "AE moved");
    Ok(Json(moved))
}

/* ---------------- Prompts ---------------- */

async fn get_prompt(
    State(state): State<AppState>,
    Path(strategy_id): Path<String>,
) -> ApiResult<Json<Prompt>> {
    active_prompt_of(&state, strategy_param(&strategy_id)?).await
}

async fn legacy_get_prompt(State(state): State<AppState>) -> ApiResult<Json<Prompt>> {
    active_prompt_of(&state, DEFAULT_STRATEGY_ID).await
}

async fn active_prompt_of(state: &AppState, strategy_id: Uuid) -> ApiResult<Json<Prompt>> {
    let prompt = state
        .store
        .active_prompt(strategy_id)
        .await
        .map_err(internal("fetch prompt"))?
        .unwrap_or_else(|| Prompt::placeholder(strategy_id));
    Ok(Json(prompt))
}

async fn set_prompt(
    State(state): State<AppState>,
    Path(strategy_id): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdatePromptRequest>,
) -> ApiResult<Json<Prompt>> {
    activate(&state, strategy_param(&strategy_id)?, input).await
}

async fn legacy_set_prompt(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<UpdatePromptRequest>,
) -> ApiResult<Json<Prompt>> {
    activate(&state, DEFAULT_STRATEGY_ID, input).await
}

async fn activate(
    state: &AppState,
    strategy_id: Uuid,
    input: UpdatePromptRequest,
) -> ApiResult<Json<Prompt>> {
    const ACTION: &str = "update prompt";
    if state.store.find_strategy(strategy_id).await.map_err(internal(ACTION))?.is_none() {
        return Err(ApiError::NotFound("Strategy not found"));
    }
    let prompt = state
        .store
        .activate_prompt(strategy_id, &input.body)
        .await
        .map_err(internal(ACTION))?;
    info!(%strategy_id, "prompt activated");
    Ok(Json(prompt))
}

/* ---------------- Email logs ---------------- */

async fn list_email_logs(
    State(state): State<AppState>,
    Path(strategy_id): Path<String>,
) -> ApiResult<Json<Vec<EmailLog>>> {
    logs_of(&state, strategy_param(&strategy_id)?).await
}

async fn legacy_list_email_logs(State(state): State<AppState>) -> ApiResult<Json<Vec<EmailLog>>> {
    logs_of(&state, DEFAULT_STRATEGY_ID).await
}

async fn logs_of(state: &AppState, strategy_id: Uuid) -> ApiResult<Json<Vec<EmailLog>>> {
    let rows = state
        .store
        .list_email_logs(strategy_id, EMAIL_LOG_LIMIT)
        .await
        .map_err(internal("fetch email logs"))?;
    Ok(Json(rows))
}

/* ---------------- Generation ---------------- */

const GENERATE_ACTION: &str = "generate coaching email";

async fn generate(
    State(state): State<AppState>,
    Path(strategy_id): Path<String>,
    ValidatedJson(input): ValidatedJson<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<EmailLog>)> {
    let strategy_id = strategy_param(&strategy_id)?;
    let store = state.store.as_ref();

    if store.find_strategy(strategy_id).await.map_err(internal(GENERATE_ACTION))?.is_none() {
        return Err(ApiError::NotFound("Strategy not found"));
    }
    if !store
        .ae_in_strategy(&input.ae_email, strategy_id)
        .await
        .map_err(internal(GENERATE_ACTION))?
    {
        return Err(ApiError::NotFound("AE not found in this strategy"));
    }

    run_generation(&state, input, strategy_id).await
}

/// Unscoped generation: default strategy, no membership check.
async fn legacy_generate(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<EmailLog>)> {
    run_generation(&state, input, DEFAULT_STRATEGY_ID).await
}

async fn run_generation(
    state: &AppState,
    input: GenerateRequest,
    strategy_id: Uuid,
) -> ApiResult<(StatusCode, Json<EmailLog>)> {
    let log = state
        .generator
        .generate(
            state.store.as_ref(),
            GenerateInput {
                ae_email: input.ae_email,
                gong_call_id: input.gong_call_id,
                strategy_id,
            },
        )
        .await
        .map_err(ApiError::from_generate(GENERATE_ACTION))?;
    Ok((StatusCode::CREATED, Json(log)))
}
