//! Barcode scanner workflow. Scanner state is kept in the session.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::{RequireStaff, ensure, read_session, write_session};
use crate::models::{OfflineScan, Permission, ScanRecord, ScanState, SyncSummary, session_keys};
use crate::services::ScanService;
use crate::services::scanning::ScanResult;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scan", get(current_state))
        .route("/scan/start", post(start))
        .route("/scan/cancel", post(cancel))
        .route("/scan/complete", post(complete))
        .route("/scan/sync", post(sync_offline))
        .route("/scan/history", get(history).delete(clear_history))
}

fn service(state: &AppState) -> ScanService<'_> {
    let stores = state.stores();
    ScanService::new(stores.scans.as_ref(), stores.catalog.as_ref())
}

#[derive(Debug, Deserialize)]
pub struct StartInput {
    pub camera_granted: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompleteInput {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    #[serde(flatten)]
    pub result: ScanResult,
    pub scanner: ScanState,
}

#[derive(Debug, Deserialize)]
pub struct SyncInput {
    pub scans: Vec<OfflineScan>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub removed: u64,
}

async fn current_state(
    RequireStaff(user): RequireStaff,
    session: Session,
) -> Result<Json<ScanState>, AppError> {
    ensure(&user, Permission::Scan)?;
    Ok(Json(read_session(&session, session_keys::SCAN_STATE).await?))
}

async fn start(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<StartInput>,
) -> Result<Json<ScanState>, AppError> {
    ensure(&user, Permission::Scan)?;
    let current = read_session(&session, session_keys::SCAN_STATE).await?;
    let next = service(&state).start(current, input.camera_granted)?;
    write_session(&session, session_keys::SCAN_STATE, &next).await?;
    Ok(Json(next))
}

async fn cancel(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ScanState>, AppError> {
    ensure(&user, Permission::Scan)?;
    let current = read_session(&session, session_keys::SCAN_STATE).await?;
    let next = service(&state).cancel(current);
    write_session(&session, session_keys::SCAN_STATE, &next).await?;
    Ok(Json(next))
}

#[instrument(skip(state, user, session, input), fields(user_id = %user.id))]
async fn complete(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<CompleteInput>,
) -> Result<Json<CompleteResponse>, AppError> {
    ensure(&user, Permission::Scan)?;
    let current = read_session(&session, session_keys::SCAN_STATE).await?;
    let result = service(&state).complete(user.id, current, &input.code).await?;
    let next = ScanState::Idle;
    write_session(&session, session_keys::SCAN_STATE, &next).await?;
    Ok(Json(CompleteResponse {
        result,
        scanner: next,
    }))
}

async fn history(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ScanRecord>>, AppError> {
    ensure(&user, Permission::Scan)?;
    let records = service(&state)
        .history(user.id, query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(Json(records))
}

async fn clear_history(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Cleared>, AppError> {
    ensure(&user, Permission::Scan)?;
    let removed = service(&state).clear_history(user.id).await?;
    Ok(Json(Cleared { removed }))
}

async fn sync_offline(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<SyncInput>,
) -> Result<Json<SyncSummary>, AppError> {
    ensure(&user, Permission::Scan)?;
    Ok(Json(service(&state).sync_offline(user.id, input.scans).await?))
}
