// HTTP handlers - thin JSON layer over the ledger

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::sync::MutexGuard;
use tracing::{debug, error};

use crate::app_state::{AppState, SharedState};
use crate::ledger::LedgerError;
use crate::market::{self, ErrorKind};
use crate::models::{AccountView, AssetHolding, BetView, ErrorResponse, RoundView, SubmitGroupRequest};

// ===== ERRORS =====

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, body: ErrorResponse::new("invalid_request", message) }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, body: ErrorResponse::new(ErrorKind::NotFound.as_str(), message) }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse::new(ErrorKind::Storage.as_str(), message),
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::OracleUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Corrupt | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let kind = e.kind();
        Self { status: status_for(kind), body: ErrorResponse::new(kind.as_str(), e.to_string()) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn lock(state: &SharedState) -> Result<MutexGuard<'_, AppState>, ApiError> {
    state.lock().map_err(|_| {
        error!("state lock poisoned");
        ApiError::internal("State lock poisoned")
    })
}

// ===== HEALTH =====

pub async fn health_check(State(state): State<SharedState>) -> ApiResult {
    let app_state = lock(&state)?;
    Ok(Json(json!({
        "status": "ok",
        "service": "predix-market",
        "height": app_state.ledger.height(),
        "market_app_id": app_state.ledger.market_app_id(),
        "oracle_ref": app_state.oracle_ref,
        "storage": app_state.ledger.store().describe(),
    })))
}

// ===== GROUPS =====

/// POST /groups
/// Submits a signed atomic group; every transaction applies or none does
pub async fn submit_group(State(state): State<SharedState>, Json(payload): Json<SubmitGroupRequest>) -> ApiResult {
    let mut app_state = lock(&state)?;

    let signed = payload
        .into_signed(|name| app_state.resolve_address(name))
        .map_err(ApiError::bad_request)?;

    debug!(size = signed.len(), "group submitted");
    let receipt = app_state.ledger.submit_signed(signed)?;
    Ok(Json(json!({ "success": true, "receipt": receipt })))
}

// ===== LEDGER VIEWS =====

pub async fn get_height(State(state): State<SharedState>) -> ApiResult {
    let app_state = lock(&state)?;
    Ok(Json(json!({
        "height": app_state.ledger.height(),
        "round": app_state.ledger.current_round(),
        "round_length": market::ROUND_LEN,
    })))
}

pub async fn get_round(State(state): State<SharedState>, Path(index): Path<u64>) -> ApiResult {
    let app_state = lock(&state)?;
    let round = app_state
        .ledger
        .market_round(index)?
        .ok_or_else(|| ApiError::not_found(format!("Round not found: {}", index)))?;
    Ok(Json(json!(RoundView { index, round })))
}

pub async fn get_bet(State(state): State<SharedState>, Path((index, address)): Path<(u64, String)>) -> ApiResult {
    let app_state = lock(&state)?;
    let bettor = app_state.resolve_address(&address).map_err(ApiError::bad_request)?;
    let bet = app_state
        .ledger
        .market_bet(index, &bettor)?
        .ok_or_else(|| ApiError::not_found(format!("Bet not found: {} in round {}", bettor.short(), index)))?;
    Ok(Json(json!(BetView { round: index, bettor, bet })))
}

pub async fn get_account(State(state): State<SharedState>, Path(address): Path<String>) -> ApiResult {
    let app_state = lock(&state)?;
    let address = app_state.resolve_address(&address).map_err(ApiError::bad_request)?;
    let world = app_state.ledger.world();

    let assets = world
        .holdings
        .iter()
        .filter_map(|(asset_id, holders)| {
            let units = holders.get(&address).copied().unwrap_or(0);
            (units > 0).then(|| AssetHolding {
                asset_id: *asset_id,
                asset_name: world.assets.get(asset_id).map(|p| p.asset_name.clone()).unwrap_or_default(),
                units,
            })
        })
        .collect();

    Ok(Json(json!(AccountView { address, balance: world.balance(&address), nonce: world.nonce(&address), assets })))
}

pub async fn get_oracle(State(state): State<SharedState>, Path(oracle_ref): Path<u64>) -> ApiResult {
    let app_state = lock(&state)?;
    if !app_state.ledger.world().oracles.contains_key(&oracle_ref) {
        return Err(ApiError::not_found(format!("Oracle application not found: {}", oracle_ref)));
    }
    match app_state.ledger.oracle_price(oracle_ref) {
        Some(price) => Ok(Json(json!({ "oracle_ref": oracle_ref, "price": price }))),
        None => Err(ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: ErrorResponse::new(
                ErrorKind::OracleUnavailable.as_str(),
                format!("Oracle {} has no published price", oracle_ref),
            ),
        }),
    }
}

pub async fn get_activity(State(state): State<SharedState>) -> ApiResult {
    let app_state = lock(&state)?;
    Ok(Json(json!({
        "stats": app_state.ledger.stats(),
        "activity": app_state.ledger.activity(),
    })))
}
