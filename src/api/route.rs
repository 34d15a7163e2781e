use crate::{
    api::{error::ApiError, response::with_total_count},
    db::{entry, transaction},
    models::{AccountSnapshot, Address, MonitoredAccount},
    state::AppState,
    validation::{
        validate_address, validate_address_list, validate_amount, validate_hash_list, validate_time_range,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

// POST /accounts body
#[derive(Deserialize)]
pub struct MonitorRequest {
    pub address: Vec<String>,
}

// GET /accounts/receivables query parameters
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivablesQuery {
    pub limit: Option<usize>,
    pub hashes: Option<String>,
    pub addresses: Option<String>,
    pub min_amount: Option<String>,
}

// GET /transactions and /accounts/entries query parameters
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRangeQuery {
    pub persisted_at_from: DateTime<Utc>,
    pub persisted_at_to: DateTime<Utc>,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/accounts", get(list_accounts).post(monitor_accounts))
        .route("/accounts/receivables", get(get_receivables))
        .route("/accounts/entries", get(get_entries))
        .route("/accounts/{address}", get(get_account).post(monitor_account))
        .route("/accounts/{address}/details", get(get_account_details))
        .route("/accounts/{address}/states/{state}", post(change_state))
        .route("/transactions", get(get_transactions))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn monitor_account(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<MonitoredAccount>, ApiError> {
    let address = validate_address(&address)?;
    let account = state.registry.create(address).await?;
    Ok(Json(account))
}

async fn monitor_accounts(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MonitorRequest>,
) -> Result<Json<Vec<MonitoredAccount>>, ApiError> {
    // Validate everything before touching the registry
    let addresses = request
        .address
        .iter()
        .map(|raw| validate_address(raw))
        .collect::<Result<Vec<Address>, _>>()?;

    info!("Processing monitor request for {} addresses", addresses.len());

    let mut accounts = Vec::with_capacity(addresses.len());
    for address in addresses {
        accounts.push(state.registry.create(address).await?);
    }
    Ok(Json(accounts))
}

async fn list_accounts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MonitoredAccount>>, ApiError> {
    Ok(Json(state.registry.list_all().await?))
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<MonitoredAccount>, ApiError> {
    let address = validate_address(&address)?;
    state
        .registry
        .find(&address)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Address {} not found", address)))
}

async fn get_account_details(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<AccountSnapshot>, ApiError> {
    let address = validate_address(&address)?;
    state
        .registry
        .account_details(&address)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No details for address {}", address)))
}

async fn change_state(
    State(state): State<Arc<AppState>>,
    Path((address, target)): Path<(String, String)>,
) -> Result<Json<MonitoredAccount>, ApiError> {
    let address = validate_address(&address)?;

    let account = match target.as_str() {
        "ENABLED" => state.registry.enable(address).await?,
        "DISABLED" => state.registry.disable(address).await?,
        _ => {
            return Err(ApiError::BadRequest(format!(
                "State must be either 'ENABLED' or 'DISABLED', got '{}'",
                target
            )))
        }
    };
    Ok(Json(account))
}

async fn get_receivables(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReceivablesQuery>,
) -> Result<Response, ApiError> {
    let hashes = validate_hash_list(params.hashes.as_deref())?;
    let addresses = validate_address_list(params.addresses.as_deref())?;
    let requested = params.min_amount.as_deref().map(validate_amount).transpose()?;

    // The configured floor always applies
    let floor = state.config.receivable_min_amount;
    let min_amount = requested.map_or(floor, |amount| amount.max(floor));

    // Disabled addresses no longer receive confirmations
    let active = state.registry.current_active_addresses();
    let matching: Vec<_> = state
        .receivables
        .pending_for(&active, min_amount)
        .into_iter()
        .filter(|r| hashes.is_empty() || hashes.contains(&r.hash))
        .filter(|r| addresses.is_empty() || addresses.contains(&r.receiver_address()))
        .collect();

    let total = matching.len();
    let limited: Vec<_> = matching.into_iter().take(params.limit.unwrap_or(usize::MAX)).collect();

    Ok(with_total_count(limited, total))
}

async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PersistedRangeQuery>,
) -> Result<Response, ApiError> {
    let (from, to) = validate_time_range(params.persisted_at_from, params.persisted_at_to)?;

    let transactions = transaction::find_by_persisted_range(&state.db_pool, from, to).await?;
    let total = transactions.len();
    Ok(with_total_count(transactions, total))
}

async fn get_entries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PersistedRangeQuery>,
) -> Result<Response, ApiError> {
    let (from, to) = validate_time_range(params.persisted_at_from, params.persisted_at_to)?;

    let entries = entry::find_by_persisted_range(&state.db_pool, from, to).await?;
    let total = entries.len();
    Ok(with_total_count(entries, total))
}
