//! Inventory HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::stock::Adjustment;

use crate::error::AppResult;
use crate::extract::{AppJson, AppQuery};
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    CreateMovementInput, InventoryReport, InventoryService, MovementFilter, MovementListing,
};
use crate::AppState;

fn service(state: &AppState) -> InventoryService {
    InventoryService::new(state.db.clone(), state.engine)
}

pub async fn list_movements(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<MovementFilter>,
) -> AppResult<Json<Vec<MovementListing>>> {
    Ok(Json(service(&state).list_movements(filter).await?))
}

/// Record a manual stock movement
pub async fn create_movement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(input): AppJson<CreateMovementInput>,
) -> AppResult<(StatusCode, Json<Adjustment>)> {
    let adjustment = service(&state).create_movement(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

pub async fn inventory_report(
    State(state): State<AppState>,
) -> AppResult<Json<InventoryReport>> {
    let report = service(&state)
        .report(state.config.store.low_stock_threshold)
        .await?;
    Ok(Json(report))
}
