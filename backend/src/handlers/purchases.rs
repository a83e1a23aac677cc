//! Supplier purchase HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::stock::{PurchaseReceipt, VoidReceipt};
use shared::Purchase;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::CurrentUser;
use crate::services::purchase::{
    CreatePurchaseInput, PurchaseDetail, PurchaseFilter, PurchaseService, PurchaseSummary,
    UpdatePurchaseInput,
};
use crate::AppState;

fn service(state: &AppState) -> PurchaseService {
    PurchaseService::new(state.db.clone(), state.engine)
}

pub async fn list_purchases(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<PurchaseFilter>,
) -> AppResult<Json<Vec<PurchaseSummary>>> {
    Ok(Json(service(&state).list(filter).await?))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    AppPath(purchase_id): AppPath<Uuid>,
) -> AppResult<Json<PurchaseDetail>> {
    Ok(Json(service(&state).get(purchase_id).await?))
}

/// Receive goods: creates the purchase and raises stock
pub async fn create_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(input): AppJson<CreatePurchaseInput>,
) -> AppResult<(StatusCode, Json<PurchaseReceipt>)> {
    let receipt = service(&state).create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn update_purchase(
    State(state): State<AppState>,
    AppPath(purchase_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdatePurchaseInput>,
) -> AppResult<Json<Purchase>> {
    Ok(Json(service(&state).update(purchase_id, input).await?))
}

/// DELETE voids the purchase and takes its goods back out of stock
pub async fn void_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(purchase_id): AppPath<Uuid>,
) -> AppResult<Json<VoidReceipt>> {
    Ok(Json(service(&state).void(purchase_id, user.user_id).await?))
}
