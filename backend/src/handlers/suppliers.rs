//! Supplier HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::Supplier;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::services::supplier::{SupplierInput, SupplierService, SupplierWithCount};
use crate::AppState;

pub async fn list_suppliers(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SupplierWithCount>>> {
    let service = SupplierService::new(state.db.clone());
    Ok(Json(service.list().await?))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    AppPath(supplier_id): AppPath<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db.clone());
    Ok(Json(service.get(supplier_id).await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    AppJson(input): AppJson<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let service = SupplierService::new(state.db.clone());
    Ok((StatusCode::CREATED, Json(service.create(input).await?)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    AppPath(supplier_id): AppPath<Uuid>,
    AppJson(input): AppJson<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db.clone());
    Ok(Json(service.update(supplier_id, input).await?))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    AppPath(supplier_id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    let service = SupplierService::new(state.db.clone());
    service.delete(supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
