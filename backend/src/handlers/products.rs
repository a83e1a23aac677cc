//! Product catalog HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use shared::Product;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::CurrentUser;
use crate::services::product::{
    CreateProductInput, DeleteProductOutcome, PosProduct, ProductDeletability, ProductListing,
    ProductService, UpdateProductInput,
};
use crate::AppState;

const POS_SEARCH_LIMIT: i64 = 20;

#[derive(Debug, Deserialize, Default)]
pub struct ProductListQuery {
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PosSearchQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
}

fn service(state: &AppState) -> ProductService {
    ProductService::new(state.db.clone(), state.engine)
}

pub async fn list_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProductListQuery>,
) -> AppResult<Json<Vec<ProductListing>>> {
    let products = service(&state)
        .list(query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ProductListing>> {
    Ok(Json(service(&state).get(product_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(input): AppJson<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = service(&state).create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    Ok(Json(service(&state).update(product_id, input).await?))
}

/// Removes the product, or deactivates it when it has history
pub async fn delete_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<DeleteProductOutcome>> {
    Ok(Json(service(&state).delete(product_id).await?))
}

pub async fn can_delete_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ProductDeletability>> {
    Ok(Json(service(&state).can_delete(product_id).await?))
}

pub async fn reactivate_product(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<Product>> {
    Ok(Json(service(&state).reactivate(product_id).await?))
}

/// Product lookup for the register
pub async fn search_pos_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PosSearchQuery>,
) -> AppResult<Json<Vec<PosProduct>>> {
    let limit = query.limit.unwrap_or(POS_SEARCH_LIMIT).clamp(1, POS_SEARCH_LIMIT);
    let products = service(&state)
        .search_for_pos(
            query.search.as_deref(),
            limit,
            state.config.store.low_stock_threshold,
        )
        .await?;
    Ok(Json(products))
}
