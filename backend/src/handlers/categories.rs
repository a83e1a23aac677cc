//! Category HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::Category;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::services::category::{CategoryInput, CategoryService, CategoryWithCount};
use crate::AppState;

pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CategoryWithCount>>> {
    let service = CategoryService::new(state.db.clone());
    Ok(Json(service.list().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    AppPath(category_id): AppPath<Uuid>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db.clone());
    Ok(Json(service.get(category_id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    AppJson(input): AppJson<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let service = CategoryService::new(state.db.clone());
    Ok((StatusCode::CREATED, Json(service.create(input).await?)))
}

pub async fn update_category(
    State(state): State<AppState>,
    AppPath(category_id): AppPath<Uuid>,
    AppJson(input): AppJson<CategoryInput>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db.clone());
    Ok(Json(service.update(category_id, input).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AppPath(category_id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    let service = CategoryService::new(state.db.clone());
    service.delete(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
