//! Customer HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use shared::Customer;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::services::customer::{CustomerInput, CustomerService, CustomerWithCount};
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct CustomerSearchQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_customers(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CustomerSearchQuery>,
) -> AppResult<Json<Vec<CustomerWithCount>>> {
    let service = CustomerService::new(state.db.clone());
    let customers = service.search(query.search.as_deref(), query.limit).await?;
    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    AppPath(customer_id): AppPath<Uuid>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.db.clone());
    Ok(Json(service.get(customer_id).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    AppJson(input): AppJson<CustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let service = CustomerService::new(state.db.clone());
    Ok((StatusCode::CREATED, Json(service.create(input).await?)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    AppPath(customer_id): AppPath<Uuid>,
    AppJson(input): AppJson<CustomerInput>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.db.clone());
    Ok(Json(service.update(customer_id, input).await?))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    AppPath(customer_id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    let service = CustomerService::new(state.db.clone());
    service.delete(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
