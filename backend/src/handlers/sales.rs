//! Sales HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;
use shared::stock::{SaleReceipt, VoidReceipt};
use shared::{PaginatedResponse, Sale, StatsPeriod};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::CurrentUser;
use crate::services::reporting::{ReportFilter, ReportingService, SalesReport, SalesStats};
use crate::services::sale::{
    CreateSaleInput, SaleDetail, SaleFilter, SaleService, SaleSummary, UpdateSaleInput,
};
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct StatsQuery {
    #[serde(default)]
    pub period: StatsPeriod,
}

fn service(state: &AppState) -> SaleService {
    SaleService::new(state.db.clone(), state.engine)
}

pub async fn list_sales(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<SaleFilter>,
) -> AppResult<Json<PaginatedResponse<SaleSummary>>> {
    let sales = service(&state)
        .list(filter, state.config.store.default_page_size)
        .await?;
    Ok(Json(sales))
}

pub async fn get_sale(
    State(state): State<AppState>,
    AppPath(sale_id): AppPath<Uuid>,
) -> AppResult<Json<SaleDetail>> {
    Ok(Json(service(&state).get(sale_id).await?))
}

/// Ring up a sale for the logged-in seller
pub async fn create_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(input): AppJson<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<SaleReceipt>)> {
    let receipt = service(&state).create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn update_sale(
    State(state): State<AppState>,
    AppPath(sale_id): AppPath<Uuid>,
    AppJson(input): AppJson<UpdateSaleInput>,
) -> AppResult<Json<Sale>> {
    Ok(Json(service(&state).update(sale_id, input).await?))
}

/// DELETE voids the sale and restocks its items
pub async fn void_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(sale_id): AppPath<Uuid>,
) -> AppResult<Json<VoidReceipt>> {
    Ok(Json(service(&state).void(sale_id, user.user_id).await?))
}

pub async fn sales_stats(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<StatsQuery>,
) -> AppResult<Json<SalesStats>> {
    let range = query.period.range(Utc::now(), state.engine.utc_offset());
    let stats = ReportingService::new(state.db.clone())
        .stats(query.period, range)
        .await?;
    Ok(Json(stats))
}

pub async fn sales_reports(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<ReportFilter>,
) -> AppResult<Json<SalesReport>> {
    let report = ReportingService::new(state.db.clone())
        .report(filter, state.engine.utc_offset())
        .await?;
    Ok(Json(report))
}
