//! Stock handlers.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ApiJson, ApiPath, ApiQuery};
use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::services::inventory::{MovementRequest, RecordedMovement};
use crate::AppState;
use tillpoint_core::{MovementType, Product, StockMovement, StockReconciliation};
use tillpoint_db::MovementFilter;

/// Query parameters of `GET /api/stock/movements`.
#[derive(Debug, Default, Deserialize)]
pub struct MovementsQuery {
    pub product_id: Option<String>,
    pub branch_id: Option<String>,
    pub movement_type: Option<MovementType>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl From<MovementsQuery> for MovementFilter {
    fn from(q: MovementsQuery) -> Self {
        MovementFilter {
            product_id: q.product_id,
            branch_id: q.branch_id,
            movement_type: q.movement_type,
            start: q.start,
            end: q.end,
            limit: q.limit,
        }
    }
}

/// Query parameters of `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub limit: Option<u32>,
}

/// `GET /api/products`
pub async fn list_products(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiQuery(query): ApiQuery<ProductsQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state.inventory.list_products(&caller, query.limit).await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}`
pub async fn get_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.inventory.lookup_product(&caller, &id).await?))
}

/// `POST /api/stock/movements`
pub async fn record_movement(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiJson(request): ApiJson<MovementRequest>,
) -> ApiResult<Json<RecordedMovement>> {
    let recorded = state.inventory.record_movement(&caller, request).await?;
    Ok(Json(recorded))
}

/// `GET /api/stock/movements`
pub async fn list_movements(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiQuery(query): ApiQuery<MovementsQuery>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    let movements = state.inventory.list_movements(&caller, &query.into()).await?;
    Ok(Json(movements))
}

/// `GET /api/stock/reconcile/{product_id}`
pub async fn reconcile(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiPath(product_id): ApiPath<String>,
) -> ApiResult<Json<StockReconciliation>> {
    let report = state.inventory.reconcile(&caller, &product_id).await?;
    Ok(Json(report))
}
