//! Sale handlers.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ApiJson, ApiPath, ApiQuery};
use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::services::sale::NewSaleRequest;
use crate::AppState;
use tillpoint_core::Sale;
use tillpoint_db::SaleFilter;

/// Query parameters of `GET /api/sales`.
#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub branch_id: Option<String>,
    pub user_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl From<SalesQuery> for SaleFilter {
    fn from(q: SalesQuery) -> Self {
        SaleFilter {
            branch_id: q.branch_id,
            user_id: q.user_id,
            start: q.start,
            end: q.end,
            limit: q.limit,
        }
    }
}

/// `POST /api/sales`
pub async fn create_sale(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiJson(request): ApiJson<NewSaleRequest>,
) -> ApiResult<Json<Sale>> {
    let sale = state.sales.create_sale(&caller, request).await?;
    Ok(Json(sale))
}

/// `GET /api/sales`
pub async fn list_sales(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let sales = state.sales.list_sales(&caller, &query.into()).await?;
    Ok(Json(sales))
}

/// `GET /api/sales/{id}`
pub async fn get_sale(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Sale>> {
    let sale = state.sales.get_sale(&caller, &id).await?;
    Ok(Json(sale))
}
