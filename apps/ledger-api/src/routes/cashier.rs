//! Cash drawer handlers.

use axum::extract::State;
use axum::Json;

use super::ApiJson;
use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::services::drawer::{
    CloseDrawerRequest, DrawerTransactionReceipt, DrawerTransactionRequest, OpenDrawerRequest,
};
use crate::AppState;
use tillpoint_core::{CashDrawer, DrawerCloseReport};

/// `POST /api/cashier/open`
pub async fn open(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiJson(request): ApiJson<OpenDrawerRequest>,
) -> ApiResult<Json<CashDrawer>> {
    Ok(Json(state.drawers.open(&caller, request).await?))
}

/// `GET /api/cashier/current`
pub async fn current(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> ApiResult<Json<CashDrawer>> {
    Ok(Json(state.drawers.current(&caller).await?))
}

/// `POST /api/cashier/transaction`
pub async fn record_transaction(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiJson(request): ApiJson<DrawerTransactionRequest>,
) -> ApiResult<Json<DrawerTransactionReceipt>> {
    Ok(Json(state.drawers.record_transaction(&caller, request).await?))
}

/// `POST /api/cashier/close`
pub async fn close(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    ApiJson(request): ApiJson<CloseDrawerRequest>,
) -> ApiResult<Json<DrawerCloseReport>> {
    Ok(Json(state.drawers.close(&caller, request).await?))
}
