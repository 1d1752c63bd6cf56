use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::admin::require_admin;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::models::order::{OrderDetail, OrderLine, OrderStatus, OrderSummary};

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i32,
    pub items: Vec<OrderLine>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    /// The admin performing the change.
    pub user_id: Option<i32>,
    pub status: String,
}

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<OrderSummary>>>, ApiError> {
    let orders = state.store.list_orders().await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<OrderDetail>>, ApiError> {
    validate_id("order", id)?;

    let order = state
        .store
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))?;

    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_user_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<OrderSummary>>>, ApiError> {
    validate_id("user", user_id)?;

    if state.store.get_user(user_id).await?.is_none() {
        return Err(ApiError::not_found("User", user_id));
    }

    let orders = state.store.list_orders_for_user(user_id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Line prices are taken from the menu at the time of ordering, never from the client.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>), ApiError> {
    validate_id("user", payload.user_id)?;

    let order = state
        .store
        .create_order(payload.user_id, &payload.items)
        .await?;

    metrics::counter!("orders_placed_total").increment(1);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>, ApiError> {
    validate_id("order", id)?;
    let admin = require_admin(&state, payload.user_id).await?;

    let status: OrderStatus = payload.status.parse().map_err(ApiError::validation)?;

    if state.store.update_order_status(id, status).await?.is_none() {
        return Err(ApiError::not_found("Order", id));
    }

    tracing::info!(order_id = id, %status, admin_id = admin.id, "Order status updated");

    let order = state
        .store
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))?;

    Ok(Json(ApiResponse::success(order)))
}

pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_id("order", id)?;

    if !state.store.delete_order(id).await? {
        return Err(ApiError::not_found("Order", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Order deleted",
    ))))
}
