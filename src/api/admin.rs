//! Administrative endpoints.
//!
//! Callers identify themselves with `?user_id=`; the referenced account must
//! carry the admin flag.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DashboardStats};
use crate::db::User;
use crate::models::order::OrderStatus;
use crate::services::{DesiredAdmin, ReconcileResult};

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub user_id: Option<i32>,
}

/// Resolves `user_id` to an admin account or fails with 403.
pub(crate) async fn require_admin(
    state: &AppState,
    user_id: Option<i32>,
) -> Result<User, ApiError> {
    let Some(user_id) = user_id else {
        return Err(ApiError::forbidden("Admin access required"));
    };

    match state.store.get_user(user_id).await? {
        Some(user) if user.is_admin => Ok(user),
        _ => {
            tracing::warn!(user_id, "Rejected non-admin access to admin endpoint");
            Err(ApiError::forbidden("Admin access required"))
        }
    }
}

/// `GET /api/admin/dashboard`
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    require_admin(&state, query.user_id).await?;

    let store = &state.store;
    let stats = DashboardStats {
        total_users: store.user_count().await?,
        total_orders: store.order_count().await?,
        total_menu_items: store.menu_item_count().await?,
        pending_orders: store.order_count_with_status(OrderStatus::Pending).await?,
        total_revenue: store.revenue().await?,
    };

    Ok(Json(ApiResponse::success(stats)))
}

/// `GET /api/admin/users`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    require_admin(&state, query.user_id).await?;

    let users = state.store.list_users().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// `POST /api/admin/reconcile`
///
/// Re-applies the configured bootstrap credentials to the admin account.
pub async fn reconcile_admin(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<ApiResponse<ReconcileResult>>, ApiError> {
    let caller = require_admin(&state, query.user_id).await?;

    let desired = DesiredAdmin::from(&state.config.admin);
    let result = state.reconciler.reconcile(&desired).await;

    let outcome = match &result {
        Ok(ReconcileResult::Created { .. }) => "created",
        Ok(ReconcileResult::Updated { .. }) => "updated",
        Ok(ReconcileResult::Reconciled { .. }) => "reconciled",
        Err(_) => "failed",
    };
    metrics::counter!("admin_reconciliations_total", "outcome" => outcome).increment(1);

    let result = result?;
    tracing::info!(caller_id = caller.id, %result, "Admin reconciliation requested over HTTP");

    Ok(Json(ApiResponse::success(result)))
}
