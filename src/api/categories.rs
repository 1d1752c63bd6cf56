use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_id, validate_name};
use super::{ApiError, ApiResponse, AppState, CategoryDto, MessageResponse};

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CategoryDto>>>, ApiError> {
    let categories = state.store.list_categories().await?;
    Ok(Json(ApiResponse::success(
        categories.into_iter().map(CategoryDto::from).collect(),
    )))
}

pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    validate_id("category", id)?;

    let category = state
        .store
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", id))?;

    Ok(Json(ApiResponse::success(category.into())))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryDto>>), ApiError> {
    let name = validate_name("Category name", &payload.name)?;

    let category = state
        .store
        .create_category(name, payload.description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(category.into())),
    ))
}

/// An empty `description` clears it.
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    validate_id("category", id)?;

    let name = payload
        .name
        .as_deref()
        .map(|n| validate_name("Category name", n))
        .transpose()?;
    let description = payload
        .description
        .map(|d| (!d.trim().is_empty()).then_some(d));

    let category = state
        .store
        .update_category(id, name, description)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", id))?;

    Ok(Json(ApiResponse::success(category.into())))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_id("category", id)?;

    if !state.store.delete_category(id).await? {
        return Err(ApiError::not_found("Category", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Category deleted",
    ))))
}
