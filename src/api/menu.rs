use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_id, validate_name, validate_price, validate_search_query};
use super::{ApiError, ApiResponse, AppState, CreatedMenuItemDto, MenuItemDto, MessageResponse};
use crate::db::{MenuFilter, MenuItemPatch, NewMenuItem};

#[derive(Debug, Deserialize, Default)]
pub struct MenuQuery {
    pub category_id: Option<i32>,
    pub available: Option<bool>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateMenuItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category_id: i32,
    pub image_url: Option<String>,
    pub available: Option<bool>,
}

#[derive(Deserialize, Default)]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<i32>,
    /// An empty string clears the image.
    pub image_url: Option<String>,
    pub available: Option<bool>,
}

async fn ensure_category_exists(state: &AppState, category_id: i32) -> Result<(), ApiError> {
    validate_id("category", category_id)?;
    if state.store.get_category(category_id).await?.is_none() {
        return Err(ApiError::validation(format!(
            "Category {} does not exist",
            category_id
        )));
    }
    Ok(())
}

pub async fn list_menu_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<ApiResponse<Vec<MenuItemDto>>>, ApiError> {
    let filter = MenuFilter {
        category_id: query.category_id,
        available: query.available,
        search: query.search.as_deref().and_then(validate_search_query),
    };

    let items = state.store.list_menu_items(&filter).await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(MenuItemDto::from).collect(),
    )))
}

pub async fn get_menu_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MenuItemDto>>, ApiError> {
    validate_id("menu item", id)?;

    let item = state
        .store
        .get_menu_item(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu item", id))?;

    Ok(Json(ApiResponse::success(item.into())))
}

pub async fn create_menu_item(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedMenuItemDto>>), ApiError> {
    let name = validate_name("Menu item name", &payload.name)?;
    let price = validate_price(payload.price)?;
    ensure_category_exists(&state, payload.category_id).await?;

    let item = state
        .store
        .create_menu_item(NewMenuItem {
            name,
            description: payload.description.trim().to_string(),
            price,
            category_id: payload.category_id,
            image_url: payload.image_url.filter(|url| !url.trim().is_empty()),
            available: payload.available.unwrap_or(true),
        })
        .await?;

    tracing::info!(menu_item_id = item.id, name = %item.name, "Menu item created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedMenuItemDto {
            id: item.id,
            name: item.name,
        })),
    ))
}

pub async fn update_menu_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> Result<Json<ApiResponse<MenuItemDto>>, ApiError> {
    validate_id("menu item", id)?;

    let name = payload
        .name
        .as_deref()
        .map(|n| validate_name("Menu item name", n))
        .transpose()?;
    let price = payload.price.map(validate_price).transpose()?;
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state, category_id).await?;
    }

    let patch = MenuItemPatch {
        name,
        description: payload.description.map(|d| d.trim().to_string()),
        price,
        category_id: payload.category_id,
        image_url: payload
            .image_url
            .map(|url| (!url.trim().is_empty()).then_some(url)),
        available: payload.available,
    };

    let item = state
        .store
        .update_menu_item(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu item", id))?;

    Ok(Json(ApiResponse::success(item.into())))
}

/// Items referenced by past orders cannot be deleted; mark them unavailable instead.
pub async fn delete_menu_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_id("menu item", id)?;

    if state.store.get_menu_item(id).await?.is_none() {
        return Err(ApiError::not_found("Menu item", id));
    }

    if state.store.menu_item_is_ordered(id).await? {
        return Err(ApiError::Conflict(format!(
            "Menu item {} appears in existing orders; mark it unavailable instead",
            id
        )));
    }

    state.store.delete_menu_item(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Menu item deleted",
    ))))
}
