use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    AppState,
    api::models::items::{ItemCreate, ItemRepeatableCreate, ItemResponse, ItemUpdate, ProcessItemsResponse},
    db::errors::DbError,
    errors::{Error, Result},
    types::ItemId,
};

fn item_not_found(id: ItemId) -> Error {
    Error::NotFound {
        resource: "Item".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    summary = "List items",
    responses(
        (status = 200, description = "All items, in ascending id order", body = [ItemResponse]),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<ItemResponse>>> {
    let items = state.store.list().await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    summary = "Create item",
    request_body = ItemCreate,
    responses(
        (status = 201, description = "Item created successfully", body = ItemResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_item(State(state): State<AppState>, Json(create): Json<ItemCreate>) -> Result<(StatusCode, Json<ItemResponse>)> {
    create.validate()?;

    let item = state.store.create(&create.into_new_item()).await?;
    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

#[utoipa::path(
    post,
    path = "/items/repeatable",
    tag = "items",
    summary = "Create several copies of an item",
    request_body = ItemRepeatableCreate,
    responses(
        (status = 201, description = "Copies created; echoes the submitted item", body = ItemCreate),
        (status = 400, description = "Invalid item or count out of range"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(count = request.count))]
pub async fn create_repeatable_items(
    State(state): State<AppState>,
    Json(request): Json<ItemRepeatableCreate>,
) -> Result<(StatusCode, Json<ItemCreate>)> {
    request.validate(state.config.limits.max_repeat)?;

    let ItemRepeatableCreate { item, count } = request;
    let created = state.store.create_many(&item.clone().into_new_item(), count).await?;
    tracing::debug!(created = created.len(), "Created repeated items");

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/items/{item_id}",
    tag = "items",
    summary = "Get item",
    responses(
        (status = 200, description = "Item details", body = ItemResponse),
        (status = 404, description = "Item not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("item_id" = i64, Path, description = "Item ID")
    )
)]
#[tracing::instrument(skip_all, fields(item_id = %item_id))]
pub async fn get_item(State(state): State<AppState>, Path(item_id): Path<ItemId>) -> Result<Json<ItemResponse>> {
    match state.store.get(item_id).await? {
        Some(item) => Ok(Json(ItemResponse::from(item))),
        None => Err(item_not_found(item_id)),
    }
}

#[utoipa::path(
    put,
    path = "/items/{item_id}",
    tag = "items",
    summary = "Replace item",
    request_body = ItemUpdate,
    responses(
        (status = 200, description = "Item updated successfully", body = ItemResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Item not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("item_id" = i64, Path, description = "Item ID")
    )
)]
#[tracing::instrument(skip_all, fields(item_id = %item_id))]
pub async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
    Json(update): Json<ItemUpdate>,
) -> Result<Json<ItemResponse>> {
    update.validate()?;

    let existing = state.store.get(item_id).await?.ok_or_else(|| item_not_found(item_id))?;
    let item = state.store.put(&update.apply_to(existing)).await.map_err(|e| match e {
        // Deleted between the read and the write
        DbError::NotFound => item_not_found(item_id),
        other => Error::Database(other),
    })?;

    Ok(Json(ItemResponse::from(item)))
}

#[utoipa::path(
    delete,
    path = "/items/{item_id}",
    tag = "items",
    summary = "Delete item",
    responses(
        (status = 204, description = "Item deleted successfully"),
        (status = 404, description = "Item not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("item_id" = i64, Path, description = "Item ID")
    )
)]
#[tracing::instrument(skip_all, fields(item_id = %item_id))]
pub async fn delete_item(State(state): State<AppState>, Path(item_id): Path<ItemId>) -> Result<StatusCode> {
    if state.store.delete(item_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(item_not_found(item_id))
    }
}

#[utoipa::path(
    get,
    path = "/items/process",
    tag = "items",
    summary = "Process all items",
    description = "Marks every stored item as PROCESSED using the shared worker pool and waits for the run to finish.
Items deleted while the run is in progress are reported as skipped.",
    responses(
        (status = 200, description = "Run finished", body = ProcessItemsResponse),
        (status = 503, description = "The worker pool is shutting down"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn process_items(State(state): State<AppState>) -> Result<Json<ProcessItemsResponse>> {
    let handle = state.processor.process_all();
    tracing::debug!(run_id = %handle.run_id(), "Processing run started");

    let report = handle.await?;
    Ok(Json(ProcessItemsResponse::from(report)))
}
