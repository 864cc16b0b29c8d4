//! OpenAPI documentation for the item API (`/api/*`).

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "itemctl",
        description = "Item management with concurrent batch processing"
    ),
    servers(
        (url = "/api", description = "Item API server")
    ),
    paths(
        api::handlers::items::list_items,
        api::handlers::items::create_item,
        api::handlers::items::create_repeatable_items,
        api::handlers::items::get_item,
        api::handlers::items::update_item,
        api::handlers::items::delete_item,
        api::handlers::items::process_items,
    ),
    components(
        schemas(
            api::models::items::ItemCreate,
            api::models::items::ItemUpdate,
            api::models::items::ItemRepeatableCreate,
            api::models::items::ItemResponse,
            api::models::items::FailedItemResponse,
            api::models::items::ProcessItemsResponse,
        )
    ),
    tags(
        (name = "items", description = "Item CRUD and batch processing")
    )
)]
pub struct ApiDoc;
