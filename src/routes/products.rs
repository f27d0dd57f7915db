use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::products::CatalogList,
    error::AppResult,
    models::CatalogProduct,
    response::ApiResponse,
    routes::params::CatalogQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/{id}", get(get_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("category" = Option<String>, Query, description = "Category code filter"),
        ("q" = Option<String>, Query, description = "Free-text search"),
        ("sort" = Option<String>, Query, description = "Sort key: newest, sales"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Buyer-facing product listing", body = ApiResponse<CatalogList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<ApiResponse<CatalogList>>> {
    let resp = product_service::list_catalog(&state, query, Utc::now()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<CatalogProduct>),
        (status = 404, description = "Product not found or hidden"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CatalogProduct>>> {
    let resp = product_service::get_catalog_product(&state, id, Utc::now()).await?;
    Ok(Json(resp))
}
