use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, SellerProductList, UpdateMyProductRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::SellerProduct,
    response::ApiResponse,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_my_products))
        .route("/products", post(create_product))
        .route("/products/{id}", patch(update_product))
}

#[utoipa::path(
    get,
    path = "/api/seller/products",
    responses(
        (status = 200, description = "The seller's own products, visibility-labeled", body = ApiResponse<SellerProductList>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Seller profile not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn list_my_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerProductList>>> {
    let resp = product_service::list_my_products(&state, &user, Utc::now()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/seller/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<SellerProduct>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<SellerProduct>>> {
    let resp = product_service::create_my_product(&state, &user, payload, Utc::now()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/seller/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateMyProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<SellerProduct>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin override in effect"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMyProductRequest>,
) -> AppResult<Json<ApiResponse<SellerProduct>>> {
    let resp = product_service::update_my_product(&state, &user, id, payload, Utc::now()).await?;
    Ok(Json(resp))
}
