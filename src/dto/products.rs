use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{AdminProduct, CatalogProduct, SellerProduct};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: i64,
    pub stock_qty: i32,
    pub category_id: Uuid,
}

/// Seller self-service update. `is_active: true` is rejected while the
/// admin override is set.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMyProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<i64>,
    pub stock_qty: Option<i32>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Admin patch. `is_active: false` force-hides the product (sets the
/// override flag); `is_active: true` clears it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<i64>,
    pub stock_qty: Option<i32>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct CatalogList {
    pub items: Vec<CatalogProduct>,
}

#[derive(Serialize, ToSchema)]
pub struct SellerProductList {
    pub items: Vec<SellerProduct>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminProductList {
    pub items: Vec<AdminProduct>,
}
