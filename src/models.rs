use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::visibility::VisibilityState;

/// Buyer-facing listing row. Hidden products never reach this shape; the
/// visibility field is one of visible/low_stock/out_of_stock.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: i64,
    pub stock_qty: i32,
    pub sold_count: i64,
    pub category_code: Option<String>,
    pub category_name: Option<String>,
    pub seller_name: String,
    pub visibility: VisibilityState,
    pub created_at: DateTime<Utc>,
}

/// A seller's own product, labeled but never filtered.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SellerProduct {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: i64,
    pub stock_qty: i32,
    pub sold_count: i64,
    pub is_active: bool,
    pub admin_deactivated: bool,
    pub visibility: VisibilityState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin management row: raw flags plus the seller snapshot the visibility
/// was computed from.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminProduct {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub seller_active: bool,
    pub seller_subscription_end_at: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: i64,
    pub stock_qty: i32,
    pub sold_count: i64,
    pub is_active: bool,
    pub admin_deactivated: bool,
    pub visibility: VisibilityState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    pub invoice_number: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}
