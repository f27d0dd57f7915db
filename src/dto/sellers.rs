use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-seller inventory breakdown computed in SQL with the same visibility
/// rule the storefront uses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductCounts {
    pub total: i64,
    pub in_stock: i64,
    pub low_stock: i64,
    pub hidden_or_out_of_stock: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerOverview {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub subscription_end_at: Option<DateTime<Utc>>,
    pub product_counts: ProductCounts,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerList {
    pub items: Vec<SellerOverview>,
}

/// Admin mutation entry point; maps onto the lifecycle cascades, never
/// direct field writes.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSellerRequest {
    pub is_active: Option<bool>,
    pub subscription_end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub subscription_end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepOutcome {
    pub deactivated_count: u64,
    pub warnings_sent: u64,
}
