use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::OrderList,
    dto::products::{AdminProductList, AdminProductPatch},
    entity::{
        categories::Entity as Categories,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders,
                 Model as OrderModel},
        products::{self, ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        sellers::{self, Column as SellerCol},
        users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{AdminProduct, Order},
    response::{ApiResponse, Meta},
    routes::admin::UpdateOrderStatusRequest,
    routes::params::{OrderListQuery, Pagination, SortOrder},
    state::AppState,
    visibility::{self, ProductSnapshot, SellerSnapshot},
};

#[derive(Debug, FromQueryResult)]
struct AdminProductRow {
    id: Uuid,
    seller_id: Uuid,
    category_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    price: i64,
    stock_qty: i32,
    sold_count: i64,
    is_active: bool,
    admin_deactivated: bool,
    created_at: sea_orm::prelude::DateTimeWithTimeZone,
    updated_at: sea_orm::prelude::DateTimeWithTimeZone,
    seller_name: String,
    seller_active: bool,
    seller_subscription_end_at: Option<sea_orm::prelude::DateTimeWithTimeZone>,
}

/// Management view: no visibility filter, raw flags plus the computed label
/// so the grid can show why a row is hidden.
pub async fn list_products_admin(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<AdminProductList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Products::find()
        .join(JoinType::InnerJoin, products::Relation::Sellers.def())
        .join(JoinType::InnerJoin, sellers::Relation::Users.def())
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .select_only()
        .columns([
            ProdCol::Id,
            ProdCol::SellerId,
            ProdCol::CategoryId,
            ProdCol::Name,
            ProdCol::Description,
            ProdCol::ImageUrl,
            ProdCol::Price,
            ProdCol::StockQty,
            ProdCol::SoldCount,
            ProdCol::IsActive,
            ProdCol::AdminDeactivated,
            ProdCol::CreatedAt,
            ProdCol::UpdatedAt,
        ])
        .column_as(users::Column::Name, "seller_name")
        .column_as(SellerCol::IsActive, "seller_active")
        .column_as(SellerCol::SubscriptionEndAt, "seller_subscription_end_at")
        .limit(limit as u64)
        .offset(offset as u64)
        .into_model::<AdminProductRow>()
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| admin_product_from_row(row, now))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        AdminProductList { items },
        Some(meta),
    ))
}

/// Admin product patch. Deactivating force-hides the product: the override
/// flag is set and seller toggles are refused until an admin clears it by
/// activating again.
pub async fn patch_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdminProductPatch,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<AdminProduct>> {
    ensure_admin(user)?;

    if let Some(price) = payload.price {
        if price <= 0 {
            return Err(AppError::Validation("price must be positive".into()));
        }
    }
    if let Some(stock_qty) = payload.stock_qty {
        if stock_qty < 0 {
            return Err(AppError::Validation("stock_qty must not be negative".into()));
        }
    }
    if let Some(category_id) = payload.category_id {
        let found = Categories::find_by_id(category_id).one(&state.orm).await?;
        if found.is_none() {
            return Err(AppError::Validation("unknown category".into()));
        }
    }

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".into()));
        }
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock_qty) = payload.stock_qty {
        active.stock_qty = Set(stock_qty);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    match payload.is_active {
        Some(false) => {
            active.is_active = Set(false);
            active.admin_deactivated = Set(true);
        }
        Some(true) => {
            active.is_active = Set(true);
            active.admin_deactivated = Set(false);
        }
        None => {}
    }
    active.updated_at = Set(now.into());
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_admin_update",
        Some("products"),
        Some(serde_json::json!({
            "product_id": product.id,
            "admin_deactivated": product.admin_deactivated,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    admin_product_response(state, product, now).await
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    validate_order_status(&payload.status)?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

fn validate_order_status(status: &str) -> Result<(), AppError> {
    const VALID: [&str; 5] = ["pending", "paid", "shipped", "completed", "cancelled"];
    if VALID.contains(&status) {
        Ok(())
    } else {
        Err(AppError::Validation("invalid order status".into()))
    }
}

async fn admin_product_response(
    state: &AppState,
    product: products::Model,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<AdminProduct>> {
    let seller = sellers::Entity::find_by_id(product.seller_id)
        .find_also_related(users::Entity)
        .one(&state.orm)
        .await?;
    let (seller, seller_user) = match seller {
        Some((s, u)) => (s, u),
        None => return Err(AppError::NotFound),
    };

    let state_now = visibility::evaluate(
        ProductSnapshot::of(&product),
        Some(SellerSnapshot::of(&seller)),
        now,
    );

    let item = AdminProduct {
        id: product.id,
        seller_id: product.seller_id,
        seller_name: seller_user.map(|u| u.name).unwrap_or_default(),
        seller_active: seller.is_active,
        seller_subscription_end_at: seller
            .subscription_end_at
            .map(|dt| dt.with_timezone(&Utc)),
        category_id: product.category_id,
        name: product.name,
        description: product.description,
        image_url: product.image_url,
        price: product.price,
        stock_qty: product.stock_qty,
        sold_count: product.sold_count,
        is_active: product.is_active,
        admin_deactivated: product.admin_deactivated,
        visibility: state_now,
        created_at: product.created_at.with_timezone(&Utc),
        updated_at: product.updated_at.with_timezone(&Utc),
    };

    Ok(ApiResponse::success("Product", item, Some(Meta::empty())))
}

fn admin_product_from_row(row: AdminProductRow, now: DateTime<Utc>) -> AdminProduct {
    let state = visibility::evaluate(
        ProductSnapshot {
            active: row.is_active,
            stock_qty: row.stock_qty,
        },
        Some(SellerSnapshot {
            active: row.seller_active,
            subscription_end_at: row
                .seller_subscription_end_at
                .map(|dt| dt.with_timezone(&Utc)),
        }),
        now,
    );
    AdminProduct {
        id: row.id,
        seller_id: row.seller_id,
        seller_name: row.seller_name,
        seller_active: row.seller_active,
        seller_subscription_end_at: row
            .seller_subscription_end_at
            .map(|dt| dt.with_timezone(&Utc)),
        category_id: row.category_id,
        name: row.name,
        description: row.description,
        image_url: row.image_url,
        price: row.price,
        stock_qty: row.stock_qty,
        sold_count: row.sold_count,
        is_active: row.is_active,
        admin_deactivated: row.admin_deactivated,
        visibility: state,
        created_at: row.created_at.with_timezone(&Utc),
        updated_at: row.updated_at.with_timezone(&Utc),
    }
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: model.status,
        payment_status: model.payment_status,
        invoice_number: model.invoice_number,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
