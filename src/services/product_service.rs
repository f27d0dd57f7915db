use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CatalogList, CreateProductRequest, SellerProductList, UpdateMyProductRequest},
    entity::{
        categories::{self, Entity as Categories},
        products::{self, ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
                   Model as ProductModel},
        sellers::{self, Column as SellerCol, Entity as Sellers, Model as SellerModel},
        users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller},
    models::{CatalogProduct, SellerProduct},
    response::{ApiResponse, Meta},
    routes::params::{CatalogQuery, CatalogSort},
    state::AppState,
    visibility::{self, ProductSnapshot, SellerSnapshot},
};

#[derive(Debug, FromQueryResult)]
struct CatalogRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    price: i64,
    stock_qty: i32,
    sold_count: i64,
    created_at: sea_orm::prelude::DateTimeWithTimeZone,
    category_code: Option<String>,
    category_name: Option<String>,
    seller_name: String,
    seller_active: bool,
    seller_subscription_end_at: Option<sea_orm::prelude::DateTimeWithTimeZone>,
}

/// Buyer-facing listing. The visibility rule is pushed into the WHERE clause
/// (see `visibility::storefront_condition`) so hidden rows are excluded
/// server-side; the page fetch and the total count share the predicate.
pub async fn list_catalog(
    state: &AppState,
    query: CatalogQuery,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<CatalogList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = visibility::storefront_condition(now);

    if let Some(code) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(categories::Column::Code.eq(code.clone()));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Products, ProdCol::Name)).ilike(pattern.clone()))
                .add(Expr::col((Products, ProdCol::Description)).ilike(pattern)),
        );
    }

    let mut finder = Products::find()
        .join(JoinType::InnerJoin, products::Relation::Sellers.def())
        .join(JoinType::InnerJoin, sellers::Relation::Users.def())
        .join(JoinType::LeftJoin, products::Relation::Categories.def())
        .filter(condition);

    finder = match query.sort.unwrap_or(CatalogSort::Newest) {
        CatalogSort::Newest => finder.order_by_desc(ProdCol::CreatedAt),
        CatalogSort::Sales => finder.order_by_desc(ProdCol::SoldCount),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .select_only()
        .columns([
            ProdCol::Id,
            ProdCol::Name,
            ProdCol::Description,
            ProdCol::ImageUrl,
            ProdCol::Price,
            ProdCol::StockQty,
            ProdCol::SoldCount,
            ProdCol::CreatedAt,
        ])
        .column_as(categories::Column::Code, "category_code")
        .column_as(categories::Column::Name, "category_name")
        .column_as(users::Column::Name, "seller_name")
        .column_as(SellerCol::IsActive, "seller_active")
        .column_as(SellerCol::SubscriptionEndAt, "seller_subscription_end_at")
        .limit(limit as u64)
        .offset(offset as u64)
        .into_model::<CatalogRow>()
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| catalog_product_from_row(row, now))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        CatalogList { items },
        Some(meta),
    ))
}

/// Single-product read for buyers; a product the evaluator hides is
/// indistinguishable from a missing one.
pub async fn get_catalog_product(
    state: &AppState,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<CatalogProduct>> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let seller = Sellers::find_by_id(product.seller_id)
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
    if state_now.is_hidden() {
        return Err(AppError::NotFound);
    }

    let category = match product.category_id {
        Some(cid) => Categories::find_by_id(cid).one(&state.orm).await?,
        None => None,
    };

    let item = CatalogProduct {
        id: product.id,
        name: product.name,
        description: product.description,
        image_url: product.image_url,
        price: product.price,
        stock_qty: product.stock_qty,
        sold_count: product.sold_count,
        category_code: category.as_ref().map(|c| c.code.clone()),
        category_name: category.map(|c| c.name),
        seller_name: seller_user.map(|u| u.name).unwrap_or_default(),
        visibility: state_now,
        created_at: product.created_at.with_timezone(&Utc),
    };

    Ok(ApiResponse::success("Product", item, None))
}

/// A seller's own inventory, every row labeled with its current state so the
/// dashboard can explain why something is not selling.
pub async fn list_my_products(
    state: &AppState,
    user: &AuthUser,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<SellerProductList>> {
    ensure_seller(user)?;
    let seller = seller_for_user(state, user.user_id).await?;

    let rows = Products::find()
        .filter(ProdCol::SellerId.eq(seller.id))
        .order_by_desc(ProdCol::UpdatedAt)
        .all(&state.orm)
        .await?;

    let snapshot = SellerSnapshot::of(&seller);
    let items = rows
        .into_iter()
        .map(|p| seller_product_from_entity(p, snapshot, now))
        .collect();

    Ok(ApiResponse::success(
        "My products",
        SellerProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_my_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<SellerProduct>> {
    ensure_seller(user)?;
    let seller = seller_for_user(state, user.user_id).await?;

    validate_name(&payload.name)?;
    validate_price(payload.price)?;
    validate_stock(payload.stock_qty)?;
    ensure_category_exists(state, payload.category_id).await?;

    let active = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller.id),
        category_id: Set(Some(payload.category_id)),
        name: Set(payload.name),
        description: Set(payload.description),
        image_url: Set(payload.image_url),
        price: Set(payload.price),
        stock_qty: Set(payload.stock_qty),
        sold_count: Set(0),
        is_active: Set(true),
        admin_deactivated: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let snapshot = SellerSnapshot::of(&seller);
    Ok(ApiResponse::success(
        "Product created",
        seller_product_from_entity(product, snapshot, now),
        Some(Meta::empty()),
    ))
}

pub async fn update_my_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateMyProductRequest,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<SellerProduct>> {
    ensure_seller(user)?;
    let seller = seller_for_user(state, user.user_id).await?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) if p.seller_id == seller.id => p,
        _ => return Err(AppError::NotFound),
    };

    // An admin-hidden product stays hidden no matter what the seller sends.
    if payload.is_active == Some(true) && existing.admin_deactivated {
        return Err(AppError::Forbidden(
            "this product has been deactivated by an admin and cannot be reactivated by the seller"
                .into(),
        ));
    }

    if let Some(name) = payload.name.as_deref() {
        validate_name(name)?;
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
    }
    if let Some(stock_qty) = payload.stock_qty {
        validate_stock(stock_qty)?;
    }
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(state, category_id).await?;
    }

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
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
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(now.into());
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let snapshot = SellerSnapshot::of(&seller);
    Ok(ApiResponse::success(
        "Product updated",
        seller_product_from_entity(product, snapshot, now),
        Some(Meta::empty()),
    ))
}

pub async fn seller_for_user(state: &AppState, user_id: Uuid) -> AppResult<SellerModel> {
    let seller = Sellers::find()
        .filter(SellerCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?;
    seller.ok_or(AppError::NotFound)
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    Ok(())
}

fn validate_price(price: i64) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::Validation("price must be positive".into()));
    }
    Ok(())
}

fn validate_stock(stock_qty: i32) -> AppResult<()> {
    if stock_qty < 0 {
        return Err(AppError::Validation("stock_qty must not be negative".into()));
    }
    Ok(())
}

async fn ensure_category_exists(state: &AppState, category_id: Uuid) -> AppResult<()> {
    let found = Categories::find_by_id(category_id).one(&state.orm).await?;
    if found.is_none() {
        return Err(AppError::Validation("unknown category".into()));
    }
    Ok(())
}

fn catalog_product_from_row(row: CatalogRow, now: DateTime<Utc>) -> CatalogProduct {
    // Rows already passed the storefront predicate; the evaluator only
    // distinguishes visible/low_stock/out_of_stock here.
    let state = visibility::evaluate(
        ProductSnapshot {
            active: true,
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
    CatalogProduct {
        id: row.id,
        name: row.name,
        description: row.description,
        image_url: row.image_url,
        price: row.price,
        stock_qty: row.stock_qty,
        sold_count: row.sold_count,
        category_code: row.category_code,
        category_name: row.category_name,
        seller_name: row.seller_name,
        visibility: state,
        created_at: row.created_at.with_timezone(&Utc),
    }
}

fn seller_product_from_entity(
    model: ProductModel,
    seller: SellerSnapshot,
    now: DateTime<Utc>,
) -> SellerProduct {
    let state = visibility::evaluate(ProductSnapshot::of(&model), Some(seller), now);
    SellerProduct {
        id: model.id,
        category_id: model.category_id,
        name: model.name,
        description: model.description,
        image_url: model.image_url,
        price: model.price,
        stock_qty: model.stock_qty,
        sold_count: model.sold_count,
        is_active: model.is_active,
        admin_deactivated: model.admin_deactivated,
        visibility: state,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
