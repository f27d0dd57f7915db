use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::sellers::{
        ProductCounts, SellerDetail, SellerList, SellerOverview, SweepOutcome,
        UpdateSellerRequest,
    },
    entity::{
        products::{Column as ProdCol, Entity as Products},
        sellers::{ActiveModel as SellerActive, Column as SellerCol, Entity as Sellers,
                  Model as SellerModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    state::AppState,
    visibility::LOW_STOCK_THRESHOLD,
};

/// Deactivate a seller and hide every product they own, in one transaction.
/// Readers never observe the seller flipped with stale product flags.
pub async fn deactivate_seller(
    state: &AppState,
    user: &AuthUser,
    seller_id: Uuid,
) -> AppResult<ApiResponse<SellerDetail>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let seller = Sellers::find_by_id(seller_id).one(&txn).await?;
    let seller = match seller {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: SellerActive = seller.into();
    active.is_active = Set(false);
    let seller = active.update(&txn).await?;

    Products::update_many()
        .col_expr(ProdCol::IsActive, Expr::value(false))
        .filter(ProdCol::SellerId.eq(seller_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "seller_deactivate",
        Some("sellers"),
        Some(serde_json::json!({ "seller_id": seller_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Seller deactivated",
        seller_detail(seller),
        Some(Meta::empty()),
    ))
}

/// Reactivate a seller and the products they own, except products an admin
/// has force-hidden. Those keep is_active=false until the override is
/// cleared.
pub async fn activate_seller(
    state: &AppState,
    user: &AuthUser,
    seller_id: Uuid,
) -> AppResult<ApiResponse<SellerDetail>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let seller = Sellers::find_by_id(seller_id).one(&txn).await?;
    let seller = match seller {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: SellerActive = seller.into();
    active.is_active = Set(true);
    let seller = active.update(&txn).await?;

    restore_products(&txn, seller_id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "seller_activate",
        Some("sellers"),
        Some(serde_json::json!({ "seller_id": seller_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Seller activated",
        seller_detail(seller),
        Some(Meta::empty()),
    ))
}

/// Renewal always reactivates, regardless of how the seller was deactivated
/// before (manual toggle or the expiry sweep).
pub async fn renew_subscription(
    state: &AppState,
    user: &AuthUser,
    seller_id: Uuid,
    new_end: DateTime<Utc>,
) -> AppResult<ApiResponse<SellerDetail>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let seller = Sellers::find_by_id(seller_id).one(&txn).await?;
    let seller = match seller {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let mut active: SellerActive = seller.into();
    active.subscription_end_at = Set(Some(new_end.into()));
    active.is_active = Set(true);
    let seller = active.update(&txn).await?;

    restore_products(&txn, seller_id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "subscription_renew",
        Some("sellers"),
        Some(serde_json::json!({ "seller_id": seller_id, "subscription_end_at": new_end })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Subscription renewed",
        seller_detail(seller),
        Some(Meta::empty()),
    ))
}

/// Admin entry point: toggles map to the activate/deactivate cascades and a
/// new end date maps to renewal, so field writes never bypass the cascade.
pub async fn update_seller(
    state: &AppState,
    user: &AuthUser,
    seller_id: Uuid,
    payload: UpdateSellerRequest,
) -> AppResult<ApiResponse<SellerDetail>> {
    ensure_admin(user)?;

    match (payload.is_active, payload.subscription_end_at) {
        (None, None) => Err(AppError::Validation(
            "nothing to update: provide is_active or subscription_end_at".into(),
        )),
        (Some(false), None) => deactivate_seller(state, user, seller_id).await,
        (Some(true), None) => activate_seller(state, user, seller_id).await,
        (toggle, Some(new_end)) => {
            match toggle {
                Some(false) => {
                    deactivate_seller(state, user, seller_id).await?;
                }
                Some(true) => {
                    activate_seller(state, user, seller_id).await?;
                }
                None => {}
            }
            // Renewal runs last and always reactivates.
            renew_subscription(state, user, seller_id, new_end).await
        }
    }
}

/// Deactivate every seller whose subscription lapsed before `now` and warn
/// sellers expiring within a day. Only `sellers.is_active` is touched;
/// product flags are left alone. Safe to re-run: already-inactive sellers
/// do not match the filter again.
pub async fn expire_sweep(state: &AppState, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
    let txn = state.orm.begin().await?;

    let expired = Sellers::find()
        .filter(
            Condition::all()
                .add(SellerCol::IsActive.eq(true))
                .add(SellerCol::SubscriptionEndAt.lt(now)),
        )
        .find_also_related(Users)
        .all(&txn)
        .await?;

    if !expired.is_empty() {
        Sellers::update_many()
            .col_expr(SellerCol::IsActive, Expr::value(false))
            .filter(SellerCol::Id.is_in(expired.iter().map(|(s, _)| s.id).collect::<Vec<_>>()))
            .exec(&txn)
            .await?;
    }

    let warned = Sellers::find()
        .filter(
            Condition::all()
                .add(SellerCol::IsActive.eq(true))
                .add(SellerCol::SubscriptionEndAt.gt(now))
                .add(SellerCol::SubscriptionEndAt.lt(now + Duration::days(1))),
        )
        .find_also_related(Users)
        .all(&txn)
        .await?;

    txn.commit().await?;

    // Notification delivery is mocked: log only, at-least-once.
    for (seller, user) in &expired {
        tracing::info!(
            seller_id = %seller.id,
            contact = %contact_of(user),
            "subscription expired, seller deactivated; renewal required to restore visibility"
        );
    }
    for (seller, user) in &warned {
        tracing::info!(
            seller_id = %seller.id,
            contact = %contact_of(user),
            "subscription expires in less than 24 hours"
        );
    }

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "subscription_sweep",
        Some("sellers"),
        Some(serde_json::json!({
            "deactivated": expired.len(),
            "warned": warned.len(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(SweepOutcome {
        deactivated_count: expired.len() as u64,
        warnings_sent: warned.len() as u64,
    })
}

#[derive(Debug, sqlx::FromRow)]
struct SellerStatsRow {
    id: Uuid,
    is_active: bool,
    subscription_end_at: Option<DateTime<Utc>>,
    user_name: String,
    user_phone: Option<String>,
    user_email: Option<String>,
    total_products: i64,
    in_stock_products: i64,
    low_stock_products: i64,
    oos_products: i64,
}

/// Admin dashboard rows: each seller with inventory counts bucketed by the
/// same rule the storefront filters on, computed in SQL so the dashboard and
/// the listing can never disagree.
pub async fn list_sellers(
    state: &AppState,
    user: &AuthUser,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<SellerList>> {
    ensure_admin(user)?;

    let rows = sqlx::query_as::<_, SellerStatsRow>(
        r#"
        SELECT s.id, s.is_active, s.subscription_end_at,
               u.name AS user_name,
               u.phone AS user_phone,
               u.email AS user_email,
               COUNT(p.id) AS total_products,
               COALESCE(SUM(CASE
                 WHEN p.id IS NOT NULL
                      AND p.is_active
                      AND s.is_active
                      AND (s.subscription_end_at IS NULL OR s.subscription_end_at >= $1)
                      AND p.stock_qty > $2
                 THEN 1 ELSE 0 END), 0) AS in_stock_products,
               COALESCE(SUM(CASE
                 WHEN p.id IS NOT NULL
                      AND p.is_active
                      AND s.is_active
                      AND (s.subscription_end_at IS NULL OR s.subscription_end_at >= $1)
                      AND p.stock_qty > 0 AND p.stock_qty <= $2
                 THEN 1 ELSE 0 END), 0) AS low_stock_products,
               COALESCE(SUM(CASE
                 WHEN p.id IS NOT NULL
                      AND (p.stock_qty = 0
                           OR NOT p.is_active
                           OR NOT s.is_active
                           OR (s.subscription_end_at IS NOT NULL AND s.subscription_end_at < $1))
                 THEN 1 ELSE 0 END), 0) AS oos_products
        FROM sellers s
        JOIN users u ON u.id = s.user_id
        LEFT JOIN products p ON p.seller_id = s.id
        GROUP BY s.id, u.name, u.phone, u.email
        ORDER BY s.created_at DESC
        "#,
    )
    .bind(now)
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| SellerOverview {
            id: row.id,
            name: row.user_name,
            phone: row.user_phone,
            email: row.user_email,
            is_active: row.is_active,
            subscription_end_at: row.subscription_end_at,
            product_counts: ProductCounts {
                total: row.total_products,
                in_stock: row.in_stock_products,
                low_stock: row.low_stock_products,
                hidden_or_out_of_stock: row.oos_products,
            },
        })
        .collect();

    Ok(ApiResponse::success(
        "Sellers",
        SellerList { items },
        Some(Meta::empty()),
    ))
}

async fn restore_products<C: ConnectionTrait>(conn: &C, seller_id: Uuid) -> AppResult<()> {
    Products::update_many()
        .col_expr(ProdCol::IsActive, Expr::value(true))
        .filter(
            Condition::all()
                .add(ProdCol::SellerId.eq(seller_id))
                .add(ProdCol::AdminDeactivated.eq(false)),
        )
        .exec(conn)
        .await?;
    Ok(())
}

fn contact_of(user: &Option<crate::entity::users::Model>) -> String {
    user.as_ref()
        .and_then(|u| u.email.clone().or_else(|| u.phone.clone()))
        .unwrap_or_else(|| "-".into())
}

fn seller_detail(model: SellerModel) -> SellerDetail {
    SellerDetail {
        id: model.id,
        user_id: model.user_id,
        is_active: model.is_active,
        subscription_end_at: model.subscription_end_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}
