use agrimarket_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool},
    dto::orders::{OrderLineRequest, PlaceOrderRequest},
    dto::products::UpdateMyProductRequest,
    entity::{
        categories::ActiveModel as CategoryActive,
        products::{ActiveModel as ProductActive, Entity as Products},
        sellers::{ActiveModel as SellerActive, Entity as Sellers},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{CatalogQuery, Pagination},
    services::{order_service, product_service, seller_service},
    state::AppState,
    visibility::{self, ProductSnapshot, SellerSnapshot, VisibilityState},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use uuid::Uuid;

// End-to-end flow over a real database: seller lifecycle cascades, the
// stale-flag sweep, the admin override, storefront filtering and checkout
// gating. Skipped unless a database is configured.
#[tokio::test]
async fn subscription_and_visibility_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let now = Utc::now();

    let admin_id = create_user(&state, "admin", "Admin", "admin@test.local").await?;
    let buyer_id = create_user(&state, "buyer", "Buyer", "buyer@test.local").await?;
    let farmer_user = create_user(&state, "seller", "Farmer", "farmer@test.local").await?;
    let orchard_user = create_user(&state, "seller", "Orchard", "orchard@test.local").await?;

    let admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };
    let buyer = AuthUser {
        user_id: buyer_id,
        role: "buyer".into(),
    };
    let farmer = AuthUser {
        user_id: farmer_user,
        role: "seller".into(),
    };

    let category = create_category(&state, "vegetables", "Vegetables").await?;

    // Farmer: healthy subscription, one sellable product and one the admin
    // has force-hidden.
    let farmer_seller =
        create_seller(&state, farmer_user, true, Some(now + Duration::days(30))).await?;
    let tomato = create_product(&state, farmer_seller, category, "Tomatoes", 4500, 20, true, false)
        .await?;
    let overridden =
        create_product(&state, farmer_seller, category, "Pesticide X", 9900, 15, false, true)
            .await?;

    // Orchard: subscription lapsed yesterday, flag still true (the sweep has
    // not run yet).
    let orchard_seller =
        create_seller(&state, orchard_user, true, Some(now - Duration::days(1))).await?;
    let mango =
        create_product(&state, orchard_seller, category, "Mangoes", 60000, 40, true, false).await?;

    // The stale flag does not leak inventory: the expiry check hides it.
    assert_eq!(evaluate_product(&state, mango, now).await?, VisibilityState::HiddenSubscriptionExpired);

    // Storefront shows only the farmer's sellable product.
    let listing = product_service::list_catalog(&state, catalog_query(), now).await?;
    let items = listing.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, tomato);
    assert_eq!(items[0].visibility, VisibilityState::Visible);
    assert_eq!(listing.meta.unwrap().total, Some(1));

    // Deactivating the farmer cascades to the owned products, so the
    // product-level flag wins in the evaluator.
    seller_service::deactivate_seller(&state, &admin, farmer_seller).await?;
    assert_eq!(
        evaluate_product(&state, tomato, now).await?,
        VisibilityState::HiddenInactiveProduct
    );
    let listing = product_service::list_catalog(&state, catalog_query(), now).await?;
    assert!(listing.data.unwrap().items.is_empty());

    // Reactivation restores products but never the overridden one.
    seller_service::activate_seller(&state, &admin, farmer_seller).await?;
    let p = Products::find_by_id(overridden).one(&state.orm).await?.unwrap();
    assert!(!p.is_active);
    assert!(p.admin_deactivated);
    let p = Products::find_by_id(tomato).one(&state.orm).await?.unwrap();
    assert!(p.is_active);

    // The seller cannot undo the override themselves.
    let err = product_service::update_my_product(
        &state,
        &farmer,
        overridden,
        UpdateMyProductRequest {
            name: None,
            description: None,
            image_url: None,
            price: None,
            stock_qty: None,
            category_id: None,
            is_active: Some(true),
        },
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let p = Products::find_by_id(overridden).one(&state.orm).await?.unwrap();
    assert!(!p.is_active);

    // Checkout against the expired-subscription seller is rejected.
    let err = order_service::place_order(
        &state,
        &buyer,
        PlaceOrderRequest {
            items: vec![OrderLineRequest {
                product_id: mango,
                quantity: 2,
            }],
            address: "Village Road 1".into(),
        },
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Renewal reactivates the orchard; stock level decides the label.
    seller_service::renew_subscription(&state, &admin, orchard_seller, now + Duration::days(30))
        .await?;
    set_stock(&state, mango, 5).await?;
    assert_eq!(evaluate_product(&state, mango, now).await?, VisibilityState::LowStock);
    set_stock(&state, mango, 0).await?;
    assert_eq!(evaluate_product(&state, mango, now).await?, VisibilityState::OutOfStock);
    set_stock(&state, mango, 40).await?;

    // A purchasable product moves stock and sold_count atomically.
    let resp = order_service::place_order(
        &state,
        &buyer,
        PlaceOrderRequest {
            items: vec![OrderLineRequest {
                product_id: mango,
                quantity: 3,
            }],
            address: "Village Road 1".into(),
        },
        now,
    )
    .await?;
    let placed = resp.data.unwrap();
    assert_eq!(placed.order.total_amount, 180000);
    let p = Products::find_by_id(mango).one(&state.orm).await?.unwrap();
    assert_eq!(p.stock_qty, 37);
    assert_eq!(p.sold_count, 3);

    // Expire the orchard again and let the sweep pick it up. The sweep only
    // flips the seller flag, so the evaluator now reports the seller state.
    expire_subscription(&state, orchard_seller, now - Duration::days(1)).await?;
    let outcome = seller_service::expire_sweep(&state, now).await?;
    assert_eq!(outcome.deactivated_count, 1);
    let s = Sellers::find_by_id(orchard_seller).one(&state.orm).await?.unwrap();
    assert!(!s.is_active);
    let p = Products::find_by_id(mango).one(&state.orm).await?.unwrap();
    assert!(p.is_active);
    assert_eq!(
        evaluate_product(&state, mango, now).await?,
        VisibilityState::HiddenSellerInactive
    );

    // Re-running the sweep is a no-op.
    let outcome = seller_service::expire_sweep(&state, now).await?;
    assert_eq!(outcome.deactivated_count, 0);
    let s = Sellers::find_by_id(orchard_seller).one(&state.orm).await?.unwrap();
    assert!(!s.is_active);

    Ok(())
}

fn catalog_query() -> CatalogQuery {
    CatalogQuery {
        pagination: Pagination {
            page: Some(1),
            limit: Some(50),
        },
        category: None,
        q: None,
        sort: None,
    }
}

async fn evaluate_product(
    state: &AppState,
    product_id: Uuid,
    now: DateTime<Utc>,
) -> anyhow::Result<VisibilityState> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product");
    let seller = Sellers::find_by_id(product.seller_id).one(&state.orm).await?;
    Ok(visibility::evaluate(
        ProductSnapshot::of(&product),
        seller.as_ref().map(SellerSnapshot::of),
        now,
    ))
}

async fn set_stock(state: &AppState, product_id: Uuid, stock_qty: i32) -> anyhow::Result<()> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .expect("product");
    let mut active: ProductActive = product.into();
    active.stock_qty = Set(stock_qty);
    active.update(&state.orm).await?;
    Ok(())
}

async fn expire_subscription(
    state: &AppState,
    seller_id: Uuid,
    end: DateTime<Utc>,
) -> anyhow::Result<()> {
    let seller = Sellers::find_by_id(seller_id)
        .one(&state.orm)
        .await?
        .expect("seller");
    let mut active: SellerActive = seller.into();
    active.subscription_end_at = Set(Some(end.into()));
    active.is_active = Set(true);
    active.update(&state.orm).await?;
    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, products, categories, audit_logs, sellers, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState {
        pool,
        orm,
        config: AppConfig {
            database_url: database_url.to_string(),
            host: "127.0.0.1".into(),
            port: 0,
            cron_secret: None,
        },
    })
}

async fn create_user(
    state: &AppState,
    role: &str,
    name: &str,
    email: &str,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        phone: Set(None),
        email: Set(Some(email.to_string())),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_seller(
    state: &AppState,
    user_id: Uuid,
    is_active: bool,
    subscription_end_at: Option<DateTime<Utc>>,
) -> anyhow::Result<Uuid> {
    let seller = SellerActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        is_active: Set(is_active),
        subscription_end_at: Set(subscription_end_at.map(Into::into)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(seller.id)
}

async fn create_category(state: &AppState, code: &str, name: &str) -> anyhow::Result<Uuid> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        name: Set(name.to_string()),
    }
    .insert(&state.orm)
    .await?;

    Ok(category.id)
}

#[allow(clippy::too_many_arguments)]
async fn create_product(
    state: &AppState,
    seller_id: Uuid,
    category_id: Uuid,
    name: &str,
    price: i64,
    stock_qty: i32,
    is_active: bool,
    admin_deactivated: bool,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller_id),
        category_id: Set(Some(category_id)),
        name: Set(name.to_string()),
        description: Set(None),
        image_url: Set(None),
        price: Set(price),
        stock_qty: Set(stock_qty),
        sold_count: Set(0),
        is_active: Set(is_active),
        admin_deactivated: Set(admin_deactivated),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}
