use agrimarket_api::{config::AppConfig, db::create_pool};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    ensure_user(&pool, "Marketplace Admin", "admin@agrimarket.test", "admin").await?;
    ensure_user(&pool, "Demo Buyer", "buyer@agrimarket.test", "buyer").await?;

    let ravi = ensure_user(&pool, "Ravi Farms", "ravi@agrimarket.test", "seller").await?;
    let meera = ensure_user(&pool, "Meera Orchard", "meera@agrimarket.test", "seller").await?;

    let ravi_seller =
        ensure_seller(&pool, ravi, true, Some(Utc::now() + Duration::days(30))).await?;
    // Lapsed subscription with the active flag still set: the storefront
    // hides these products immediately, the sweep flips the flag later.
    let meera_seller =
        ensure_seller(&pool, meera, true, Some(Utc::now() - Duration::days(2))).await?;

    let vegetables = ensure_category(&pool, "vegetables", "Vegetables").await?;
    let fruits = ensure_category(&pool, "fruits", "Fruits").await?;
    ensure_category(&pool, "grains", "Grains").await?;
    let equipment = ensure_category(&pool, "equipment", "Farm Equipment").await?;

    ensure_product(&pool, ravi_seller, vegetables, "Desi Tomatoes", 4500, 50, true, false).await?;
    ensure_product(&pool, ravi_seller, vegetables, "Red Onions", 3200, 5, true, false).await?;
    ensure_product(&pool, ravi_seller, vegetables, "Spinach Bundle", 2000, 0, true, false).await?;
    ensure_product(&pool, ravi_seller, equipment, "Drip Irrigation Kit", 185000, 8, false, true)
        .await?;
    ensure_product(&pool, meera_seller, fruits, "Alphonso Mangoes", 60000, 40, true, false).await?;

    println!("Seed completed");
    Ok(())
}

async fn ensure_user(pool: &PgPool, name: &str, email: &str, role: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role)
        .execute(pool)
        .await?;
    println!("Seeded user {email} (role={role})");
    Ok(id)
}

async fn ensure_seller(
    pool: &PgPool,
    user_id: Uuid,
    is_active: bool,
    subscription_end_at: Option<DateTime<Utc>>,
) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM sellers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO sellers (id, user_id, is_active, subscription_end_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(user_id)
    .bind(is_active)
    .bind(subscription_end_at)
    .execute(pool)
    .await?;
    Ok(id)
}

async fn ensure_category(pool: &PgPool, code: &str, name: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, code, name) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(code)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(id)
}

#[allow(clippy::too_many_arguments)]
async fn ensure_product(
    pool: &PgPool,
    seller_id: Uuid,
    category_id: Uuid,
    name: &str,
    price: i64,
    stock_qty: i32,
    is_active: bool,
    admin_deactivated: bool,
) -> anyhow::Result<()> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE seller_id = $1 AND name = $2")
            .bind(seller_id)
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO products (id, seller_id, category_id, name, price, stock_qty, is_active, admin_deactivated)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(seller_id)
    .bind(category_id)
    .bind(name)
    .bind(price)
    .bind(stock_qty)
    .bind(is_active)
    .bind(admin_deactivated)
    .execute(pool)
    .await?;
    println!("Seeded product {name}");
    Ok(())
}
