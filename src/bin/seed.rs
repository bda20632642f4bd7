use chrono::{Duration, Utc};
use furniture_checkout_api::{
    config::AppConfig,
    db::create_pool,
    middleware::auth::Claims,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "Admin", "admin").await?;
    let seller_id = ensure_user(&pool, "seller@example.com", "Narra Woodworks", "seller").await?;
    let buyer_id = ensure_user(&pool, "buyer@example.com", "Juan Dela Cruz", "buyer").await?;
    seed_products(&pool, seller_id).await?;
    seed_vouchers(&pool, seller_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, Seller ID: {seller_id}, Buyer ID: {buyer_id}");
    if let Ok(secret) = std::env::var("JWT_SECRET") {
        for (label, id, role) in [
            ("buyer", buyer_id, "buyer"),
            ("seller", seller_id, "seller"),
            ("admin", admin_id, "admin"),
        ] {
            println!("{label} token: {}", issue_token(&secret, id, role)?);
        }
    }
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    display_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, display_name, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(display_name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    let products = vec![
        ("Narra Dining Table", 2_450_000, "products/narra-table.jpg"),
        ("Rattan Accent Chair", 899_000, "products/rattan-chair.jpg"),
        ("Acacia Coffee Table", 1_150_000, "products/acacia-coffee.jpg"),
        ("Linen Three-Seater Sofa", 3_299_000, "products/linen-sofa.jpg"),
    ];

    for (title, price, image) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, title, price, image_ref)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (title) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(title)
        .bind(price)
        .bind(image)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_vouchers(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    let now = Utc::now();
    let vouchers = vec![
        (None, "Welcome 10%", "WELCOME10", "percentage", "10", None),
        (Some(seller_id), "Narra 500 off", "NARRA500", "fixed", "50000", Some(now + Duration::days(30))),
    ];

    for (owner, name, code, discount_type, value, end_date) in vouchers {
        sqlx::query(
            r#"
            INSERT INTO promotions
                (id, seller_id, name, code, type, discount_type, discount_value, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, 'voucher', $5, $6::numeric, 'active', $7, $8)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(name)
        .bind(code)
        .bind(discount_type)
        .bind(value)
        .bind(now)
        .bind(end_date)
        .execute(pool)
        .await?;
    }

    println!("Seeded vouchers");
    Ok(())
}

fn issue_token(secret: &str, user_id: Uuid, role: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::days(7)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}
