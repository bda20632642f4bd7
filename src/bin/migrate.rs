use furniture_checkout_api::{config::AppConfig, db::create_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;

    let migrator = sqlx::migrate!("./migrations");
    migrator.run(&pool).await?;
    println!(
        "Migrations applied ({} known)",
        migrator.iter().count()
    );
    Ok(())
}
