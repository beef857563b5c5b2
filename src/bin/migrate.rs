use std::path::Path;

use storefront_api::{db::run_migrations, remote::PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let store = PgStore::connect(&database_url).await?;
    run_migrations(store.orm(), Path::new("migrations")).await?;
    println!("Migrations applied");
    Ok(())
}
