use std::path::Path;

use storefront_api::{
    db::run_migrations,
    remote::{NewProduct, NewUser, PgStore, ProductFilter, RemoteStore},
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let admin_phone = std::env::var("ADMIN_PHONE").unwrap_or_else(|_| "0700000001".to_string());

    let store = PgStore::connect(&database_url).await?;
    run_migrations(store.orm(), Path::new("migrations")).await?;

    let admin_id = ensure_user(&store, &admin_phone, "admin123", true).await?;
    let user_id = ensure_user(&store, "0700000002", "user123", false).await?;
    seed_products(&store).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    store: &PgStore,
    phone: &str,
    password: &str,
    is_admin: bool,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = store.find_user_by_phone(phone).await? {
        println!("User {phone} already exists");
        return Ok(existing.user.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = store
        .insert_user(NewUser {
            phone: phone.to_string(),
            password_hash,
            is_admin,
            verification_code: format!("SEED{}", if is_admin { "A1" } else { "U1" }),
            invited_by: None,
        })
        .await?;

    println!("Created user {phone} (admin={is_admin})");
    Ok(user.id)
}

async fn seed_products(store: &PgStore) -> anyhow::Result<()> {
    let existing = store.list_products(ProductFilter::default()).await?;
    if !existing.is_empty() {
        println!("Products already seeded ({} found)", existing.len());
        return Ok(());
    }

    let products = vec![
        ("Pixel 8", "Phones", "6.2\" display, 128 GB", 4500, 12),
        ("Galaxy Buds", "Audio", "Noise cancelling earbuds", 1200, 30),
        ("USB-C Charger 65W", "Accessories", "GaN fast charger", 350, 80),
        ("Power Bank 20000mAh", "Accessories", "Two-port power bank", 500, 4),
        ("Smart Watch", "Wearables", "Heart rate and GPS", 1800, 15),
    ];

    for (name, category, desc, price, stock) in products {
        store
            .insert_product(NewProduct {
                name: name.to_string(),
                description: Some(desc.to_string()),
                price,
                category: category.to_string(),
                images: Vec::new(),
                stock_quantity: stock,
            })
            .await?;
    }

    println!("Seeded products");
    Ok(())
}
