#![allow(dead_code)]

use std::sync::Arc;

use storefront_api::{
    config::AppConfig,
    dto::cart::AddToCartRequest,
    middleware::auth::AuthUser,
    models::{Product, User},
    remote::{MemoryStore, NewProduct, NewUser, RemoteStore},
    services::cart_service,
    state::AppState,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn setup() -> (AppState, Arc<MemoryStore>) {
    AppState::in_memory(AppConfig::for_memory(JWT_SECRET))
}

pub async fn create_user(store: &MemoryStore, phone: &str, balance: i64) -> anyhow::Result<User> {
    let user = store
        .insert_user(NewUser {
            phone: phone.to_string(),
            password_hash: "unused".to_string(),
            is_admin: false,
            verification_code: "ABC123".to_string(),
            invited_by: None,
        })
        .await?;
    Ok(store.admin_set_balance(user.id, balance).await?)
}

pub fn auth(user: &User) -> AuthUser {
    AuthUser {
        user_id: user.id,
        role: "user".into(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".into(),
    }
}

pub async fn create_product(
    store: &MemoryStore,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Product> {
    Ok(store
        .insert_product(NewProduct {
            name: name.to_string(),
            description: None,
            price,
            category: "Phones".to_string(),
            images: Vec::new(),
            stock_quantity: stock,
        })
        .await?)
}

pub async fn add(
    state: &AppState,
    user: &AuthUser,
    product: &Product,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_id: product.id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

pub async fn balance(store: &MemoryStore, user: &User) -> anyhow::Result<i64> {
    Ok(store
        .find_user(user.id)
        .await?
        .map(|u| u.balance)
        .unwrap_or_default())
}
