use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartCount, CartItemDto, CartView},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, CartLine, MAX_LINE_QUANTITY},
    remote::RemoteStore,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Cached number of units in each user's cart, used for navigation badges.
///
/// Only refreshed by this process after its own cart mutations and checkouts.
#[derive(Debug, Clone, Default)]
pub struct CartCounts {
    inner: Arc<RwLock<HashMap<Uuid, i64>>>,
}

impl CartCounts {
    pub fn get(&self, user_id: Uuid) -> Option<i64> {
        self.inner
            .read()
            .ok()
            .and_then(|counts| counts.get(&user_id).copied())
    }

    pub fn set(&self, user_id: Uuid, count: i64) {
        if let Ok(mut counts) = self.inner.write() {
            counts.insert(user_id, count);
        }
    }

    /// Re-reads the cart and stores the new count. Keeps the old value if the read fails.
    pub async fn refresh(&self, store: &dyn RemoteStore, user_id: Uuid) -> i64 {
        match store.list_cart(user_id).await {
            Ok(lines) => {
                let count = units(&lines);
                self.set(user_id, count);
                count
            }
            Err(err) => {
                tracing::warn!(error = %err, %user_id, "cart count refresh failed");
                self.get(user_id).unwrap_or(0)
            }
        }
    }
}

fn units(lines: &[CartLine]) -> i64 {
    lines.iter().map(|line| i64::from(line.quantity)).sum()
}

/// Display subtotal; saturates instead of overflowing.
pub fn subtotal(lines: &[CartLine]) -> i64 {
    lines
        .iter()
        .map(CartLine::line_total)
        .fold(0, i64::saturating_add)
}

/// Cart lines with embedded products. A failed read renders as an empty cart.
pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let lines = state
        .store
        .list_cart(user.user_id)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, read = "list_cart", "read failed, showing empty list");
            Vec::new()
        });

    let view = CartView {
        subtotal: subtotal(&lines),
        item_count: units(&lines),
        items: lines.into_iter().map(CartItemDto::from).collect(),
    };
    let meta = Meta::count(view.items.len());
    Ok(ApiResponse::success("OK", view, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::bad_request("Quantity must be greater than 0"));
    }
    if payload.quantity > MAX_LINE_QUANTITY {
        return Err(AppError::bad_request(format!(
            "At most {MAX_LINE_QUANTITY} units can be added at once"
        )));
    }

    let product = state
        .store
        .find_product(payload.product_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !product.is_active {
        return Err(AppError::bad_request("Product is not available"));
    }

    let cart_item = state
        .store
        .merge_cart_item(user.user_id, product.id, payload.quantity)
        .await?;
    state
        .cart_counts
        .refresh(state.store.as_ref(), user.user_id)
        .await;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": product.id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Added to cart", cart_item, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    cart_item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if !state
        .store
        .remove_cart_item(user.user_id, cart_item_id)
        .await?
    {
        return Err(AppError::NotFound);
    }
    state
        .cart_counts
        .refresh(state.store.as_ref(), user.user_id)
        .await;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_item_id": cart_item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn cart_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartCount>> {
    let count = match state.cart_counts.get(user.user_id) {
        Some(count) => count,
        None => {
            state
                .cart_counts
                .refresh(state.store.as_ref(), user.user_id)
                .await
        }
    };
    Ok(ApiResponse::success("OK", CartCount { count }, None))
}
