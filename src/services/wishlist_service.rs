use crate::{
    audit::log_audit,
    dto::wishlist::{ToggleWishlistRequest, WishlistProducts, WishlistToggle},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, paginate},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<WishlistProducts>> {
    let (page, limit, offset) = pagination.normalize();
    let products = state
        .store
        .list_favorites(user.user_id)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, read = "list_favorites", "read failed, showing empty list");
            Vec::new()
        });

    let (items, meta) = paginate(products, page, limit, offset);
    Ok(ApiResponse::success("OK", WishlistProducts { items }, Some(meta)))
}

pub async fn toggle_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: ToggleWishlistRequest,
) -> AppResult<ApiResponse<WishlistToggle>> {
    let favorite = state
        .store
        .toggle_favorite(user.user_id, payload.product_id)
        .await?;
    let saved = favorite.is_some();

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        if saved { "wishlist_add" } else { "wishlist_remove" },
        Some("favorites"),
        Some(serde_json::json!({ "product_id": payload.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let message = if saved {
        "Added to wishlist"
    } else {
        "Removed from wishlist"
    };
    Ok(ApiResponse::success(
        message,
        WishlistToggle {
            product_id: payload.product_id,
            saved,
        },
        None,
    ))
}
