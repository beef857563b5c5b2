use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest, UploadedImage},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{MAX_PRICE, Product},
    remote::{NewProduct, ProductFilter, ProductPatch},
    response::{ApiResponse, Meta, paginate},
    routes::params::ProductQuery,
    state::AppState,
};

/// Active products, newest first. A failed read renders as an empty catalog.
pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = ProductFilter {
        active_only: true,
        category: query
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all")),
        search: query
            .q
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        max_stock: None,
    };
    let products = state
        .store
        .list_products(filter)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, read = "list_products", "read failed, showing empty list");
            Vec::new()
        });

    let (items, meta) = paginate(products, page, limit, offset);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

/// Every product including deactivated ones, for the admin console.
pub async fn list_all_products(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let products = state
        .store
        .list_products(ProductFilter {
            active_only: false,
            category: query.category.filter(|c| !c.trim().is_empty()),
            search: query.q.filter(|q| !q.trim().is_empty()),
            max_stock: None,
        })
        .await?;

    let (items, meta) = paginate(products, page, limit, offset);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = state
        .store
        .find_product(id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let name = payload.name.trim();
    let category = payload.category.trim();
    if name.is_empty() || category.is_empty() {
        return Err(AppError::bad_request("Name and category are required"));
    }
    validate_numbers(Some(payload.price), Some(payload.stock_quantity))?;

    let product = state
        .store
        .insert_product(NewProduct {
            name: name.to_string(),
            description: payload.description,
            price: payload.price,
            category: category.to_string(),
            images: payload.images,
            stock_quantity: payload.stock_quantity,
        })
        .await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_numbers(payload.price, payload.stock_quantity)?;

    let product = state
        .store
        .update_product(
            id,
            ProductPatch {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                category: payload.category,
                images: payload.images,
                stock_quantity: payload.stock_quantity,
                is_active: payload.is_active,
            },
        )
        .await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id, "is_active": product.is_active })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

/// Stores an uploaded product image and returns its public URL.
pub async fn upload_product_image(
    state: &AppState,
    user: &AuthUser,
    file_name: &str,
    bytes: &[u8],
) -> AppResult<ApiResponse<UploadedImage>> {
    ensure_admin(user)?;
    if bytes.is_empty() {
        return Err(AppError::bad_request("Uploaded file is empty"));
    }
    let url = state.objects.put(file_name, bytes).await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "product_image_upload",
        Some("uploads"),
        Some(serde_json::json!({ "url": url })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Uploaded", UploadedImage { url }, None))
}

fn validate_numbers(price: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p <= 0) {
        return Err(AppError::bad_request("Price must be greater than 0"));
    }
    if price.is_some_and(|p| p > MAX_PRICE) {
        return Err(AppError::bad_request(format!(
            "Price cannot exceed {MAX_PRICE}"
        )));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::bad_request("Stock cannot be negative"));
    }
    Ok(())
}
