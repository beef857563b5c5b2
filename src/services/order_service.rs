use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{ConfirmDeliveryRequest, OrderList, OrderWithItems, TrackLookup},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{NotificationKind, Order},
    remote::{OrderFilter, RemoteStore},
    response::{ApiResponse, paginate},
    routes::params::OrderListQuery,
    state::AppState,
    tracking::normalize_tracking_number,
};

/// The caller's orders, newest first, each with its lifecycle position.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let (from, to) = query.range()?;
    let filter = OrderFilter {
        user_id: Some(user.user_id),
        status: query.status()?,
        from,
        to,
    };
    let orders = state.store.list_orders(filter).await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, read = "list_orders", "read failed, showing empty list");
        Vec::new()
    });

    let (orders, meta) = paginate(orders, page, limit, offset);
    let items = with_items(state.store.as_ref(), orders).await?;
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = state
        .store
        .find_order(order_id)
        .await?
        .filter(|o| o.user_id == user.user_id || user.is_admin())
        .ok_or(AppError::NotFound)?;
    let items = state.store.order_items(order.id).await?;
    Ok(ApiResponse::success(
        "Ok",
        OrderWithItems::new(order, items),
        None,
    ))
}

/// Looks up an order by tracking code, ignoring case and surrounding blanks.
pub async fn track(state: &AppState, code: &str) -> AppResult<ApiResponse<TrackLookup>> {
    let Some(code) = normalize_tracking_number(code) else {
        return Ok(ApiResponse::success(
            "Not found",
            TrackLookup {
                found: false,
                order: None,
            },
            None,
        ));
    };

    let lookup = match state.store.find_order_by_tracking(&code).await? {
        Some(order) => {
            let items = state.store.order_items(order.id).await?;
            TrackLookup {
                found: true,
                order: Some(OrderWithItems::new(order, items)),
            }
        }
        None => TrackLookup {
            found: false,
            order: None,
        },
    };
    let message = if lookup.found { "Found" } else { "Not found" };
    Ok(ApiResponse::success(message, lookup, None))
}

/// Marks a shipped or delivered order as received. Irreversible.
pub async fn confirm_delivery(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: ConfirmDeliveryRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if !payload.confirmed {
        return Err(AppError::bad_request(
            "Please confirm that you received the order.",
        ));
    }

    let order = state
        .store
        .user_confirm_order_delivery(user.user_id, order_id)
        .await?;

    state
        .notifier()
        .push(
            user.user_id,
            "Order Update",
            format!("Order {} is now {}.", order.tracking_number, order.status),
            NotificationKind::Success,
        )
        .await;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "order_confirm_delivery",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let items = state.store.order_items(order.id).await?;
    Ok(ApiResponse::success(
        "Order completed",
        OrderWithItems::new(order, items),
        None,
    ))
}

pub(crate) async fn with_items(
    store: &dyn RemoteStore,
    orders: Vec<Order>,
) -> AppResult<Vec<OrderWithItems>> {
    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let items = store.order_items(order.id).await?;
        out.push(OrderWithItems::new(order, items));
    }
    Ok(out)
}
