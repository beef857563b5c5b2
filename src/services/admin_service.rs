use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        admin::{AdminTransactionList, LowStockList, SetBalanceRequest, UserList},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{NotificationKind, OrderStatus, Transaction, TransactionKind, User},
    remote::{OrderFilter, ProductFilter, TransactionFilter},
    response::{ApiResponse, paginate},
    routes::params::{LowStockQuery, OrderListQuery, Pagination, TransactionQuery},
    services::order_service::with_items,
    state::AppState,
    tracking::normalize_tracking_number,
};

const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let (from, to) = query.range()?;
    let filter = OrderFilter {
        user_id: None,
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
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Moves an order forward and tells its owner.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    if !payload.status.is_admin_target() {
        return Err(AppError::bad_request(format!(
            "Orders cannot be set to {} from the admin console",
            payload.status
        )));
    }
    let tracking = payload
        .tracking_number
        .as_deref()
        .and_then(normalize_tracking_number);

    let order = state
        .store
        .admin_update_order_status(id, payload.status, tracking)
        .await?;

    let kind = if order.status == OrderStatus::Delivered {
        NotificationKind::Success
    } else {
        NotificationKind::Info
    };
    state
        .notifier()
        .push(
            order.user_id,
            "Order Update",
            format!(
                "Your order is now {}. Tracking: {}",
                order.status, order.tracking_number
            ),
            kind,
        )
        .await;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    tracing::info!(order_id = %order.id, status = %order.status, "order status updated");

    let items = state.store.order_items(order.id).await?;
    Ok(ApiResponse::success(
        "Updated",
        OrderWithItems::new(order, items),
        None,
    ))
}

pub async fn list_transactions(
    state: &AppState,
    user: &AuthUser,
    query: TransactionQuery,
) -> AppResult<ApiResponse<AdminTransactionList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let filter = TransactionFilter {
        user_id: None,
        status: query.status()?,
    };
    let transactions = state
        .store
        .list_transactions(filter)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, read = "list_transactions", "read failed, showing empty list");
            Vec::new()
        });

    let (items, meta) = paginate(transactions, page, limit, offset);
    Ok(ApiResponse::success(
        "Transactions",
        AdminTransactionList { items },
        Some(meta),
    ))
}

/// Approves a pending deposit (crediting the balance) or withdrawal.
pub async fn approve_transaction(
    state: &AppState,
    user: &AuthUser,
    tx_id: Uuid,
) -> AppResult<ApiResponse<Transaction>> {
    ensure_admin(user)?;
    let pending = state
        .store
        .find_transaction(tx_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let (tx, title, message) = match pending.kind {
        TransactionKind::Deposit => {
            let tx = state.store.admin_approve_deposit(tx_id).await?;
            let message = format!("{} has been added to your wallet.", tx.amount);
            (tx, "Deposit Approved", message)
        }
        TransactionKind::Withdrawal => {
            let tx = state.store.admin_approve_withdrawal(tx_id).await?;
            let message = format!("Your withdrawal of {} has been processed.", tx.amount);
            (tx, "Withdrawal Success", message)
        }
        other => {
            return Err(AppError::bad_request(format!(
                "{other} transactions are not reviewed"
            )));
        }
    };

    state
        .notifier()
        .push(tx.user_id, title, message, NotificationKind::Success)
        .await;
    audit_decision(state, user, &tx, "transaction_approve").await;

    Ok(ApiResponse::success("Approved", tx, None))
}

/// Rejects a pending transaction. A rejected withdrawal is refunded.
pub async fn reject_transaction(
    state: &AppState,
    user: &AuthUser,
    tx_id: Uuid,
) -> AppResult<ApiResponse<Transaction>> {
    ensure_admin(user)?;
    let tx = state.store.admin_reject_transaction(tx_id).await?;

    let (title, message) = match tx.kind {
        TransactionKind::Withdrawal => (
            "Withdrawal Rejected",
            format!(
                "Your withdrawal of {} was rejected. The funds were returned to your wallet.",
                tx.amount
            ),
        ),
        _ => (
            "Deposit Rejected",
            format!(
                "Your deposit of {} was rejected. Please contact support.",
                tx.amount
            ),
        ),
    };
    state
        .notifier()
        .push(tx.user_id, title, message, NotificationKind::Error)
        .await;
    audit_decision(state, user, &tx, "transaction_reject").await;

    Ok(ApiResponse::success("Rejected", tx, None))
}

async fn audit_decision(state: &AppState, user: &AuthUser, tx: &Transaction, action: &str) {
    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        action,
        Some("transactions"),
        Some(serde_json::json!({
            "transaction_id": tx.id,
            "type": tx.kind,
            "amount": tx.amount,
            "owner": tx.user_id,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    tracing::info!(tx_id = %tx.id, status = %tx.status, action, "transaction decided");
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();
    let users = state.store.list_users().await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, read = "list_users", "read failed, showing empty list");
        Vec::new()
    });
    let (items, meta) = paginate(users, page, limit, offset);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

/// Overwrites a user's balance.
pub async fn set_balance(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    payload: SetBalanceRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    if payload.balance < 0 {
        return Err(AppError::bad_request("Balance cannot be negative"));
    }
    let previous = state
        .store
        .find_user(user_id)
        .await?
        .ok_or(AppError::NotFound)?
        .balance;
    let updated = state.store.admin_set_balance(user_id, payload.balance).await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "balance_override",
        Some("users"),
        Some(serde_json::json!({
            "user_id": user_id,
            "from": previous,
            "to": updated.balance,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    tracing::info!(%user_id, from = previous, to = updated.balance, "balance overridden");

    Ok(ApiResponse::success("Balance updated", updated, None))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<LowStockList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD).max(0);
    let products = state
        .store
        .list_products(ProductFilter {
            max_stock: Some(threshold),
            ..Default::default()
        })
        .await?;

    let (items, meta) = paginate(products, page, limit, offset);
    Ok(ApiResponse::success("Low stock", LowStockList { items }, Some(meta)))
}
