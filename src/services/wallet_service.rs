use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::{
    audit::log_audit,
    config::WithdrawalPolicy,
    dto::wallet::{DepositRequest, TransactionList, WalletReceipt, WalletSummary, WithdrawalRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Transaction, TransactionKind, TransactionStatus},
    remote::{NewTransactionRequest, TransactionFilter},
    response::{ApiResponse, paginate},
    routes::params::Pagination,
    session::Session,
    state::AppState,
};

pub const CLOSED_TODAY: &str = "Withdrawals are closed today. Please try again tomorrow.";
pub const CUTOFF_PASSED: &str = "Daily cutoff passed. Please try again tomorrow.";

/// Withdrawal service hours, evaluated in the service's configured offset.
pub fn check_service_hours(policy: &WithdrawalPolicy, now: DateTime<Utc>) -> Result<(), &'static str> {
    let local = now.with_timezone(&policy.utc_offset);
    if local.weekday() == policy.rest_day {
        return Err(CLOSED_TODAY);
    }
    if local.hour() >= policy.cutoff_hour {
        return Err(CUTOFF_PASSED);
    }
    Ok(())
}

pub async fn summary(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<WalletSummary>> {
    let session = Session::load(state.store.as_ref(), user).await?;
    let pending = own_transactions(state, user, Some(TransactionStatus::Pending)).await;
    let pending_sum = |kind: TransactionKind| -> i64 {
        pending
            .iter()
            .filter(|tx| tx.kind == kind)
            .map(|tx| tx.amount)
            .sum()
    };
    let policy = &state.config.withdrawal;
    let data = WalletSummary {
        balance: session.user.balance,
        withdrawal_account: session.user.withdrawal_account.clone(),
        pending_deposits: pending_sum(TransactionKind::Deposit),
        pending_withdrawals: pending_sum(TransactionKind::Withdrawal),
        min_withdrawal: policy.min_amount,
        withdrawals_open: check_service_hours(policy, Utc::now()).is_ok(),
    };
    Ok(ApiResponse::success("OK", data, None))
}

/// Records a pending deposit. The balance only changes once an admin approves it.
pub async fn request_deposit(
    state: &AppState,
    user: &AuthUser,
    payload: DepositRequest,
) -> AppResult<ApiResponse<WalletReceipt>> {
    let reference = payload.reference_id.trim();
    if payload.amount <= 0 || reference.is_empty() {
        return Err(AppError::bad_request(
            "Please enter the amount and the transfer reference.",
        ));
    }
    let mut session = Session::load(state.store.as_ref(), user).await?;

    let transaction = state
        .store
        .create_deposit(NewTransactionRequest {
            user_id: user.user_id,
            amount: payload.amount,
            reference_id: Some(reference.to_string()),
            details: payload.details.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        })
        .await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "deposit_request",
        Some("transactions"),
        Some(serde_json::json!({ "transaction_id": transaction.id, "amount": transaction.amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    tracing::info!(user_id = %user.user_id, tx_id = %transaction.id, amount = transaction.amount, "deposit requested");

    let user = session.refresh(state.store.as_ref()).await?.clone();
    Ok(ApiResponse::success(
        "Deposit submitted for review",
        WalletReceipt { transaction, user },
        None,
    ))
}

pub async fn request_withdrawal(
    state: &AppState,
    user: &AuthUser,
    payload: WithdrawalRequest,
) -> AppResult<ApiResponse<WalletReceipt>> {
    request_withdrawal_at(state, user, payload, Utc::now()).await
}

/// Debits the balance immediately and records a pending withdrawal.
///
/// Gates run in order: service hours, required fields, minimum, balance.
pub async fn request_withdrawal_at(
    state: &AppState,
    user: &AuthUser,
    payload: WithdrawalRequest,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<WalletReceipt>> {
    let policy = &state.config.withdrawal;
    check_service_hours(policy, now).map_err(AppError::bad_request)?;

    let mut session = Session::load(state.store.as_ref(), user).await?;
    let account = payload
        .account
        .as_deref()
        .or(session.user.withdrawal_account.as_deref())
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);
    let Some(account) = account.filter(|_| payload.amount > 0) else {
        return Err(AppError::bad_request(
            "Please enter the amount and the destination account.",
        ));
    };
    if payload.amount < policy.min_amount {
        return Err(AppError::bad_request(format!(
            "Minimum withdrawal is {}.",
            policy.min_amount
        )));
    }
    if payload.amount > session.balance() {
        return Err(AppError::bad_request("Insufficient wallet balance."));
    }

    let transaction = state
        .store
        .create_withdrawal(NewTransactionRequest {
            user_id: user.user_id,
            amount: payload.amount,
            reference_id: None,
            details: Some(account),
        })
        .await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "withdrawal_request",
        Some("transactions"),
        Some(serde_json::json!({ "transaction_id": transaction.id, "amount": transaction.amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    tracing::info!(user_id = %user.user_id, tx_id = %transaction.id, amount = transaction.amount, "withdrawal requested");

    let user = session.refresh(state.store.as_ref()).await?.clone();
    Ok(ApiResponse::success(
        "Withdrawal submitted",
        WalletReceipt { transaction, user },
        None,
    ))
}

/// The caller's ledger, newest first. A failed read renders as an empty list.
pub async fn list_transactions(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<TransactionList>> {
    let (page, limit, offset) = pagination.normalize();
    let transactions = own_transactions(state, user, None).await;
    let (items, meta) = paginate(transactions, page, limit, offset);
    Ok(ApiResponse::success("OK", TransactionList { items }, Some(meta)))
}

async fn own_transactions(
    state: &AppState,
    user: &AuthUser,
    status: Option<TransactionStatus>,
) -> Vec<Transaction> {
    state
        .store
        .list_transactions(TransactionFilter {
            user_id: Some(user.user_id),
            status,
        })
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, read = "list_transactions", "read failed, showing empty list");
            Vec::new()
        })
}
