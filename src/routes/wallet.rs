use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::{
    dto::wallet::{DepositRequest, TransactionList, WalletReceipt, WalletSummary, WithdrawalRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::Pagination,
    services::wallet_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(wallet_summary))
        .route("/transactions", get(list_transactions))
        .route("/deposits", post(request_deposit))
        .route("/withdrawals", post(request_withdrawal))
}

#[utoipa::path(
    get,
    path = "/api/wallet",
    responses(
        (status = 200, description = "Balance and pending amounts", body = ApiResponse<WalletSummary>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn wallet_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WalletSummary>>> {
    let resp = wallet_service::summary(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/wallet/transactions",
    params(Pagination),
    responses(
        (status = 200, description = "Own ledger, newest first", body = ApiResponse<TransactionList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = wallet_service::list_transactions(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/wallet/deposits",
    request_body = DepositRequest,
    responses(
        (status = 200, description = "Pending deposit recorded", body = ApiResponse<WalletReceipt>),
        (status = 400, description = "Missing amount or reference")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn request_deposit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DepositRequest>,
) -> AppResult<Json<ApiResponse<WalletReceipt>>> {
    let resp = wallet_service::request_deposit(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/wallet/withdrawals",
    request_body = WithdrawalRequest,
    responses(
        (status = 200, description = "Pending withdrawal recorded, balance debited", body = ApiResponse<WalletReceipt>),
        (status = 400, description = "Outside service hours, below minimum or insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn request_withdrawal(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<WithdrawalRequest>,
) -> AppResult<Json<ApiResponse<WalletReceipt>>> {
    let resp = wallet_service::request_withdrawal(&state, &user, payload).await?;
    Ok(Json(resp))
}
