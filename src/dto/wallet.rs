use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Transaction, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepositRequest {
    pub amount: i64,
    /// Reference code of the out-of-band transfer.
    pub reference_id: String,
    pub details: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawalRequest {
    pub amount: i64,
    /// Destination account. Falls back to the saved withdrawal account.
    pub account: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletReceipt {
    pub transaction: Transaction,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletSummary {
    pub balance: i64,
    pub withdrawal_account: Option<String>,
    pub pending_deposits: i64,
    pub pending_withdrawals: i64,
    pub min_withdrawal: i64,
    pub withdrawals_open: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionList {
    #[schema(value_type = Vec<Transaction>)]
    pub items: Vec<Transaction>,
}
