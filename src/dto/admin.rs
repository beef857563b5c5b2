use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, Transaction, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetBalanceRequest {
    pub balance: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AdminTransactionList {
    #[schema(value_type = Vec<Transaction>)]
    pub items: Vec<Transaction>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct LowStockList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
