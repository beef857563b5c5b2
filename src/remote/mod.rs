//! The persistence boundary.
//!
//! Every durable state transition goes through [`RemoteStore`]. Plain reads and
//! single-row writes map to table operations; the multi-row procedures
//! (`atomic_cart_checkout`, the transaction approvals, withdrawal creation,
//! delivery confirmation) must apply all of their changes in one transaction
//! or none of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CartItem, CartLine, Favorite, Notification, NotificationKind, Order, OrderItem, OrderStatus,
    PaymentMethod, Product, Transaction, TransactionStatus, User, UserRecord,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    /// The store refused the operation. The message is meant for the end user.
    #[error("{0}")]
    Rejected(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("orm error")]
    Orm(#[from] sea_orm::DbErr),

    #[error("store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn rejected(message: impl Into<String>) -> Self {
        StoreError::Rejected(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub verification_code: String,
    pub invited_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub category: String,
    pub images: Vec<String>,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub active_only: bool,
    pub category: Option<String>,
    pub search: Option<String>,
    pub max_stock: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|id| order.user_id == id)
            && self.status.is_none_or(|s| order.status == s)
            && self.from.is_none_or(|from| order.created_at >= from)
            && self.to.is_none_or(|to| order.created_at < to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<TransactionStatus>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.user_id.is_none_or(|id| tx.user_id == id)
            && self.status.is_none_or(|s| tx.status == s)
    }
}

/// Arguments of the `atomic_cart_checkout` procedure.
#[derive(Debug, Clone)]
pub struct CheckoutCommand {
    pub user_id: Uuid,
    /// Subtotal the user reviewed. The store rejects the checkout if the cart no longer adds up to it.
    pub expected_total: i64,
    pub payment_method: PaymentMethod,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub delivery_address: String,
    pub tracking_number: String,
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewTransactionRequest {
    pub user_id: Uuid,
    pub amount: i64,
    pub reference_id: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
}

pub const INSUFFICIENT_BALANCE: &str = "Insufficient wallet balance";
pub const CART_EMPTY: &str = "Cart is empty";
pub const CART_CHANGED: &str = "Cart changed since review, please check your items again";
pub const LINE_QUANTITY_LIMIT: &str = "Cart line quantity limit reached";
pub const ORDER_TOTAL_OUT_OF_RANGE: &str = "Order total is too large";
pub const BALANCE_OUT_OF_RANGE: &str = "Balance would exceed the allowed maximum";

#[async_trait]
pub trait RemoteStore: Send + Sync {
    // users
    async fn insert_user(&self, new: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_phone(&self, phone: &str) -> StoreResult<Option<UserRecord>>;
    async fn find_user_record(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User>;
    async fn set_withdrawal_account(&self, id: Uuid, account: String) -> StoreResult<User>;
    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> StoreResult<()>;
    async fn admin_set_balance(&self, id: Uuid, balance: i64) -> StoreResult<User>;

    // catalog
    async fn list_products(&self, filter: ProductFilter) -> StoreResult<Vec<Product>>;
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn insert_product(&self, new: NewProduct) -> StoreResult<Product>;
    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Product>;

    // cart
    async fn list_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>>;
    /// Inserts the row or adds `quantity` to the existing `(user, product)` row in one step.
    async fn merge_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> StoreResult<CartItem>;
    async fn remove_cart_item(&self, user_id: Uuid, cart_item_id: Uuid) -> StoreResult<bool>;

    // wishlist
    async fn list_favorites(&self, user_id: Uuid) -> StoreResult<Vec<Product>>;
    /// Returns the new favorite, or `None` if an existing one was removed.
    async fn toggle_favorite(&self, user_id: Uuid, product_id: Uuid)
    -> StoreResult<Option<Favorite>>;

    // orders
    async fn atomic_cart_checkout(&self, command: CheckoutCommand) -> StoreResult<PlacedOrder>;
    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>>;
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn find_order_by_tracking(&self, tracking_number: &str) -> StoreResult<Option<Order>>;
    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>>;
    async fn user_confirm_order_delivery(&self, user_id: Uuid, order_id: Uuid)
    -> StoreResult<Order>;
    /// Moves an order strictly forward; regressions are rejected.
    async fn admin_update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> StoreResult<Order>;

    // wallet
    async fn create_deposit(&self, request: NewTransactionRequest) -> StoreResult<Transaction>;
    /// Records a pending withdrawal and debits the balance in the same transaction.
    async fn create_withdrawal(&self, request: NewTransactionRequest) -> StoreResult<Transaction>;
    async fn list_transactions(&self, filter: TransactionFilter) -> StoreResult<Vec<Transaction>>;
    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>>;
    async fn admin_approve_deposit(&self, tx_id: Uuid) -> StoreResult<Transaction>;
    async fn admin_approve_withdrawal(&self, tx_id: Uuid) -> StoreResult<Transaction>;
    /// Rejects a pending transaction, refunding the balance for withdrawals.
    async fn admin_reject_transaction(&self, tx_id: Uuid) -> StoreResult<Transaction>;

    // notifications
    async fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification>;
    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;

    async fn record_audit(&self, entry: AuditEntry) -> StoreResult<()>;
}
