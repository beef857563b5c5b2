//! In-process [`RemoteStore`] used by the test suite and the `memory` backend.
//!
//! Every procedure holds the table lock for its whole duration, so multi-row
//! procedures are as atomic here as they are in PostgreSQL. Each call is
//! counted per operation name.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    AuditEntry, BALANCE_OUT_OF_RANGE, CART_CHANGED, CART_EMPTY, CheckoutCommand,
    INSUFFICIENT_BALANCE, LINE_QUANTITY_LIMIT, NewNotification, NewProduct, NewTransactionRequest,
    NewUser, ORDER_TOTAL_OUT_OF_RANGE, OrderFilter, PlacedOrder, ProductFilter, ProductPatch,
    ProfileUpdate, RemoteStore, StoreError, StoreResult, TransactionFilter,
};
use crate::models::{
    CartItem, CartLine, Favorite, MAX_LINE_QUANTITY, Notification, Order, OrderItem, OrderStatus,
    PaymentMethod, Product, Transaction, TransactionKind, TransactionStatus, User, UserRecord,
};

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    products: Vec<Product>,
    cart: Vec<CartItem>,
    favorites: Vec<Favorite>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    transactions: Vec<Transaction>,
    notifications: Vec<Notification>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn user_mut(&mut self, id: Uuid) -> StoreResult<&mut UserRecord> {
        self.users
            .iter_mut()
            .find(|u| u.user.id == id)
            .ok_or(StoreError::NotFound)
    }

    fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn cart_lines(&self, user_id: Uuid) -> Vec<CartLine> {
        self.cart
            .iter()
            .filter(|c| c.user_id == user_id)
            .filter_map(|c| {
                self.product(c.product_id).map(|p| CartLine {
                    id: c.id,
                    product: p.clone(),
                    quantity: c.quantity,
                })
            })
            .collect()
    }

    fn credit(&mut self, user_id: Uuid, amount: i64) -> StoreResult<()> {
        let user = &mut self.user_mut(user_id)?.user;
        user.balance = user
            .balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::rejected(BALANCE_OUT_OF_RANGE))?;
        Ok(())
    }

    fn pending_transaction_mut(&mut self, id: Uuid) -> StoreResult<&mut Transaction> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound)?;
        if tx.status != TransactionStatus::Pending {
            return Err(StoreError::rejected("Transaction is not pending"));
        }
        Ok(tx)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    calls: Mutex<HashMap<&'static str, usize>>,
    /// Remaining successful calls per operation before it starts failing.
    failures: Mutex<HashMap<&'static str, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `operation` was invoked.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Makes `operation` fail with a store error once it has succeeded `after` more times.
    pub fn fail_operation(&self, operation: &'static str, after: usize) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(operation, after);
        }
    }

    pub fn audit_actions(&self) -> Vec<String> {
        self.tables
            .lock()
            .map(|t| t.audit.iter().map(|a| a.action.clone()).collect())
            .unwrap_or_default()
    }

    fn enter(&self, operation: &'static str) -> StoreResult<MutexGuard<'_, Tables>> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(operation).or_insert(0) += 1;
        }
        if let Ok(mut failures) = self.failures.lock() {
            if let Some(remaining) = failures.get_mut(operation) {
                if *remaining == 0 {
                    return Err(StoreError::Internal(format!("{operation} unavailable")));
                }
                *remaining -= 1;
            }
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Internal("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.enter("insert_user")?;
        if t.users.iter().any(|u| u.user.phone == new.phone) {
            return Err(StoreError::rejected("Phone number already in use"));
        }
        let user = User {
            id: Uuid::new_v4(),
            phone: new.phone,
            balance: 0,
            is_admin: new.is_admin,
            verification_code: new.verification_code,
            full_name: None,
            bio: None,
            avatar_url: None,
            withdrawal_account: None,
            invited_by: new.invited_by,
            registered_at: Utc::now(),
        };
        t.users.push(UserRecord {
            user: user.clone(),
            password_hash: new.password_hash,
        });
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.enter("find_user")?;
        Ok(t.users.iter().find(|u| u.user.id == id).map(|u| u.user.clone()))
    }

    async fn find_user_by_phone(&self, phone: &str) -> StoreResult<Option<UserRecord>> {
        let t = self.enter("find_user_by_phone")?;
        Ok(t.users.iter().find(|u| u.user.phone == phone).cloned())
    }

    async fn find_user_record(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let t = self.enter("find_user_record")?;
        Ok(t.users.iter().find(|u| u.user.id == id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let t = self.enter("list_users")?;
        Ok(t.users.iter().rev().map(|u| u.user.clone()).collect())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User> {
        let mut t = self.enter("update_profile")?;
        let record = t.user_mut(id)?;
        if let Some(full_name) = update.full_name {
            record.user.full_name = Some(full_name);
        }
        if let Some(bio) = update.bio {
            record.user.bio = Some(bio);
        }
        if let Some(avatar_url) = update.avatar_url {
            record.user.avatar_url = Some(avatar_url);
        }
        Ok(record.user.clone())
    }

    async fn set_withdrawal_account(&self, id: Uuid, account: String) -> StoreResult<User> {
        let mut t = self.enter("set_withdrawal_account")?;
        let record = t.user_mut(id)?;
        record.user.withdrawal_account = Some(account);
        Ok(record.user.clone())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> StoreResult<()> {
        let mut t = self.enter("set_password_hash")?;
        t.user_mut(id)?.password_hash = password_hash;
        Ok(())
    }

    async fn admin_set_balance(&self, id: Uuid, balance: i64) -> StoreResult<User> {
        let mut t = self.enter("admin_set_balance")?;
        let record = t.user_mut(id)?;
        record.user.balance = balance;
        Ok(record.user.clone())
    }

    async fn list_products(&self, filter: ProductFilter) -> StoreResult<Vec<Product>> {
        let t = self.enter("list_products")?;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        Ok(t.products
            .iter()
            .rev()
            .filter(|p| !filter.active_only || p.is_active)
            .filter(|p| filter.category.as_ref().is_none_or(|c| &p.category == c))
            .filter(|p| filter.max_stock.is_none_or(|max| p.stock_quantity <= max))
            .filter(|p| {
                search.as_ref().is_none_or(|q| {
                    p.name.to_lowercase().contains(q)
                        || p.description
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(q))
                })
            })
            .cloned()
            .collect())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let t = self.enter("find_product")?;
        Ok(t.product(id).cloned())
    }

    async fn insert_product(&self, new: NewProduct) -> StoreResult<Product> {
        let mut t = self.enter("insert_product")?;
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            category: new.category,
            image_url: new.images.first().cloned(),
            images: new.images,
            stock_quantity: new.stock_quantity,
            is_active: true,
            created_at: Utc::now(),
        };
        t.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Product> {
        let mut t = self.enter("update_product")?;
        let product = t
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = Some(description);
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(images) = patch.images {
            product.image_url = images.first().cloned();
            product.images = images;
        }
        if let Some(stock) = patch.stock_quantity {
            product.stock_quantity = stock;
        }
        if let Some(active) = patch.is_active {
            product.is_active = active;
        }
        Ok(product.clone())
    }

    async fn list_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        let t = self.enter("list_cart")?;
        Ok(t.cart_lines(user_id))
    }

    async fn merge_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> StoreResult<CartItem> {
        let mut t = self.enter("merge_cart_item")?;
        if t.product(product_id).is_none() {
            return Err(StoreError::NotFound);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(StoreError::rejected(LINE_QUANTITY_LIMIT));
        }
        if let Some(item) = t
            .cart
            .iter_mut()
            .find(|c| c.user_id == user_id && c.product_id == product_id)
        {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or_else(|| StoreError::rejected(LINE_QUANTITY_LIMIT))?;
            return Ok(item.clone());
        }
        let item = CartItem {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        };
        t.cart.push(item.clone());
        Ok(item)
    }

    async fn remove_cart_item(&self, user_id: Uuid, cart_item_id: Uuid) -> StoreResult<bool> {
        let mut t = self.enter("remove_cart_item")?;
        let before = t.cart.len();
        t.cart
            .retain(|c| !(c.id == cart_item_id && c.user_id == user_id));
        Ok(t.cart.len() != before)
    }

    async fn list_favorites(&self, user_id: Uuid) -> StoreResult<Vec<Product>> {
        let t = self.enter("list_favorites")?;
        Ok(t.favorites
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| t.product(f.product_id).cloned())
            .collect())
    }

    async fn toggle_favorite(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<Option<Favorite>> {
        let mut t = self.enter("toggle_favorite")?;
        if t.product(product_id).is_none() {
            return Err(StoreError::NotFound);
        }
        let before = t.favorites.len();
        t.favorites
            .retain(|f| !(f.user_id == user_id && f.product_id == product_id));
        if t.favorites.len() != before {
            return Ok(None);
        }
        let favorite = Favorite {
            id: Uuid::new_v4(),
            product_id,
            user_id,
            created_at: Utc::now(),
        };
        t.favorites.push(favorite.clone());
        Ok(Some(favorite))
    }

    async fn atomic_cart_checkout(&self, command: CheckoutCommand) -> StoreResult<PlacedOrder> {
        let mut t = self.enter("atomic_cart_checkout")?;
        let lines = t.cart_lines(command.user_id);
        if lines.is_empty() {
            return Err(StoreError::rejected(CART_EMPTY));
        }
        if t.orders
            .iter()
            .any(|o| o.tracking_number == command.tracking_number)
        {
            return Err(StoreError::rejected("Tracking number already assigned"));
        }

        let total = CartLine::checked_total(&lines)
            .ok_or_else(|| StoreError::rejected(ORDER_TOTAL_OUT_OF_RANGE))?;
        if total != command.expected_total {
            return Err(StoreError::rejected(CART_CHANGED));
        }
        for line in &lines {
            if !line.product.is_active {
                return Err(StoreError::rejected(format!(
                    "{} is no longer available",
                    line.product.name
                )));
            }
            if line.product.stock_quantity < line.quantity {
                return Err(StoreError::rejected(format!(
                    "Insufficient stock for {}",
                    line.product.name
                )));
            }
        }
        let phone = {
            let record = t.user_mut(command.user_id)?;
            if command.payment_method == PaymentMethod::Balance && record.user.balance < total {
                return Err(StoreError::rejected(INSUFFICIENT_BALANCE));
            }
            if command.payment_method == PaymentMethod::Balance {
                record.user.balance -= total;
            }
            record.user.phone.clone()
        };

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: command.user_id,
            total_amount: total,
            status: OrderStatus::Pending,
            payment_method: command.payment_method,
            tracking_number: command.tracking_number,
            receiver_name: command.receiver_name,
            receiver_phone: command.receiver_phone,
            delivery_address: command.delivery_address,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                quantity: line.quantity,
                price: line.product.price,
            })
            .collect();

        for line in &lines {
            if let Some(product) = t.products.iter_mut().find(|p| p.id == line.product.id) {
                product.stock_quantity -= line.quantity;
            }
        }
        if command.payment_method == PaymentMethod::Balance {
            t.transactions.push(Transaction {
                id: Uuid::new_v4(),
                user_id: command.user_id,
                user_phone: phone,
                kind: TransactionKind::Purchase,
                amount: total,
                status: TransactionStatus::Completed,
                reference_id: Some(order.tracking_number.clone()),
                method: Some("Wallet".into()),
                details: None,
                created_at: now,
            });
        }
        t.cart.retain(|c| !lines.iter().any(|line| line.id == c.id));
        t.orders.push(order.clone());
        t.order_items.extend(items.iter().cloned());

        Ok(PlacedOrder { order, items })
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        let t = self.enter("list_orders")?;
        Ok(t.orders
            .iter()
            .rev()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let t = self.enter("find_order")?;
        Ok(t.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_order_by_tracking(&self, tracking_number: &str) -> StoreResult<Option<Order>> {
        let t = self.enter("find_order_by_tracking")?;
        Ok(t.orders
            .iter()
            .find(|o| o.tracking_number == tracking_number)
            .cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        let t = self.enter("order_items")?;
        Ok(t.order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn user_confirm_order_delivery(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> StoreResult<Order> {
        let mut t = self.enter("user_confirm_order_delivery")?;
        let order = t
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        if !order.status.can_user_confirm() {
            return Err(StoreError::rejected(format!(
                "Order cannot be confirmed while {}",
                order.status
            )));
        }
        order.status = OrderStatus::Completed;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn admin_update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> StoreResult<Order> {
        let mut t = self.enter("admin_update_order_status")?;
        if let Some(tracking) = tracking_number.as_ref() {
            if t.orders
                .iter()
                .any(|o| o.id != order_id && &o.tracking_number == tracking)
            {
                return Err(StoreError::rejected("Tracking number already assigned"));
            }
        }
        let order = t
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(StoreError::NotFound)?;
        if !order.status.is_forward_to(status) {
            return Err(StoreError::rejected(format!(
                "Order cannot move from {} to {}",
                order.status, status
            )));
        }
        order.status = status;
        if let Some(tracking) = tracking_number {
            order.tracking_number = tracking;
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn create_deposit(&self, request: NewTransactionRequest) -> StoreResult<Transaction> {
        let mut t = self.enter("create_deposit")?;
        let phone = t.user_mut(request.user_id)?.user.phone.clone();
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            user_phone: phone,
            kind: TransactionKind::Deposit,
            amount: request.amount,
            status: TransactionStatus::Pending,
            reference_id: request.reference_id,
            method: Some("Payment".into()),
            details: request.details,
            created_at: Utc::now(),
        };
        t.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn create_withdrawal(&self, request: NewTransactionRequest) -> StoreResult<Transaction> {
        let mut t = self.enter("create_withdrawal")?;
        let record = t.user_mut(request.user_id)?;
        if record.user.balance < request.amount {
            return Err(StoreError::rejected(INSUFFICIENT_BALANCE));
        }
        record.user.balance -= request.amount;
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            user_phone: record.user.phone.clone(),
            kind: TransactionKind::Withdrawal,
            amount: request.amount,
            status: TransactionStatus::Pending,
            reference_id: request.reference_id,
            method: Some("Withdrawal".into()),
            details: request.details,
            created_at: Utc::now(),
        };
        t.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn list_transactions(&self, filter: TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let t = self.enter("list_transactions")?;
        Ok(t.transactions
            .iter()
            .rev()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect())
    }

    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let t = self.enter("find_transaction")?;
        Ok(t.transactions.iter().find(|tx| tx.id == id).cloned())
    }

    async fn admin_approve_deposit(&self, tx_id: Uuid) -> StoreResult<Transaction> {
        let mut t = self.enter("admin_approve_deposit")?;
        let (user_id, amount) = {
            let tx = t.pending_transaction_mut(tx_id)?;
            if tx.kind != TransactionKind::Deposit {
                return Err(StoreError::rejected("Transaction is not a deposit"));
            }
            (tx.user_id, tx.amount)
        };
        t.credit(user_id, amount)?;
        let tx = t.pending_transaction_mut(tx_id)?;
        tx.status = TransactionStatus::Completed;
        Ok(tx.clone())
    }

    async fn admin_approve_withdrawal(&self, tx_id: Uuid) -> StoreResult<Transaction> {
        let mut t = self.enter("admin_approve_withdrawal")?;
        let tx = t.pending_transaction_mut(tx_id)?;
        if tx.kind != TransactionKind::Withdrawal {
            return Err(StoreError::rejected("Transaction is not a withdrawal"));
        }
        tx.status = TransactionStatus::Completed;
        Ok(tx.clone())
    }

    async fn admin_reject_transaction(&self, tx_id: Uuid) -> StoreResult<Transaction> {
        let mut t = self.enter("admin_reject_transaction")?;
        let (user_id, amount, kind) = {
            let tx = t.pending_transaction_mut(tx_id)?;
            (tx.user_id, tx.amount, tx.kind)
        };
        if kind == TransactionKind::Withdrawal {
            t.credit(user_id, amount)?;
        }
        let tx = t.pending_transaction_mut(tx_id)?;
        tx.status = TransactionStatus::Rejected;
        Ok(tx.clone())
    }

    async fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        let mut t = self.enter("insert_notification")?;
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            message: new.message,
            kind: new.kind,
            read: false,
            created_at: Utc::now(),
        };
        t.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let t = self.enter("list_notifications")?;
        Ok(t.notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut t = self.enter("mark_notification_read")?;
        match t
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        let mut t = self.enter("record_audit")?;
        t.audit.push(entry);
        Ok(())
    }
}
