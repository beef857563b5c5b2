use std::{collections::HashMap, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlxPostgresConnector,
    TransactionTrait,
};
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

use super::{
    AuditEntry, BALANCE_OUT_OF_RANGE, CART_CHANGED, CART_EMPTY, CheckoutCommand,
    INSUFFICIENT_BALANCE, LINE_QUANTITY_LIMIT, NewNotification, NewProduct, NewTransactionRequest,
    NewUser, ORDER_TOTAL_OUT_OF_RANGE, OrderFilter, PlacedOrder, ProductFilter, ProductPatch,
    ProfileUpdate, RemoteStore, StoreError, StoreResult, TransactionFilter,
};
use crate::{
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        favorites::{self, Column as FavCol, Entity as Favorites},
        notifications::{self, Column as NoteCol, Entity as Notifications},
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, Column as OrderCol, Entity as Orders},
        products::{self, Column as ProdCol, Entity as Products},
        transactions::{self, Column as TxCol, Entity as Transactions},
        users::{self, Column as UserCol, Entity as Users},
    },
    models::{
        CartItem, CartLine, Favorite, MAX_LINE_QUANTITY, Notification, Order, OrderItem,
        OrderStatus, PaymentMethod, Product, Transaction, TransactionKind, TransactionStatus,
        UnknownVariant, User, UserRecord,
    },
};

pub type DbPool = PgPool;

/// PostgreSQL-backed store. Procedures run inside a single database transaction
/// and lock the rows they read before writing.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    orm: DatabaseConnection,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: DbPool) -> Self {
        let orm = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
        Self { pool, orm }
    }

    pub fn orm(&self) -> &DatabaseConnection {
        &self.orm
    }

    async fn pending_transaction(
        txn: &DatabaseTransaction,
        tx_id: Uuid,
    ) -> StoreResult<transactions::Model> {
        let tx = Transactions::find_by_id(tx_id)
            .lock(LockType::Update)
            .one(txn)
            .await?
            .ok_or(StoreError::NotFound)?;
        if tx.status != TransactionStatus::Pending.as_str() {
            return Err(StoreError::rejected("Transaction is not pending"));
        }
        Ok(tx)
    }

    async fn adjust_balance(txn: &DatabaseTransaction, user_id: Uuid, delta: i64) -> StoreResult<()> {
        let user = Users::find_by_id(user_id)
            .lock(LockType::Update)
            .one(txn)
            .await?
            .ok_or(StoreError::NotFound)?;
        let balance = user
            .balance
            .checked_add(delta)
            .ok_or_else(|| StoreError::rejected(BALANCE_OUT_OF_RANGE))?;
        Users::update_many()
            .col_expr(UserCol::Balance, Expr::value(balance))
            .filter(UserCol::Id.eq(user_id))
            .exec(txn)
            .await?;
        Ok(())
    }

    async fn set_transaction_status(
        txn: &DatabaseTransaction,
        tx: transactions::Model,
        status: TransactionStatus,
    ) -> StoreResult<Transaction> {
        let mut active: transactions::ActiveModel = tx.into();
        active.status = Set(status.as_str().to_string());
        transaction_from_entity(active.update(txn).await?)
    }
}

#[derive(FromRow)]
struct CartItemRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl RemoteStore for PgStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let exists = Users::find()
            .filter(UserCol::Phone.eq(new.phone.as_str()))
            .one(&self.orm)
            .await?;
        if exists.is_some() {
            return Err(StoreError::rejected("Phone number already in use"));
        }
        let model = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            phone: Set(new.phone),
            password_hash: Set(new.password_hash),
            balance: Set(0),
            is_admin: Set(new.is_admin),
            verification_code: Set(new.verification_code),
            full_name: Set(None),
            bio: Set(None),
            avatar_url: Set(None),
            withdrawal_account: Set(None),
            invited_by: Set(new.invited_by),
            registered_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(user_from_entity(model).user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.find_user_record(id).await?.map(|r| r.user))
    }

    async fn find_user_by_phone(&self, phone: &str) -> StoreResult<Option<UserRecord>> {
        Ok(Users::find()
            .filter(UserCol::Phone.eq(phone))
            .one(&self.orm)
            .await?
            .map(user_from_entity))
    }

    async fn find_user_record(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(user_from_entity))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(Users::find()
            .order_by_desc(UserCol::RegisteredAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(|m| user_from_entity(m).user)
            .collect())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User> {
        let existing = Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut active: users::ActiveModel = existing.into();
        if let Some(full_name) = update.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(bio) = update.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(avatar_url) = update.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        Ok(user_from_entity(active.update(&self.orm).await?).user)
    }

    async fn set_withdrawal_account(&self, id: Uuid, account: String) -> StoreResult<User> {
        let existing = Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut active: users::ActiveModel = existing.into();
        active.withdrawal_account = Set(Some(account));
        Ok(user_from_entity(active.update(&self.orm).await?).user)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> StoreResult<()> {
        let result = Users::update_many()
            .col_expr(UserCol::PasswordHash, Expr::value(password_hash))
            .filter(UserCol::Id.eq(id))
            .exec(&self.orm)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn admin_set_balance(&self, id: Uuid, balance: i64) -> StoreResult<User> {
        let existing = Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut active: users::ActiveModel = existing.into();
        active.balance = Set(balance);
        Ok(user_from_entity(active.update(&self.orm).await?).user)
    }

    async fn list_products(&self, filter: ProductFilter) -> StoreResult<Vec<Product>> {
        let mut condition = Condition::all();
        if filter.active_only {
            condition = condition.add(ProdCol::IsActive.eq(true));
        }
        if let Some(category) = filter.category {
            condition = condition.add(ProdCol::Category.eq(category));
        }
        if let Some(max_stock) = filter.max_stock {
            condition = condition.add(ProdCol::StockQuantity.lte(max_stock));
        }
        if let Some(search) = filter.search {
            let pattern = format!("%{search}%");
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
                    .add(Expr::col(ProdCol::Description).ilike(pattern)),
            );
        }
        Ok(Products::find()
            .filter(condition)
            .order_by_desc(ProdCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(product_from_entity))
    }

    async fn insert_product(&self, new: NewProduct) -> StoreResult<Product> {
        let model = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            description: Set(new.description),
            price: Set(new.price),
            category: Set(new.category),
            image_url: Set(new.images.first().cloned()),
            images: Set(serde_json::json!(new.images)),
            stock_quantity: Set(new.stock_quantity),
            is_active: Set(true),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(product_from_entity(model))
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Product> {
        let existing = Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut active: products::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = patch.price {
            active.price = Set(price);
        }
        if let Some(category) = patch.category {
            active.category = Set(category);
        }
        if let Some(images) = patch.images {
            active.image_url = Set(images.first().cloned());
            active.images = Set(serde_json::json!(images));
        }
        if let Some(stock) = patch.stock_quantity {
            active.stock_quantity = Set(stock);
        }
        if let Some(is_active) = patch.is_active {
            active.is_active = Set(is_active);
        }
        Ok(product_from_entity(active.update(&self.orm).await?))
    }

    async fn list_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        let rows = CartItems::find()
            .filter(CartCol::UserId.eq(user_id))
            .order_by_asc(CartCol::CreatedAt)
            .find_also_related(Products)
            .all(&self.orm)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| {
                product.map(|p| CartLine {
                    id: item.id,
                    product: product_from_entity(p),
                    quantity: item.quantity,
                })
            })
            .collect())
    }

    async fn merge_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> StoreResult<CartItem> {
        if Products::find_by_id(product_id)
            .one(&self.orm)
            .await?
            .is_none()
        {
            return Err(StoreError::NotFound);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(StoreError::rejected(LINE_QUANTITY_LIMIT));
        }
        // Single statement, so two concurrent adds both land. No row comes back
        // when the merged quantity would pass the line limit.
        let row = sqlx::query_as::<_, CartItemRow>(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity::BIGINT + EXCLUDED.quantity <= $5
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(i64::from(MAX_LINE_QUANTITY))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::rejected(LINE_QUANTITY_LIMIT))?;
        Ok(CartItem {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            created_at: row.created_at,
        })
    }

    async fn remove_cart_item(&self, user_id: Uuid, cart_item_id: Uuid) -> StoreResult<bool> {
        let result = CartItems::delete_many()
            .filter(
                Condition::all()
                    .add(CartCol::Id.eq(cart_item_id))
                    .add(CartCol::UserId.eq(user_id)),
            )
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn list_favorites(&self, user_id: Uuid) -> StoreResult<Vec<Product>> {
        let rows = Favorites::find()
            .filter(FavCol::UserId.eq(user_id))
            .order_by_desc(FavCol::CreatedAt)
            .find_also_related(Products)
            .all(&self.orm)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(_, product)| product.map(product_from_entity))
            .collect())
    }

    async fn toggle_favorite(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<Option<Favorite>> {
        let txn = self.orm.begin().await?;
        if Products::find_by_id(product_id).one(&txn).await?.is_none() {
            return Err(StoreError::NotFound);
        }
        let existing = Favorites::find()
            .filter(
                Condition::all()
                    .add(FavCol::UserId.eq(user_id))
                    .add(FavCol::ProductId.eq(product_id)),
            )
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let result = match existing {
            Some(favorite) => {
                favorite.delete(&txn).await?;
                None
            }
            None => {
                let model = favorites::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    created_at: NotSet,
                }
                .insert(&txn)
                .await?;
                Some(Favorite {
                    id: model.id,
                    product_id: model.product_id,
                    user_id: model.user_id,
                    created_at: model.created_at.with_timezone(&Utc),
                })
            }
        };
        txn.commit().await?;
        Ok(result)
    }

    async fn atomic_cart_checkout(&self, command: CheckoutCommand) -> StoreResult<PlacedOrder> {
        let txn = self.orm.begin().await?;

        let cart = CartItems::find()
            .filter(CartCol::UserId.eq(command.user_id))
            .order_by_asc(CartCol::CreatedAt)
            .lock(LockType::Update)
            .all(&txn)
            .await?;
        if cart.is_empty() {
            return Err(StoreError::rejected(CART_EMPTY));
        }

        let product_ids: Vec<Uuid> = cart.iter().map(|c| c.product_id).collect();
        let products: HashMap<Uuid, products::Model> = Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .lock(LockType::Update)
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut total_amount: i64 = 0;
        for item in &cart {
            let product = products.get(&item.product_id).ok_or(StoreError::NotFound)?;
            if !product.is_active {
                return Err(StoreError::rejected(format!(
                    "{} is no longer available",
                    product.name
                )));
            }
            if product.stock_quantity < item.quantity {
                return Err(StoreError::rejected(format!(
                    "Insufficient stock for {}",
                    product.name
                )));
            }
            total_amount = product
                .price
                .checked_mul(i64::from(item.quantity))
                .and_then(|line| total_amount.checked_add(line))
                .ok_or_else(|| StoreError::rejected(ORDER_TOTAL_OUT_OF_RANGE))?;
        }
        if total_amount != command.expected_total {
            return Err(StoreError::rejected(CART_CHANGED));
        }

        let user = Users::find_by_id(command.user_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound)?;
        let pays_from_wallet = command.payment_method == PaymentMethod::Balance;
        if pays_from_wallet && user.balance < total_amount {
            return Err(StoreError::rejected(INSUFFICIENT_BALANCE));
        }

        let taken = Orders::find()
            .filter(OrderCol::TrackingNumber.eq(command.tracking_number.as_str()))
            .one(&txn)
            .await?;
        if taken.is_some() {
            return Err(StoreError::rejected("Tracking number already assigned"));
        }

        let order = orders::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(command.user_id),
            total_amount: Set(total_amount),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            payment_method: Set(command.payment_method.as_str().to_string()),
            tracking_number: Set(command.tracking_number.clone()),
            receiver_name: Set(command.receiver_name),
            receiver_phone: Set(command.receiver_phone),
            delivery_address: Set(command.delivery_address),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(cart.len());
        for item in &cart {
            let product = products.get(&item.product_id).ok_or(StoreError::NotFound)?;
            let line = order_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(product.id),
                product_name: Set(product.name.clone()),
                quantity: Set(item.quantity),
                price: Set(product.price),
            }
            .insert(&txn)
            .await?;
            items.push(order_item_from_entity(line));

            Products::update_many()
                .col_expr(
                    ProdCol::StockQuantity,
                    Expr::col(ProdCol::StockQuantity).sub(item.quantity),
                )
                .filter(ProdCol::Id.eq(product.id))
                .exec(&txn)
                .await?;
        }

        if pays_from_wallet {
            Self::adjust_balance(&txn, command.user_id, -total_amount).await?;
            transactions::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(command.user_id),
                user_phone: Set(user.phone.clone()),
                kind: Set(TransactionKind::Purchase.as_str().to_string()),
                amount: Set(total_amount),
                status: Set(TransactionStatus::Completed.as_str().to_string()),
                reference_id: Set(Some(command.tracking_number)),
                method: Set(Some("Wallet".into())),
                details: Set(None),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }

        // Only the locked lines; rows added meanwhile stay in the cart.
        CartItems::delete_many()
            .filter(CartCol::Id.is_in(cart.iter().map(|c| c.id)))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(PlacedOrder {
            order: order_from_entity(order)?,
            items,
        })
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }
        if let Some(from) = filter.from {
            condition = condition.add(OrderCol::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            condition = condition.add(OrderCol::CreatedAt.lt(to));
        }
        Orders::find()
            .filter(condition)
            .order_by_desc(OrderCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect()
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn find_order_by_tracking(&self, tracking_number: &str) -> StoreResult<Option<Order>> {
        Orders::find()
            .filter(OrderCol::TrackingNumber.eq(tracking_number))
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        Ok(OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_item_from_entity)
            .collect())
    }

    async fn user_confirm_order_delivery(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> StoreResult<Order> {
        let txn = self.orm.begin().await?;
        let existing = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::Id.eq(order_id))
                    .add(OrderCol::UserId.eq(user_id)),
            )
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound)?;
        let status: OrderStatus = parse_text(&existing.status)?;
        if !status.can_user_confirm() {
            return Err(StoreError::rejected(format!(
                "Order cannot be confirmed while {status}"
            )));
        }
        let mut active: orders::ActiveModel = existing.into();
        active.status = Set(OrderStatus::Completed.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&txn).await?;
        txn.commit().await?;
        order_from_entity(order)
    }

    async fn admin_update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> StoreResult<Order> {
        let txn = self.orm.begin().await?;
        let existing = Orders::find_by_id(order_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound)?;
        let current: OrderStatus = parse_text(&existing.status)?;
        if !current.is_forward_to(status) {
            return Err(StoreError::rejected(format!(
                "Order cannot move from {current} to {status}"
            )));
        }
        if let Some(tracking) = tracking_number.as_ref() {
            let taken = Orders::find()
                .filter(
                    Condition::all()
                        .add(OrderCol::TrackingNumber.eq(tracking.as_str()))
                        .add(OrderCol::Id.ne(order_id)),
                )
                .one(&txn)
                .await?;
            if taken.is_some() {
                return Err(StoreError::rejected("Tracking number already assigned"));
            }
        }
        let mut active: orders::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        if let Some(tracking) = tracking_number {
            active.tracking_number = Set(tracking);
        }
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&txn).await?;
        txn.commit().await?;
        order_from_entity(order)
    }

    async fn create_deposit(&self, request: NewTransactionRequest) -> StoreResult<Transaction> {
        let user = Users::find_by_id(request.user_id)
            .one(&self.orm)
            .await?
            .ok_or(StoreError::NotFound)?;
        let model = transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            user_phone: Set(user.phone),
            kind: Set(TransactionKind::Deposit.as_str().to_string()),
            amount: Set(request.amount),
            status: Set(TransactionStatus::Pending.as_str().to_string()),
            reference_id: Set(request.reference_id),
            method: Set(Some("Payment".into())),
            details: Set(request.details),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        transaction_from_entity(model)
    }

    async fn create_withdrawal(&self, request: NewTransactionRequest) -> StoreResult<Transaction> {
        let txn = self.orm.begin().await?;
        let user = Users::find_by_id(request.user_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound)?;
        if user.balance < request.amount {
            return Err(StoreError::rejected(INSUFFICIENT_BALANCE));
        }
        Self::adjust_balance(&txn, user.id, -request.amount).await?;
        let model = transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            user_phone: Set(user.phone),
            kind: Set(TransactionKind::Withdrawal.as_str().to_string()),
            amount: Set(request.amount),
            status: Set(TransactionStatus::Pending.as_str().to_string()),
            reference_id: Set(request.reference_id),
            method: Set(Some("Withdrawal".into())),
            details: Set(request.details),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        transaction_from_entity(model)
    }

    async fn list_transactions(&self, filter: TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(TxCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(TxCol::Status.eq(status.as_str()));
        }
        Transactions::find()
            .filter(condition)
            .order_by_desc(TxCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(transaction_from_entity)
            .collect()
    }

    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        Transactions::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(transaction_from_entity)
            .transpose()
    }

    async fn admin_approve_deposit(&self, tx_id: Uuid) -> StoreResult<Transaction> {
        let txn = self.orm.begin().await?;
        let tx = Self::pending_transaction(&txn, tx_id).await?;
        if tx.kind != TransactionKind::Deposit.as_str() {
            return Err(StoreError::rejected("Transaction is not a deposit"));
        }
        Self::adjust_balance(&txn, tx.user_id, tx.amount).await?;
        let updated = Self::set_transaction_status(&txn, tx, TransactionStatus::Completed).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn admin_approve_withdrawal(&self, tx_id: Uuid) -> StoreResult<Transaction> {
        let txn = self.orm.begin().await?;
        let tx = Self::pending_transaction(&txn, tx_id).await?;
        if tx.kind != TransactionKind::Withdrawal.as_str() {
            return Err(StoreError::rejected("Transaction is not a withdrawal"));
        }
        let updated = Self::set_transaction_status(&txn, tx, TransactionStatus::Completed).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn admin_reject_transaction(&self, tx_id: Uuid) -> StoreResult<Transaction> {
        let txn = self.orm.begin().await?;
        let tx = Self::pending_transaction(&txn, tx_id).await?;
        if tx.kind == TransactionKind::Withdrawal.as_str() {
            Self::adjust_balance(&txn, tx.user_id, tx.amount).await?;
        }
        let updated = Self::set_transaction_status(&txn, tx, TransactionStatus::Rejected).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        let model = notifications::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new.user_id),
            title: Set(new.title),
            message: Set(new.message),
            kind: Set(new.kind.as_str().to_string()),
            read: Set(false),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        notification_from_entity(model)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        Notifications::find()
            .filter(NoteCol::UserId.eq(user_id))
            .order_by_desc(NoteCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(notification_from_entity)
            .collect()
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = Notifications::update_many()
            .col_expr(NoteCol::Read, Expr::value(true))
            .filter(
                Condition::all()
                    .add(NoteCol::Id.eq(id))
                    .add(NoteCol::UserId.eq(user_id)),
            )
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn record_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, resource, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(entry.resource)
        .bind(entry.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_text<T>(value: &str) -> StoreResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|err: UnknownVariant| StoreError::Internal(err.to_string()))
}

fn user_from_entity(model: users::Model) -> UserRecord {
    UserRecord {
        user: User {
            id: model.id,
            phone: model.phone,
            balance: model.balance,
            is_admin: model.is_admin,
            verification_code: model.verification_code,
            full_name: model.full_name,
            bio: model.bio,
            avatar_url: model.avatar_url,
            withdrawal_account: model.withdrawal_account,
            invited_by: model.invited_by,
            registered_at: model.registered_at.with_timezone(&Utc),
        },
        password_hash: model.password_hash,
    }
}

fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        category: model.category,
        image_url: model.image_url,
        images: serde_json::from_value(model.images).unwrap_or_default(),
        stock_quantity: model.stock_quantity,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_from_entity(model: orders::Model) -> StoreResult<Order> {
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: parse_text(&model.status)?,
        payment_method: parse_text(&model.payment_method)?,
        tracking_number: model.tracking_number,
        receiver_name: model.receiver_name,
        receiver_phone: model.receiver_phone,
        delivery_address: model.delivery_address,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: order_items::Model) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        price: model.price,
    }
}

fn transaction_from_entity(model: transactions::Model) -> StoreResult<Transaction> {
    Ok(Transaction {
        id: model.id,
        user_id: model.user_id,
        user_phone: model.user_phone,
        kind: parse_text(&model.kind)?,
        amount: model.amount,
        status: parse_text(&model.status)?,
        reference_id: model.reference_id,
        method: model.method,
        details: model.details,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn notification_from_entity(model: notifications::Model) -> StoreResult<Notification> {
    Ok(Notification {
        id: model.id,
        user_id: model.user_id,
        title: model.title,
        message: model.message,
        kind: parse_text(&model.kind)?,
        read: model.read,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
