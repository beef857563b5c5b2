use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::{Order, OrderItem, OrderStatus, PaymentMethod, User};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    /// Subtotal shown on the review step. Defaults to the current cart subtotal.
    pub expected_total: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutReceipt {
    pub tracking_number: String,
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// User snapshot re-read after the order was placed.
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub step_index: usize,
    pub progress: f64,
    pub can_confirm: bool,
}

impl OrderWithItems {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            step_index: order.status.step_index(),
            progress: order.status.progress(),
            can_confirm: order.status.can_user_confirm(),
            order,
            items,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackQuery {
    pub code: String,
}

/// Result of a tracking-code lookup. A miss is not an error.
#[derive(Debug, Serialize, ToSchema)]
pub struct TrackLookup {
    pub found: bool,
    pub order: Option<OrderWithItems>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmDeliveryRequest {
    /// Must be `true`; the user has to explicitly acknowledge receipt.
    pub confirmed: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}
