//! Cart to order conversion.
//!
//! A checkout walks `Review -> Shipping -> Success`. Everything up to the
//! final commit is validated locally; the commit itself is one call to the
//! store's `atomic_cart_checkout` procedure.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CheckoutReceipt, CheckoutRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartLine, NotificationKind, PaymentMethod},
    remote::CheckoutCommand,
    response::ApiResponse,
    services::cart_service::subtotal,
    session::Session,
    state::AppState,
    tracking::generate_tracking_number,
};

pub const MISSING_SHIPPING_DETAILS: &str = "Please fill in all shipping details.";
pub const INSUFFICIENT_BALANCE: &str =
    "Insufficient wallet balance. Please top up or select Pay on Delivery.";
pub const EMPTY_CART: &str = "Your cart is empty.";
pub const ORDER_TOO_LARGE: &str = "Order total is too large.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    Review,
    Shipping,
    Success,
}

#[derive(Debug, Clone)]
pub struct ShippingDetails {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
}

impl ShippingDetails {
    /// Trims the text fields so whitespace-only input counts as empty.
    pub fn new(
        receiver_name: &str,
        receiver_phone: &str,
        delivery_address: &str,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            receiver_name: receiver_name.trim().to_string(),
            receiver_phone: receiver_phone.trim().to_string(),
            delivery_address: delivery_address.trim().to_string(),
            payment_method,
        }
    }

    fn is_complete(&self) -> bool {
        !self.receiver_name.is_empty()
            && !self.receiver_phone.is_empty()
            && !self.delivery_address.is_empty()
    }
}

impl From<&CheckoutRequest> for ShippingDetails {
    fn from(req: &CheckoutRequest) -> Self {
        Self::new(
            &req.receiver_name,
            &req.receiver_phone,
            &req.delivery_address,
            req.payment_method,
        )
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    step: CheckoutStep,
    lines: Vec<CartLine>,
    subtotal: i64,
    tracking_number: Option<String>,
}

impl CheckoutFlow {
    /// Opens the review step. No store round trip.
    pub fn review(lines: Vec<CartLine>) -> Self {
        Self {
            step: CheckoutStep::Review,
            subtotal: subtotal(&lines),
            lines,
            tracking_number: None,
        }
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn subtotal(&self) -> i64 {
        self.subtotal
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn proceed_to_shipping(&mut self) -> AppResult<()> {
        self.expect_step(CheckoutStep::Review)?;
        if self.lines.is_empty() {
            return Err(AppError::bad_request(EMPTY_CART));
        }
        self.step = CheckoutStep::Shipping;
        Ok(())
    }

    pub fn back_to_review(&mut self) -> AppResult<()> {
        self.expect_step(CheckoutStep::Shipping)?;
        self.step = CheckoutStep::Review;
        Ok(())
    }

    /// Local gates checked before anything is sent to the store.
    pub fn validate(&self, details: &ShippingDetails, balance: i64) -> AppResult<()> {
        self.expect_step(CheckoutStep::Shipping)?;
        if !details.is_complete() {
            return Err(AppError::bad_request(MISSING_SHIPPING_DETAILS));
        }
        if CartLine::checked_total(&self.lines).is_none() {
            return Err(AppError::bad_request(ORDER_TOO_LARGE));
        }
        if details.payment_method == PaymentMethod::Balance && balance < self.subtotal {
            return Err(AppError::bad_request(INSUFFICIENT_BALANCE));
        }
        Ok(())
    }

    pub fn command(
        &self,
        user_id: Uuid,
        details: ShippingDetails,
        expected_total: i64,
        tracking_number: String,
    ) -> CheckoutCommand {
        CheckoutCommand {
            user_id,
            expected_total,
            payment_method: details.payment_method,
            receiver_name: details.receiver_name,
            receiver_phone: details.receiver_phone,
            delivery_address: details.delivery_address,
            tracking_number,
        }
    }

    pub fn complete(&mut self, tracking_number: String) -> AppResult<()> {
        self.expect_step(CheckoutStep::Shipping)?;
        self.lines.clear();
        self.tracking_number = Some(tracking_number);
        self.step = CheckoutStep::Success;
        Ok(())
    }

    fn expect_step(&self, expected: CheckoutStep) -> AppResult<()> {
        if self.step != expected {
            return Err(AppError::bad_request(format!(
                "Checkout is at the {:?} step, expected {:?}",
                self.step, expected
            )));
        }
        Ok(())
    }
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutReceipt>> {
    let mut session = Session::load(state.store.as_ref(), user).await?;
    let lines = state.store.list_cart(user.user_id).await?;

    let mut flow = CheckoutFlow::review(lines);
    flow.proceed_to_shipping()?;
    let details = ShippingDetails::from(&payload);
    flow.validate(&details, session.balance())?;

    let expected_total = payload.expected_total.unwrap_or(flow.subtotal());
    let tracking_number = generate_tracking_number();
    let command = flow.command(user.user_id, details, expected_total, tracking_number);
    let placed = match state.store.atomic_cart_checkout(command).await {
        Ok(placed) => placed,
        Err(err) => {
            let err = AppError::from(err);
            tracing::warn!(user_id = %user.user_id, error = %err, "checkout failed");
            return Err(err);
        }
    };
    flow.complete(placed.order.tracking_number.clone())?;

    state.cart_counts.refresh(state.store.as_ref(), user.user_id).await;
    state
        .notifier()
        .push(
            user.user_id,
            "Order Placed",
            format!(
                "Order {} has been placed and is being packed.",
                placed.order.tracking_number
            ),
            NotificationKind::Success,
        )
        .await;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "order_checkout",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": placed.order.id,
            "total": placed.order.total_amount,
            "payment_method": placed.order.payment_method,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    tracing::info!(
        user_id = %user.user_id,
        order_id = %placed.order.id,
        tracking = %placed.order.tracking_number,
        "order placed"
    );

    // The order is committed; a failed re-read must not turn it into an error.
    let user = match session.refresh(state.store.as_ref()).await {
        Ok(user) => user.clone(),
        Err(err) => {
            tracing::warn!(user_id = %user.user_id, error = %err, "user refresh after checkout failed");
            session.user.clone()
        }
    };
    Ok(ApiResponse::success(
        "Order placed",
        CheckoutReceipt {
            tracking_number: placed.order.tracking_number.clone(),
            order: placed.order,
            items: placed.items,
            user,
        },
        None,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Product;

    fn line(price: i64, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            product: Product {
                id: Uuid::new_v4(),
                name: format!("item-{price}"),
                description: None,
                price,
                category: "Phones".into(),
                image_url: None,
                images: Vec::new(),
                stock_quantity: 10,
                is_active: true,
                created_at: Utc::now(),
            },
            quantity,
        }
    }

    fn details(method: PaymentMethod) -> ShippingDetails {
        ShippingDetails::new("Ada", "0700", "1 Main St", method)
    }

    #[test]
    fn review_computes_subtotal() {
        let flow = CheckoutFlow::review(vec![line(500, 2), line(300, 1)]);
        assert_eq!(flow.step(), CheckoutStep::Review);
        assert_eq!(flow.subtotal(), 1300);
    }

    #[test]
    fn empty_cart_cannot_reach_shipping() {
        let mut flow = CheckoutFlow::review(Vec::new());
        let err = flow.proceed_to_shipping().unwrap_err();
        assert_eq!(err.to_string(), EMPTY_CART);
        assert_eq!(flow.step(), CheckoutStep::Review);
    }

    #[test]
    fn balance_gate_applies_only_to_wallet_payments() -> anyhow::Result<()> {
        let mut flow = CheckoutFlow::review(vec![line(500, 2), line(300, 1)]);
        flow.proceed_to_shipping()?;

        let err = flow.validate(&details(PaymentMethod::Balance), 1000).unwrap_err();
        assert_eq!(err.to_string(), INSUFFICIENT_BALANCE);
        flow.validate(&details(PaymentMethod::Balance), 1300)?;
        flow.validate(&details(PaymentMethod::Cod), 0)?;
        Ok(())
    }

    #[test]
    fn whitespace_fields_count_as_missing() -> anyhow::Result<()> {
        let mut flow = CheckoutFlow::review(vec![line(100, 1)]);
        flow.proceed_to_shipping()?;
        let blank = ShippingDetails::new("Ada", "   ", "1 Main St", PaymentMethod::Cod);
        let err = flow.validate(&blank, 0).unwrap_err();
        assert_eq!(err.to_string(), MISSING_SHIPPING_DETAILS);
        Ok(())
    }

    #[test]
    fn success_is_terminal() -> anyhow::Result<()> {
        let mut flow = CheckoutFlow::review(vec![line(100, 1)]);
        assert!(flow.validate(&details(PaymentMethod::Cod), 0).is_err());
        flow.proceed_to_shipping()?;
        assert_eq!(flow.step(), CheckoutStep::Shipping);

        flow.complete("TRK-AAAA-BBBB".into())?;
        assert_eq!(flow.step(), CheckoutStep::Success);
        assert!(flow.lines().is_empty());
        assert_eq!(flow.tracking_number(), Some("TRK-AAAA-BBBB"));
        assert!(flow.back_to_review().is_err());
        Ok(())
    }

    #[test]
    fn overflowing_total_is_refused_even_on_delivery() -> anyhow::Result<()> {
        let mut flow = CheckoutFlow::review(vec![line(i64::MAX / 2, 3)]);
        flow.proceed_to_shipping()?;
        let err = flow.validate(&details(PaymentMethod::Cod), 0).unwrap_err();
        assert_eq!(err.to_string(), ORDER_TOO_LARGE);
        Ok(())
    }
}
