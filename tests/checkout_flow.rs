mod common;

use common::{add, auth, balance, create_product, create_user, setup};
use storefront_api::{
    dto::orders::CheckoutRequest,
    error::AppError,
    models::{OrderStatus, PaymentMethod, TransactionKind, TransactionStatus},
    remote::{RemoteStore, TransactionFilter},
    services::{
        checkout_service::{
            self, CheckoutFlow, CheckoutStep, INSUFFICIENT_BALANCE, MISSING_SHIPPING_DETAILS,
            ShippingDetails,
        },
        order_service,
    },
    tracking::is_tracking_number,
};

fn request(method: PaymentMethod) -> CheckoutRequest {
    CheckoutRequest {
        receiver_name: "Ada Lovelace".into(),
        receiver_phone: "0700123456".into(),
        delivery_address: "12 Wilkinson Road".into(),
        payment_method: method,
        expected_total: None,
    }
}

#[tokio::test]
async fn wallet_checkout_is_refused_locally_when_balance_is_short() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 1000).await?;
    let auth = auth(&user);
    let a = create_product(&store, "Product A", 500, 10).await?;
    let b = create_product(&store, "Product B", 300, 10).await?;
    add(&state, &auth, &a, 2).await?;
    add(&state, &auth, &b, 1).await?;

    // The gate itself needs nothing from the store once the cart is loaded.
    let mut flow = CheckoutFlow::review(store.list_cart(user.id).await?);
    flow.proceed_to_shipping()?;
    store.reset_calls();
    let details = ShippingDetails::new("Ada", "0700", "Road", PaymentMethod::Balance);
    let err = flow.validate(&details, user.balance).unwrap_err();
    assert_eq!(err.to_string(), INSUFFICIENT_BALANCE);
    assert_eq!(store.total_calls(), 0);

    let err = checkout_service::checkout(&state, &auth, request(PaymentMethod::Balance))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == INSUFFICIENT_BALANCE));
    assert_eq!(store.call_count("atomic_cart_checkout"), 0);
    assert_eq!(store.list_cart(user.id).await?.len(), 2);
    assert_eq!(balance(&store, &user).await?, 1000);
    Ok(())
}

#[tokio::test]
async fn switching_to_cash_on_delivery_places_the_order() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 1000).await?;
    let auth = auth(&user);
    let a = create_product(&store, "Product A", 500, 10).await?;
    let b = create_product(&store, "Product B", 300, 10).await?;
    add(&state, &auth, &a, 2).await?;
    add(&state, &auth, &b, 1).await?;

    assert!(
        checkout_service::checkout(&state, &auth, request(PaymentMethod::Balance))
            .await
            .is_err()
    );
    let receipt = checkout_service::checkout(&state, &auth, request(PaymentMethod::Cod))
        .await?
        .data
        .unwrap();

    assert!(is_tracking_number(&receipt.tracking_number));
    assert_eq!(receipt.order.total_amount, 1300);
    assert_eq!(receipt.order.status, OrderStatus::Pending);
    assert_eq!(receipt.items.len(), 2);
    assert_eq!(receipt.user.balance, 1000);
    assert_eq!(store.call_count("atomic_cart_checkout"), 1);
    Ok(())
}

#[tokio::test]
async fn successful_checkout_empties_cart_and_tracks_back() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 5000).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 1200, 5).await?;
    add(&state, &auth, &phone, 2).await?;

    let receipt = checkout_service::checkout(&state, &auth, request(PaymentMethod::Balance))
        .await?
        .data
        .unwrap();

    assert!(store.list_cart(user.id).await?.is_empty());
    assert_eq!(state.cart_counts.get(user.id), Some(0));
    assert!(is_tracking_number(&receipt.tracking_number));

    let lookup = order_service::track(&state, &receipt.tracking_number)
        .await?
        .data
        .unwrap();
    assert!(lookup.found);
    assert_eq!(lookup.order.map(|o| o.order.id), Some(receipt.order.id));

    assert_eq!(receipt.user.balance, 2600);
    let stock = store.find_product(phone.id).await?.map(|p| p.stock_quantity);
    assert_eq!(stock, Some(3));

    let ledger = store
        .list_transactions(TransactionFilter {
            user_id: Some(user.id),
            status: None,
        })
        .await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].kind, TransactionKind::Purchase);
    assert_eq!(ledger[0].status, TransactionStatus::Completed);
    assert_eq!(ledger[0].amount, 2400);

    let feed = store.list_notifications(user.id).await?;
    assert_eq!(feed[0].title, "Order Placed");
    Ok(())
}

#[tokio::test]
async fn blank_shipping_fields_never_reach_the_store() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 100, 5).await?;
    add(&state, &auth, &phone, 1).await?;

    let mut req = request(PaymentMethod::Cod);
    req.delivery_address = "   ".into();
    let err = checkout_service::checkout(&state, &auth, req)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), MISSING_SHIPPING_DETAILS);
    assert_eq!(store.call_count("atomic_cart_checkout"), 0);
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_a_validation_error() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;

    let err = checkout_service::checkout(&state, &auth(&user), request(PaymentMethod::Cod))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(store.call_count("atomic_cart_checkout"), 0);
    Ok(())
}

#[tokio::test]
async fn stale_review_total_is_rejected_and_cart_kept() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 100, 5).await?;
    add(&state, &auth, &phone, 1).await?;

    let mut req = request(PaymentMethod::Cod);
    req.expected_total = Some(50);
    let err = checkout_service::checkout(&state, &auth, req)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Rejected(_)));
    assert!(err.to_string().starts_with("Cart changed"));
    assert_eq!(store.list_cart(user.id).await?.len(), 1);
    assert!(store.list_orders(Default::default()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn insufficient_stock_rolls_back_everything() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 10_000).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 100, 1).await?;
    add(&state, &auth, &phone, 3).await?;

    let err = checkout_service::checkout(&state, &auth, request(PaymentMethod::Balance))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rejected(_)));
    assert_eq!(balance(&store, &user).await?, 10_000);
    assert_eq!(
        store.find_product(phone.id).await?.map(|p| p.stock_quantity),
        Some(1)
    );
    assert_eq!(store.list_cart(user.id).await?.len(), 1);
    Ok(())
}

#[test]
fn flow_steps_are_ordered() {
    let flow = CheckoutFlow::review(Vec::new());
    assert_eq!(flow.step(), CheckoutStep::Review);
    assert_eq!(flow.subtotal(), 0);
}

#[tokio::test]
async fn failed_refresh_after_commit_still_returns_the_receipt() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 100, 5).await?;
    add(&state, &auth, &phone, 2).await?;

    // The session load succeeds, the re-read after the commit fails.
    store.reset_calls();
    store.fail_operation("find_user", 1);
    let receipt = checkout_service::checkout(&state, &auth, request(PaymentMethod::Cod))
        .await?
        .data
        .unwrap();

    assert_eq!(receipt.order.total_amount, 200);
    assert_eq!(receipt.user.id, user.id);
    assert_eq!(receipt.user.balance, 0);
    assert_eq!(store.call_count("find_user"), 2);
    assert!(store.list_cart(user.id).await?.is_empty());
    assert_eq!(store.list_orders(Default::default()).await?.len(), 1);
    Ok(())
}
