mod common;

use common::{add, admin, auth, create_product, create_user, setup};
use storefront_api::{
    dto::orders::{CheckoutRequest, ConfirmDeliveryRequest, UpdateOrderStatusRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::{Order, OrderStatus, PaymentMethod},
    remote::RemoteStore,
    routes::params::OrderListQuery,
    services::{admin_service, checkout_service, order_service},
    state::AppState,
};

async fn place_order(state: &AppState, user: &AuthUser) -> anyhow::Result<Order> {
    let receipt = checkout_service::checkout(
        state,
        user,
        CheckoutRequest {
            receiver_name: "Ada".into(),
            receiver_phone: "0700".into(),
            delivery_address: "Road 1".into(),
            payment_method: PaymentMethod::Cod,
            expected_total: None,
        },
    )
    .await?;
    Ok(receipt.data.unwrap().order)
}

async fn advance(state: &AppState, order: &Order, status: OrderStatus) -> Result<Order, AppError> {
    let resp = admin_service::update_order_status(
        state,
        &admin(),
        order.id,
        UpdateOrderStatusRequest {
            status,
            tracking_number: None,
        },
    )
    .await?;
    Ok(resp.data.unwrap().order)
}

#[tokio::test]
async fn tracking_lookup_ignores_case() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 100, 5).await?;
    add(&state, &auth, &phone, 1).await?;
    let order = place_order(&state, &auth).await?;

    let upper = order_service::track(&state, &order.tracking_number).await?.data.unwrap();
    let lower = order_service::track(&state, &format!("  {}  ", order.tracking_number.to_lowercase()))
        .await?
        .data
        .unwrap();
    assert_eq!(upper.order.map(|o| o.order.id), Some(order.id));
    assert_eq!(lower.order.map(|o| o.order.id), Some(order.id));
    Ok(())
}

#[tokio::test]
async fn unknown_and_blank_codes_are_not_found() -> anyhow::Result<()> {
    let (state, store) = setup();

    let missing = order_service::track(&state, "TRK-AB12-CD34").await?;
    assert_eq!(missing.message, "Not found");
    assert!(!missing.data.unwrap().found);

    store.reset_calls();
    let blank = order_service::track(&state, "   ").await?.data.unwrap();
    assert!(!blank.found);
    assert_eq!(store.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn confirmation_requires_shipped_or_delivered() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 100, 5).await?;
    add(&state, &auth, &phone, 1).await?;
    let order = place_order(&state, &auth).await?;

    let err = order_service::confirm_delivery(
        &state,
        &auth,
        order.id,
        ConfirmDeliveryRequest { confirmed: true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Rejected(_)));

    advance(&state, &order, OrderStatus::Shipped).await?;

    store.reset_calls();
    let err = order_service::confirm_delivery(
        &state,
        &auth,
        order.id,
        ConfirmDeliveryRequest { confirmed: false },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(store.total_calls(), 0);

    let done = order_service::confirm_delivery(
        &state,
        &auth,
        order.id,
        ConfirmDeliveryRequest { confirmed: true },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(done.order.status, OrderStatus::Completed);
    assert_eq!(done.progress, 1.0);
    assert!(!done.can_confirm);
    Ok(())
}

#[tokio::test]
async fn strangers_cannot_confirm_someone_elses_order() -> anyhow::Result<()> {
    let (state, store) = setup();
    let owner = create_user(&store, "0701", 0).await?;
    let stranger = create_user(&store, "0702", 0).await?;
    let phone = create_product(&store, "Phone", 100, 5).await?;
    add(&state, &auth(&owner), &phone, 1).await?;
    let order = place_order(&state, &auth(&owner)).await?;
    advance(&state, &order, OrderStatus::Delivered).await?;

    let err = order_service::confirm_delivery(
        &state,
        &auth(&stranger),
        order.id,
        ConfirmDeliveryRequest { confirmed: true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn admin_moves_orders_forward_only_and_notifies_owner() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 100, 5).await?;
    add(&state, &auth, &phone, 1).await?;
    let order = place_order(&state, &auth).await?;
    let mut live = state.hub.subscribe(user.id);

    let shipped = admin_service::update_order_status(
        &state,
        &admin(),
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
            tracking_number: Some("trk-zzzz-9999".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(shipped.order.tracking_number, "TRK-ZZZZ-9999");
    assert_eq!(shipped.step_index, 2);

    let pushed = live.recv().await.expect("owner notified");
    assert_eq!(pushed.title, "Order Update");

    advance(&state, &order, OrderStatus::Delivered).await?;
    let err = advance(&state, &order, OrderStatus::Shipped).await.unwrap_err();
    assert!(matches!(err, AppError::Rejected(_)));

    let err = advance(&state, &order, OrderStatus::Completed).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let updates = store
        .list_notifications(user.id)
        .await?
        .into_iter()
        .filter(|n| n.title == "Order Update")
        .count();
    assert_eq!(updates, 2);
    Ok(())
}

#[tokio::test]
async fn order_history_is_newest_first_and_filterable() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 100, 10).await?;

    add(&state, &auth, &phone, 1).await?;
    let first = place_order(&state, &auth).await?;
    add(&state, &auth, &phone, 2).await?;
    let second = place_order(&state, &auth).await?;
    advance(&state, &first, OrderStatus::Processing).await?;

    let all = order_service::list_orders(&state, &auth, OrderListQuery::default())
        .await?
        .data
        .unwrap();
    let ids: Vec<_> = all.items.iter().map(|o| o.order.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(all.items[0].items.len(), 1);

    let processing = order_service::list_orders(
        &state,
        &auth,
        OrderListQuery {
            status: Some("processing".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(processing.items.len(), 1);
    assert_eq!(processing.items[0].order.id, first.id);
    assert_eq!(processing.items[0].progress, 0.25);

    let err = order_service::list_orders(
        &state,
        &auth,
        OrderListQuery {
            status: Some("lost".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}
