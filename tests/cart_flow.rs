mod common;

use common::{add, auth, balance, create_product, create_user, setup};
use storefront_api::{
    dto::{cart::AddToCartRequest, orders::CheckoutRequest},
    error::AppError,
    models::{MAX_LINE_QUANTITY, PaymentMethod, TransactionStatus},
    remote::{
        BALANCE_OUT_OF_RANGE, CheckoutCommand, LINE_QUANTITY_LIMIT, NewTransactionRequest,
        ORDER_TOTAL_OUT_OF_RANGE, ProductPatch, RemoteStore,
    },
    services::{
        cart_service,
        checkout_service::{self, ORDER_TOO_LARGE},
    },
};

#[tokio::test]
async fn adding_same_product_twice_merges_into_one_row() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 500, 10).await?;

    add(&state, &auth, &phone, 2).await?;
    add(&state, &auth, &phone, 3).await?;

    let cart = cart_service::get_cart(&state, &auth).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.items[0].line_total, 2500);
    assert_eq!(cart.subtotal, 2500);
    assert_eq!(store.call_count("merge_cart_item"), 2);
    Ok(())
}

#[tokio::test]
async fn rejects_non_positive_quantity_without_store_call() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let phone = create_product(&store, "Phone", 500, 10).await?;
    store.reset_calls();

    let err = cart_service::add_to_cart(
        &state,
        &auth(&user),
        AddToCartRequest {
            product_id: phone.id,
            quantity: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(store.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn inactive_products_cannot_be_added() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let phone = create_product(&store, "Phone", 500, 10).await?;
    store
        .update_product(
            phone.id,
            ProductPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

    let err = add(&state, &auth(&user), &phone, 1).await.unwrap_err();
    assert!(err.to_string().contains("not available"));
    assert_eq!(store.call_count("merge_cart_item"), 0);
    Ok(())
}

#[tokio::test]
async fn users_only_remove_their_own_lines() -> anyhow::Result<()> {
    let (state, store) = setup();
    let alice = create_user(&store, "0701", 0).await?;
    let bob = create_user(&store, "0702", 0).await?;
    let phone = create_product(&store, "Phone", 500, 10).await?;
    add(&state, &auth(&alice), &phone, 1).await?;

    let line_id = store.list_cart(alice.id).await?[0].id;
    let err = cart_service::remove_from_cart(&state, &auth(&bob), line_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    cart_service::remove_from_cart(&state, &auth(&alice), line_id).await?;
    assert!(store.list_cart(alice.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn cart_count_follows_mutations() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 500, 10).await?;
    let case = create_product(&store, "Case", 50, 10).await?;

    add(&state, &auth, &phone, 2).await?;
    add(&state, &auth, &case, 1).await?;
    assert_eq!(state.cart_counts.get(user.id), Some(3));

    let line_id = store.list_cart(user.id).await?[0].id;
    cart_service::remove_from_cart(&state, &auth, line_id).await?;
    let count = cart_service::cart_count(&state, &auth).await?.data.unwrap();
    assert!(count.count < 3);
    Ok(())
}

#[tokio::test]
async fn oversized_quantity_is_refused_before_the_store() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let phone = create_product(&store, "Phone", 500, 10).await?;
    store.reset_calls();

    for quantity in [MAX_LINE_QUANTITY + 1, i32::MAX] {
        let err = cart_service::add_to_cart(
            &state,
            &auth(&user),
            AddToCartRequest {
                product_id: phone.id,
                quantity,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
    assert_eq!(store.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn merging_past_the_line_limit_keeps_the_old_quantity() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 500, 10).await?;

    add(&state, &auth, &phone, MAX_LINE_QUANTITY).await?;
    let err = cart_service::add_to_cart(
        &state,
        &auth,
        AddToCartRequest {
            product_id: phone.id,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Rejected(ref m) if m == LINE_QUANTITY_LIMIT));

    let err = store
        .merge_cart_item(user.id, phone.id, i32::MAX)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), LINE_QUANTITY_LIMIT);

    let cart = store.list_cart(user.id).await?;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, MAX_LINE_QUANTITY);
    Ok(())
}

#[tokio::test]
async fn huge_totals_saturate_in_the_view_and_block_checkout() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    // Written straight to the store, past the catalog price ceiling.
    let vault = create_product(&store, "Vault", i64::MAX / 2, 10).await?;
    add(&state, &auth, &vault, 3).await?;

    let cart = cart_service::get_cart(&state, &auth).await?.data.unwrap();
    assert_eq!(cart.items[0].line_total, i64::MAX);
    assert_eq!(cart.subtotal, i64::MAX);

    let err = checkout_service::checkout(
        &state,
        &auth,
        CheckoutRequest {
            receiver_name: "Ada".into(),
            receiver_phone: "0700".into(),
            delivery_address: "Road".into(),
            payment_method: PaymentMethod::Cod,
            expected_total: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m == ORDER_TOO_LARGE));
    assert_eq!(store.call_count("atomic_cart_checkout"), 0);

    let err = store
        .atomic_cart_checkout(CheckoutCommand {
            user_id: user.id,
            expected_total: i64::MAX,
            payment_method: PaymentMethod::Cod,
            receiver_name: "Ada".into(),
            receiver_phone: "0700".into(),
            delivery_address: "Road".into(),
            tracking_number: "TRK-AAAA-BBBB".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), ORDER_TOTAL_OUT_OF_RANGE);
    assert_eq!(store.list_cart(user.id).await?.len(), 1);
    assert!(store.list_orders(Default::default()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn deposit_that_would_overflow_the_balance_is_rejected() -> anyhow::Result<()> {
    let (_state, store) = setup();
    let user = create_user(&store, "0700", i64::MAX - 10).await?;
    let deposit = store
        .create_deposit(NewTransactionRequest {
            user_id: user.id,
            amount: 100,
            reference_id: None,
            details: None,
        })
        .await?;

    let err = store.admin_approve_deposit(deposit.id).await.unwrap_err();
    assert_eq!(err.to_string(), BALANCE_OUT_OF_RANGE);
    assert_eq!(balance(&store, &user).await?, i64::MAX - 10);
    assert_eq!(
        store.find_transaction(deposit.id).await?.map(|tx| tx.status),
        Some(TransactionStatus::Pending)
    );
    Ok(())
}
