mod common;

use common::{admin, auth, create_product, create_user, setup};
use storefront_api::{
    config::AppConfig,
    dto::{
        admin::SetBalanceRequest,
        products::{CreateProductRequest, UpdateProductRequest},
    },
    error::AppError,
    models::MAX_PRICE,
    remote::RemoteStore,
    routes::params::{LowStockQuery, ProductQuery, TransactionQuery},
    services::{admin_service, product_service},
    state::AppState,
};

#[tokio::test]
async fn console_is_closed_to_regular_users() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 10).await?;
    let auth = auth(&user);
    store.reset_calls();

    let forbidden = [
        admin_service::list_users(&state, &auth, Default::default())
            .await
            .err(),
        admin_service::list_low_stock(&state, &auth, LowStockQuery::default())
            .await
            .err(),
        admin_service::set_balance(&state, &auth, user.id, SetBalanceRequest { balance: 1_000_000 })
            .await
            .err(),
    ];
    for err in forbidden {
        assert!(matches!(err, Some(AppError::Forbidden)));
    }
    assert_eq!(store.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn balance_override_is_audited() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 10).await?;

    let updated = admin_service::set_balance(
        &state,
        &admin(),
        user.id,
        SetBalanceRequest { balance: 4200 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.balance, 4200);
    assert!(store.audit_actions().contains(&"balance_override".to_string()));

    let err = admin_service::set_balance(&state, &admin(), user.id, SetBalanceRequest { balance: -1 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn low_stock_lists_products_at_or_under_threshold() -> anyhow::Result<()> {
    let (state, store) = setup();
    create_product(&store, "Plenty", 100, 50).await?;
    let low = create_product(&store, "Scarce", 100, 5).await?;
    let gone = create_product(&store, "Gone", 100, 0).await?;

    let list = admin_service::list_low_stock(&state, &admin(), LowStockQuery::default())
        .await?
        .data
        .unwrap();
    let mut ids: Vec<_> = list.items.iter().map(|p| p.id).collect();
    ids.sort();
    let mut expected = vec![low.id, gone.id];
    expected.sort();
    assert_eq!(ids, expected);

    let strict = admin_service::list_low_stock(
        &state,
        &admin(),
        LowStockQuery {
            threshold: Some(0),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(strict.items.len(), 1);
    assert_eq!(strict.items[0].id, gone.id);
    Ok(())
}

#[tokio::test]
async fn deactivated_products_leave_the_catalog() -> anyhow::Result<()> {
    let (state, _store) = setup();
    let created = product_service::create_product(
        &state,
        &admin(),
        CreateProductRequest {
            name: "  Tablet ".into(),
            description: Some("10 inch".into()),
            price: 900,
            category: "Tablets".into(),
            images: vec![],
            stock_quantity: 4,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(created.name, "Tablet");
    assert!(created.is_active);

    let catalog = product_service::list_products(&state, ProductQuery::default())
        .await?
        .data
        .unwrap();
    assert_eq!(catalog.items.len(), 1);

    product_service::update_product(
        &state,
        &admin(),
        created.id,
        UpdateProductRequest {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await?;

    let catalog = product_service::list_products(&state, ProductQuery::default())
        .await?
        .data
        .unwrap();
    assert!(catalog.items.is_empty());
    assert!(matches!(
        product_service::get_product(&state, created.id).await,
        Err(AppError::NotFound)
    ));

    let everything = product_service::list_all_products(&state, &admin(), ProductQuery::default())
        .await?
        .data
        .unwrap();
    assert_eq!(everything.items.len(), 1);
    assert!(!everything.items[0].is_active);
    Ok(())
}

#[tokio::test]
async fn product_numbers_are_validated() -> anyhow::Result<()> {
    let (state, store) = setup();
    store.reset_calls();
    let err = product_service::create_product(
        &state,
        &admin(),
        CreateProductRequest {
            name: "Free".into(),
            description: None,
            price: 0,
            category: "Misc".into(),
            images: vec![],
            stock_quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = product_service::create_product(
        &state,
        &admin(),
        CreateProductRequest {
            name: "Gold".into(),
            description: None,
            price: MAX_PRICE + 1,
            category: "Misc".into(),
            images: vec![],
            stock_quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("Price cannot exceed")));

    let err = product_service::update_product(
        &state,
        &admin(),
        uuid::Uuid::new_v4(),
        UpdateProductRequest {
            price: Some(i64::MAX),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(store.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn product_images_land_in_the_upload_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = AppConfig {
        upload_dir: dir.path().to_string_lossy().into_owned(),
        public_base_url: "http://shop.test".into(),
        ..AppConfig::for_memory(common::JWT_SECRET)
    };
    let (state, _store) = AppState::in_memory(config);

    let uploaded = product_service::upload_product_image(&state, &admin(), "front.JPG", b"img")
        .await?
        .data
        .unwrap();
    assert!(uploaded.url.starts_with("http://shop.test/uploads/"));
    assert!(uploaded.url.ends_with(".jpg"));

    let name = uploaded.url.rsplit('/').next().unwrap_or_default();
    assert_eq!(tokio::fs::read(dir.path().join(name)).await?, b"img");
    Ok(())
}

#[tokio::test]
async fn transactions_can_be_filtered_by_status() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 1000).await?;
    let tx = store
        .create_deposit(storefront_api::remote::NewTransactionRequest {
            user_id: user.id,
            amount: 100,
            reference_id: Some("REF".into()),
            details: None,
        })
        .await?;
    store.admin_approve_deposit(tx.id).await?;
    store
        .create_deposit(storefront_api::remote::NewTransactionRequest {
            user_id: user.id,
            amount: 200,
            reference_id: Some("REF-2".into()),
            details: None,
        })
        .await?;

    let pending = admin_service::list_transactions(
        &state,
        &admin(),
        TransactionQuery {
            status: Some("pending".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(pending.items.len(), 1);
    assert_eq!(pending.items[0].amount, 200);

    let all = admin_service::list_transactions(
        &state,
        &admin(),
        TransactionQuery {
            status: Some("all".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(all.items.len(), 2);
    Ok(())
}
