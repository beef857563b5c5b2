mod common;

use common::{auth, create_product, create_user, setup};
use storefront_api::{
    dto::wishlist::ToggleWishlistRequest,
    error::AppError,
    routes::params::Pagination,
    services::wishlist_service,
};
use uuid::Uuid;

#[tokio::test]
async fn toggling_saves_then_removes() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let phone = create_product(&store, "Phone", 500, 10).await?;
    let toggle = || ToggleWishlistRequest {
        product_id: phone.id,
    };

    let on = wishlist_service::toggle_wishlist(&state, &auth, toggle()).await?;
    assert_eq!(on.message, "Added to wishlist");
    assert!(on.data.unwrap().saved);

    let saved = wishlist_service::list_wishlist(&state, &auth, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(saved.items.len(), 1);
    assert_eq!(saved.items[0].id, phone.id);

    let off = wishlist_service::toggle_wishlist(&state, &auth, toggle()).await?;
    assert_eq!(off.message, "Removed from wishlist");
    assert!(!off.data.unwrap().saved);

    let saved = wishlist_service::list_wishlist(&state, &auth, Pagination::default())
        .await?
        .data
        .unwrap();
    assert!(saved.items.is_empty());
    assert_eq!(store.call_count("toggle_favorite"), 2);
    Ok(())
}

#[tokio::test]
async fn wishlist_is_newest_first_and_per_user() -> anyhow::Result<()> {
    let (state, store) = setup();
    let ada = create_user(&store, "0701", 0).await?;
    let bob = create_user(&store, "0702", 0).await?;
    let phone = create_product(&store, "Phone", 500, 10).await?;
    let case = create_product(&store, "Case", 50, 10).await?;

    for product in [&phone, &case] {
        wishlist_service::toggle_wishlist(
            &state,
            &auth(&ada),
            ToggleWishlistRequest {
                product_id: product.id,
            },
        )
        .await?;
    }

    let list = wishlist_service::list_wishlist(&state, &auth(&ada), Pagination::default())
        .await?;
    assert_eq!(list.meta.and_then(|m| m.total), Some(2));
    let ids: Vec<_> = list.data.unwrap().items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![case.id, phone.id]);

    let other = wishlist_service::list_wishlist(&state, &auth(&bob), Pagination::default())
        .await?
        .data
        .unwrap();
    assert!(other.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_product_is_not_found() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;

    let err = wishlist_service::toggle_wishlist(
        &state,
        &auth(&user),
        ToggleWishlistRequest {
            product_id: Uuid::new_v4(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn failed_read_shows_an_empty_wishlist() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let phone = create_product(&store, "Phone", 500, 10).await?;
    wishlist_service::toggle_wishlist(
        &state,
        &auth(&user),
        ToggleWishlistRequest {
            product_id: phone.id,
        },
    )
    .await?;

    store.fail_operation("list_favorites", 0);
    let list = wishlist_service::list_wishlist(&state, &auth(&user), Pagination::default())
        .await?
        .data
        .unwrap();
    assert!(list.items.is_empty());
    Ok(())
}
