mod common;

use chrono::{DateTime, TimeZone, Utc};
use common::{admin, auth, balance, create_user, setup};
use storefront_api::{
    dto::wallet::{DepositRequest, WithdrawalRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::{Transaction, TransactionKind, TransactionStatus},
    remote::RemoteStore,
    services::{admin_service, wallet_service},
    state::AppState,
};

// Monday 10:00 UTC.
fn open_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).single().expect("valid time")
}

async fn withdraw(
    state: &AppState,
    user: &AuthUser,
    amount: i64,
    account: Option<&str>,
) -> Result<Transaction, AppError> {
    let receipt = wallet_service::request_withdrawal_at(
        state,
        user,
        WithdrawalRequest {
            amount,
            account: account.map(str::to_string),
        },
        open_hours(),
    )
    .await?;
    Ok(receipt.data.expect("receipt").transaction)
}

fn message(err: AppError) -> String {
    match err {
        AppError::BadRequest(m) | AppError::Rejected(m) => m,
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn withdrawal_debits_and_rejection_refunds_every_time() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 1000).await?;
    let auth = auth(&user);

    for _ in 0..3 {
        let tx = withdraw(&state, &auth, 400, Some("BANK-1")).await?;
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.kind, TransactionKind::Withdrawal);
        assert_eq!(balance(&store, &user).await?, 600);

        let rejected = admin_service::reject_transaction(&state, &admin(), tx.id)
            .await?
            .data
            .unwrap();
        assert_eq!(rejected.status, TransactionStatus::Rejected);
        assert_eq!(balance(&store, &user).await?, 1000);
    }

    let titles: Vec<_> = store
        .list_notifications(user.id)
        .await?
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(titles, vec!["Withdrawal Rejected"; 3]);
    Ok(())
}

#[tokio::test]
async fn approved_withdrawal_keeps_the_debit() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 1000).await?;
    let tx = withdraw(&state, &auth(&user), 250, Some("BANK-1")).await?;

    let done = admin_service::approve_transaction(&state, &admin(), tx.id)
        .await?
        .data
        .unwrap();
    assert_eq!(done.status, TransactionStatus::Completed);
    assert_eq!(balance(&store, &user).await?, 750);

    let err = admin_service::reject_transaction(&state, &admin(), tx.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Rejected(_)));
    assert_eq!(balance(&store, &user).await?, 750);

    let latest = store.list_notifications(user.id).await?;
    assert_eq!(latest[0].title, "Withdrawal Success");
    Ok(())
}

#[tokio::test]
async fn withdrawal_gates_run_before_the_store() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 500).await?;
    let auth = auth(&user);

    let sunday = Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).single().expect("valid time");
    let late = Utc.with_ymd_and_hms(2024, 6, 3, 20, 30, 0).single().expect("valid time");
    for (when, expected) in [
        (sunday, wallet_service::CLOSED_TODAY),
        (late, wallet_service::CUTOFF_PASSED),
    ] {
        store.reset_calls();
        let err = wallet_service::request_withdrawal_at(
            &state,
            &auth,
            WithdrawalRequest {
                amount: 200,
                account: Some("BANK-1".into()),
            },
            when,
        )
        .await
        .unwrap_err();
        assert_eq!(message(err), expected);
        assert_eq!(store.total_calls(), 0);
    }

    let err = withdraw(&state, &auth, 200, None).await.unwrap_err();
    assert_eq!(
        message(err),
        "Please enter the amount and the destination account."
    );
    let err = withdraw(&state, &auth, 50, Some("BANK-1")).await.unwrap_err();
    assert_eq!(message(err), "Minimum withdrawal is 100.");
    let err = withdraw(&state, &auth, 900, Some("BANK-1")).await.unwrap_err();
    assert_eq!(message(err), "Insufficient wallet balance.");

    assert_eq!(store.call_count("create_withdrawal"), 0);
    assert_eq!(balance(&store, &user).await?, 500);
    Ok(())
}

#[tokio::test]
async fn saved_account_is_used_when_none_is_given() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 500).await?;
    store.set_withdrawal_account(user.id, "SAVED-9".into()).await?;

    let tx = withdraw(&state, &auth(&user), 100, None).await?;
    assert_eq!(tx.details.as_deref(), Some("SAVED-9"));
    Ok(())
}

#[tokio::test]
async fn deposits_credit_only_on_approval() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);

    let request = |amount: i64, reference: &str| DepositRequest {
        amount,
        reference_id: reference.to_string(),
        details: None,
    };

    let first = wallet_service::request_deposit(&state, &auth, request(300, "REF-1"))
        .await?
        .data
        .unwrap();
    assert_eq!(first.transaction.status, TransactionStatus::Pending);
    assert_eq!(first.user.balance, 0);

    let summary = wallet_service::summary(&state, &auth).await?.data.unwrap();
    assert_eq!(summary.pending_deposits, 300);
    assert_eq!(summary.min_withdrawal, 100);

    admin_service::approve_transaction(&state, &admin(), first.transaction.id).await?;
    assert_eq!(balance(&store, &user).await?, 300);

    let second = wallet_service::request_deposit(&state, &auth, request(700, "REF-2"))
        .await?
        .data
        .unwrap();
    admin_service::reject_transaction(&state, &admin(), second.transaction.id).await?;
    assert_eq!(balance(&store, &user).await?, 300);

    let err = admin_service::approve_transaction(&state, &admin(), second.transaction.id)
        .await
        .unwrap_err();
    assert_eq!(message(err), "Transaction is not pending");

    let titles: Vec<_> = store
        .list_notifications(user.id)
        .await?
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(titles, vec!["Deposit Rejected", "Deposit Approved"]);

    let ledger = wallet_service::list_transactions(&state, &auth, Default::default())
        .await?
        .data
        .unwrap();
    assert_eq!(ledger.items.len(), 2);
    assert_eq!(ledger.items[0].id, second.transaction.id);
    Ok(())
}

#[tokio::test]
async fn blank_deposit_reference_is_refused() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    store.reset_calls();

    let err = wallet_service::request_deposit(
        &state,
        &auth(&user),
        DepositRequest {
            amount: 100,
            reference_id: "  ".into(),
            details: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(store.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn only_admins_decide_transactions() -> anyhow::Result<()> {
    let (state, store) = setup();
    let user = create_user(&store, "0700", 0).await?;
    let auth = auth(&user);
    let tx = wallet_service::request_deposit(
        &state,
        &auth,
        DepositRequest {
            amount: 100,
            reference_id: "REF".into(),
            details: None,
        },
    )
    .await?
    .data
    .unwrap()
    .transaction;

    let err = admin_service::approve_transaction(&state, &auth, tx.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    assert_eq!(balance(&store, &user).await?, 0);
    Ok(())
}
