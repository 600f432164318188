mod common;

use anyhow::Result;
use common::{StandardUsers, deposit, shared_services, test_services};
use finapi::application::AppError;
use finapi::domain::OperationType;
use uuid::Uuid;

#[tokio::test]
async fn test_deposit_withdraw_walkthrough() -> Result<()> {
    let (services, _temp) = test_services().await?;
    let user = StandardUsers::marcelo(&services).await?;

    assert_eq!(services.ledger.get_balance(user.id).await?.balance, 0);

    deposit(&services, &user, 20000).await?;
    assert_eq!(services.ledger.get_balance(user.id).await?.balance, 20000);

    // Withdrawing more than the balance is rejected and changes nothing
    let rejected = services
        .ledger
        .create_statement(user.id, OperationType::Withdraw, 50000, "too much")
        .await;
    assert!(matches!(rejected, Err(AppError::InsufficientFunds { .. })));

    let view = services.ledger.get_balance(user.id).await?;
    assert_eq!(view.balance, 20000);
    assert_eq!(view.statements.len(), 1);

    services
        .ledger
        .create_statement(user.id, OperationType::Withdraw, 12000, "groceries")
        .await?;

    let view = services.ledger.get_balance(user.id).await?;
    assert_eq!(view.balance, 8000);
    assert_eq!(view.statements.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_balance_lists_statements_in_insertion_order() -> Result<()> {
    let (services, _temp) = test_services().await?;
    let user = StandardUsers::marcelo(&services).await?;

    let mut expected = Vec::new();
    expected.push(deposit(&services, &user, 1000).await?);
    expected.push(
        services
            .ledger
            .create_statement(user.id, OperationType::Withdraw, 300, "first")
            .await?,
    );
    expected.push(deposit(&services, &user, 50).await?);
    expected.push(
        services
            .ledger
            .create_statement(user.id, OperationType::Withdraw, 700, "second")
            .await?,
    );

    let view = services.ledger.get_balance(user.id).await?;
    assert_eq!(view.statements, expected);
    assert_eq!(view.balance, 1000 - 300 + 50 - 700);

    Ok(())
}

#[tokio::test]
async fn test_statement_lookup_matches_created() -> Result<()> {
    let (services, _temp) = test_services().await?;
    let user = StandardUsers::marcelo(&services).await?;

    let created = services
        .ledger
        .create_statement(user.id, OperationType::Deposit, 20000, "Statement test")
        .await?;
    let fetched = services
        .ledger
        .get_statement_operation(user.id, created.id)
        .await?;

    assert_eq!(fetched, created);
    Ok(())
}

#[tokio::test]
async fn test_statement_lookup_is_scoped_to_owner() -> Result<()> {
    let (services, _temp) = test_services().await?;
    let marcelo = StandardUsers::marcelo(&services).await?;
    let admin = StandardUsers::admin(&services).await?;

    let admins = deposit(&services, &admin, 5000).await?;

    let result = services
        .ledger
        .get_statement_operation(marcelo.id, admins.id)
        .await;
    assert!(matches!(result, Err(AppError::StatementNotFound(_))));

    let missing = services
        .ledger
        .get_statement_operation(marcelo.id, Uuid::new_v4())
        .await;
    assert!(matches!(missing, Err(AppError::StatementNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_deleted_user_operations_fail_with_user_not_found() -> Result<()> {
    let (services, _temp) = test_services().await?;
    let user = StandardUsers::marcelo(&services).await?;
    let statement = deposit(&services, &user, 1000).await?;
    let session = services
        .auth
        .authenticate(&user.email, StandardUsers::PASSWORD)
        .await?;

    services.profile.delete(&user.email).await?;

    // Token still validates...
    assert_eq!(services.auth.validate(&session.token)?, user.id);

    // ...but every operation reports the user as gone
    assert!(matches!(
        services.profile.show(user.id).await,
        Err(AppError::UserNotFound(_))
    ));
    assert!(matches!(
        services.ledger.get_balance(user.id).await,
        Err(AppError::UserNotFound(_))
    ));
    assert!(matches!(
        services
            .ledger
            .create_statement(user.id, OperationType::Deposit, 100, "")
            .await,
        Err(AppError::UserNotFound(_))
    ));
    assert!(matches!(
        services
            .ledger
            .get_statement_operation(user.id, statement.id)
            .await,
        Err(AppError::UserNotFound(_))
    ));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_keep_balance_non_negative() -> Result<()> {
    let (services, _temp) = shared_services().await?;
    let user = StandardUsers::marcelo(&services).await?;
    deposit(&services, &user, 500).await?;

    let mut handles = Vec::new();
    for i in 0..10 {
        let services = services.clone();
        let user_id = user.id;
        handles.push(tokio::spawn(async move {
            services
                .ledger
                .create_statement(user_id, OperationType::Withdraw, 100, &format!("w{}", i))
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => accepted += 1,
            Err(AppError::InsufficientFunds { .. }) => {}
            Err(other) => return Err(other.into()),
        }
    }

    assert_eq!(accepted, 5);
    assert_eq!(services.ledger.get_balance(user.id).await?.balance, 0);
    Ok(())
}
