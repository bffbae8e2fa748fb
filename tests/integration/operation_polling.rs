//! Detached creation and direct operation calls.

use crate::mock_server::{already_exists, operation_id, operation_json, MockServerFixture, OPERATION_ID};
use mockito::Matcher;
use rust_decimal::Decimal;
use serde_json::json;
use std::time::Duration;
use user_bonus_client::{
    Error, Operation, OperationStatus, UserBonus, UserBonusSearchRequest,
    UserBonusesCreateRequestParameters,
};

fn bonuses() -> Vec<UserBonus> {
    vec![
        UserBonus::new("user-1", Decimal::new(150, 2)),
        UserBonus::new("user-2", Decimal::new(275, 2)),
    ]
}

#[tokio::test]
async fn test_async_creation_returns_operation_without_waiting() {
    let fixture = MockServerFixture::new().await;
    let create = fixture
        .mock_create(
            vec![("operation_id", OPERATION_ID), ("async_mode", "true")],
            Matcher::Json(json!([
                {"user_id": "user-1", "amount": "1.50"},
                {"user_id": "user-2", "amount": "2.75"},
            ])),
            202,
            &operation_json("PENDING"),
            1,
        )
        .await;
    let poll = fixture
        .mock_never("GET", &format!("/operations/{}", OPERATION_ID))
        .await;

    let operation = fixture
        .client()
        .create_user_bonuses_async(
            &bonuses(),
            UserBonusesCreateRequestParameters::new()
                .with_operation_id(operation_id())
                .with_async_mode(false),
        )
        .await
        .unwrap();

    assert_eq!(operation.id, OPERATION_ID);
    assert_eq!(operation.status, OperationStatus::Pending);
    assert_eq!(operation.operation_type.as_deref(), Some("USER_BONUS.BATCH_CREATE"));
    create.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn test_async_creation_resumes_with_one_fetch() {
    let fixture = MockServerFixture::new().await;
    let conflict = fixture
        .mock_create(
            vec![("operation_id", OPERATION_ID), ("async_mode", "true")],
            Matcher::Any,
            409,
            &already_exists(),
            1,
        )
        .await;
    let fetch = fixture
        .mock_get(
            &format!("/operations/{}", OPERATION_ID),
            "create_user_bonuses_async",
            "get_operation",
            &operation_json("RUNNING"),
            1,
        )
        .await;

    let operation = fixture
        .client()
        .create_user_bonuses_async(
            &bonuses(),
            UserBonusesCreateRequestParameters::new().with_operation_id(operation_id()),
        )
        .await
        .unwrap();

    assert_eq!(operation.status, OperationStatus::Running);
    conflict.assert_async().await;
    fetch.assert_async().await;
}

#[tokio::test]
async fn test_wait_operation_polls_until_terminal() {
    let fixture = MockServerFixture::new().await;
    let path = format!("/operations/{}", OPERATION_ID);
    let running = fixture
        .mock_get(&path, "wait_operation", "get_operation", &operation_json("RUNNING"), 2)
        .await;
    let success = fixture
        .mock_get(&path, "wait_operation", "get_operation", &operation_json("SUCCESS"), 1)
        .await;

    let pending = Operation::with_status(OPERATION_ID, OperationStatus::Pending);
    let finished = fixture.client().wait_operation(&pending).await.unwrap();

    assert_eq!(finished.status, OperationStatus::Success);
    assert!(finished.submitted.is_some());
    running.assert_async().await;
    success.assert_async().await;
}

#[tokio::test]
async fn test_wait_operation_deadline_is_a_timeout() {
    let fixture = MockServerFixture::new().await;
    let _running = fixture
        .mock_get(
            &format!("/operations/{}", OPERATION_ID),
            "wait_operation",
            "get_operation",
            &operation_json("RUNNING"),
            1,
        )
        .await;

    let client = fixture.client_with(
        MockServerFixture::fast_polling()
            .with_initial_interval(Duration::from_millis(20))
            .with_timeout(Duration::from_millis(100)),
    );
    let err = client
        .wait_operation(&Operation::with_status(OPERATION_ID, OperationStatus::Running))
        .await
        .unwrap_err();

    match err {
        Error::OperationTimeout {
            operation_id,
            last_status,
            ..
        } => {
            assert_eq!(operation_id, OPERATION_ID);
            assert_eq!(last_status, OperationStatus::Running);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_operation_log_and_search_calls() {
    let fixture = MockServerFixture::new().await;
    let log = fixture
        .mock_get(
            &format!("/operations/{}/log", OPERATION_ID),
            "get_operation_log",
            "get_operation_log",
            &json!([
                {"type": "USER_BONUS_PERSIST", "success": true, "input": {"__item_idx": "1"}, "output": {"user_bonus_id": "user-bonus-2"}},
                {"type": "USER_BONUS_VALIDATE", "success": false, "input": {"__item_idx": "0"}, "output": {"amount": {"code": "VALUE_LESS_THAN_MIN"}}},
            ]),
            1,
        )
        .await;
    let search = fixture
        .mock_search(
            vec![("user_id", "user-1"), ("limit", "10")],
            &json!({
                "items": [{"id": "user-bonus-2", "user_id": "user-1", "amount": "2.75"}],
                "has_more": true,
            }),
        )
        .await;

    let client = fixture.client();
    let entries = client.get_operation_log(OPERATION_ID).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].item_index(), Some(1));
    assert_eq!(entries[0].user_bonus_id(), Some("user-bonus-2"));
    assert!(!entries[1].success);

    let page = client
        .find_user_bonuses(&UserBonusSearchRequest {
            user_id: Some("user-1".to_string()),
            limit: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(page.has_more);
    assert_eq!(page.items[0].amount, Decimal::new(275, 2));

    log.assert_async().await;
    search.assert_async().await;
}
