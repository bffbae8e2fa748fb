//! Creating bonuses through the sync and sync-over-async paths.

use crate::mock_server::{already_exists, operation_id, operation_json, MockServerFixture, OPERATION_ID};
use mockito::Matcher;
use rust_decimal::Decimal;
use serde_json::json;
use user_bonus_client::{
    Error, UserBonus, UserBonusCreateRequestParameters, UserBonusesCreateRequestParameters,
};

fn bonus(user_id: &str) -> UserBonus {
    UserBonus::new(user_id, Decimal::new(150, 2))
        .with_private_comment("pool_23214")
        .with_public_title("EN", "Good Job!")
}

fn persisted(id: &str, user_id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": user_id,
        "amount": "1.50",
        "private_comment": "pool_23214",
        "public_title": {"EN": "Good Job!"},
        "created": "2020-12-13T23:32:01",
    })
}

#[tokio::test]
async fn test_single_sync_returns_bonus_without_polling() {
    let fixture = MockServerFixture::new().await;
    let create = fixture
        .mock_create(
            vec![("operation_id", OPERATION_ID), ("async_mode", "false")],
            Matcher::Json(json!({
                "user_id": "user-1",
                "amount": "1.50",
                "private_comment": "pool_23214",
                "public_title": {"EN": "Good Job!"},
            })),
            201,
            &persisted("user-bonus-1", "user-1"),
            1,
        )
        .await;
    let operations = fixture
        .mock_never("GET", &format!("/operations/{}", OPERATION_ID))
        .await;

    let created = fixture
        .client()
        .create_user_bonus(
            &bonus("user-1"),
            UserBonusCreateRequestParameters::new()
                .with_operation_id(operation_id())
                .with_async_mode(false),
        )
        .await
        .unwrap();

    assert_eq!(created.id.as_deref(), Some("user-bonus-1"));
    assert_eq!(created.amount, Decimal::new(150, 2));
    assert!(created.created.is_some());
    create.assert_async().await;
    operations.assert_async().await;
}

#[tokio::test]
async fn test_without_message_flag_is_sent() {
    let fixture = MockServerFixture::new().await;
    let create = fixture
        .mock_create(
            vec![("async_mode", "false")],
            Matcher::Json(json!({
                "user_id": "user-1",
                "amount": "1.50",
                "without_message": true,
                "assignment_id": "assignment-1",
            })),
            201,
            &json!({
                "id": "user-bonus-1",
                "user_id": "user-1",
                "amount": "1.50",
                "without_message": true,
                "assignment_id": "assignment-1",
            }),
            1,
        )
        .await;

    let request = UserBonus::new("user-1", Decimal::new(150, 2))
        .without_message()
        .with_assignment_id("assignment-1");
    let created = fixture
        .client()
        .create_user_bonus(
            &request,
            UserBonusCreateRequestParameters::new().with_async_mode(false),
        )
        .await
        .unwrap();

    assert_eq!(created.without_message, Some(true));
    assert!(created.public_title.is_none());
    create.assert_async().await;
}

#[tokio::test]
async fn test_batch_sync_reports_rejected_items_inline() {
    let fixture = MockServerFixture::new().await;
    let create = fixture
        .mock_create(
            vec![
                ("operation_id", OPERATION_ID),
                ("async_mode", "false"),
                ("skip_invalid_items", "true"),
            ],
            Matcher::Json(json!([
                {"user_id": "user-1", "amount": "1.50", "private_comment": "pool_23214", "public_title": {"EN": "Good Job!"}},
                {"user_id": "user-2", "amount": "0.00"},
            ])),
            201,
            &json!({
                "items": {"0": persisted("user-bonus-1", "user-1")},
                "validation_errors": {
                    "1": {"amount": {"code": "VALUE_LESS_THAN_MIN", "message": "Value must be greater than or equal to 0.01"}}
                },
            }),
            1,
        )
        .await;

    let result = fixture
        .client()
        .create_user_bonuses(
            &[bonus("user-1"), UserBonus::new("user-2", Decimal::new(0, 2))],
            UserBonusesCreateRequestParameters::new()
                .with_operation_id(operation_id())
                .with_async_mode(false)
                .with_skip_invalid_items(true),
        )
        .await
        .unwrap();

    assert!(result.covers(2));
    assert_eq!(result.item(0).unwrap().id.as_deref(), Some("user-bonus-1"));
    assert_eq!(
        result.validation_error(1).unwrap()["amount"]["code"],
        "VALUE_LESS_THAN_MIN"
    );
    create.assert_async().await;
}

#[tokio::test]
async fn test_single_resolved_through_operation() {
    let fixture = MockServerFixture::new().await;
    let top = "create_user_bonus";
    let create = fixture
        .mock_create(
            vec![("operation_id", OPERATION_ID), ("async_mode", "true")],
            Matcher::PartialJson(json!({"user_id": "user-1", "__item_idx": "0"})),
            202,
            &operation_json("PENDING"),
            1,
        )
        .await;
    let op_path = format!("/operations/{}", OPERATION_ID);
    let running = fixture
        .mock_get(&op_path, top, "get_operation", &operation_json("RUNNING"), 1)
        .await;
    let success = fixture
        .mock_get(&op_path, top, "get_operation", &operation_json("SUCCESS"), 1)
        .await;
    let log = fixture
        .mock_get(
            &format!("{}/log", op_path),
            top,
            "get_operation_log",
            &json!([{
                "type": "USER_BONUS_PERSIST",
                "success": true,
                "input": {"__item_idx": "0", "user_id": "user-1", "amount": "1.50"},
                "output": {"user_bonus_id": "user-bonus-1"},
                "created": "2020-12-13T23:33:00",
            }]),
            1,
        )
        .await;
    let fetch = fixture
        .mock_get(
            "/user-bonuses/user-bonus-1",
            top,
            "get_user_bonus",
            &persisted("user-bonus-1", "user-1"),
            1,
        )
        .await;

    let created = fixture
        .client()
        .create_user_bonus(
            &bonus("user-1"),
            UserBonusCreateRequestParameters::new().with_operation_id(operation_id()),
        )
        .await
        .unwrap();

    assert_eq!(created.id.as_deref(), Some("user-bonus-1"));
    for mock in [create, running, success, log, fetch] {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_batch_resolved_through_operation_by_item_index() {
    let fixture = MockServerFixture::new().await;
    let top = "create_user_bonuses";
    let create = fixture
        .mock_create(
            vec![("operation_id", OPERATION_ID), ("async_mode", "true")],
            Matcher::Json(json!([
                {"user_id": "user-1", "amount": "1.50", "private_comment": "pool_23214", "public_title": {"EN": "Good Job!"}, "__item_idx": "0"},
                {"user_id": "user-2", "amount": "0.00", "__item_idx": "1"},
                {"user_id": "user-3", "amount": "1.50", "private_comment": "pool_23214", "public_title": {"EN": "Good Job!"}, "__item_idx": "2"},
            ])),
            202,
            &operation_json("RUNNING"),
            1,
        )
        .await;
    let op_path = format!("/operations/{}", OPERATION_ID);
    let success = fixture
        .mock_get(&op_path, top, "get_operation", &operation_json("SUCCESS"), 1)
        .await;
    let log = fixture
        .mock_get(
            &format!("{}/log", op_path),
            top,
            "get_operation_log",
            &json!([
                {
                    "type": "USER_BONUS_PERSIST",
                    "success": true,
                    "input": {"__item_idx": "2", "user_id": "user-3"},
                    "output": {"user_bonus_id": "user-bonus-3"},
                },
                {
                    "type": "USER_BONUS_VALIDATE",
                    "success": false,
                    "input": {"__item_idx": "1", "user_id": "user-2"},
                    "output": {"amount": {"code": "VALUE_LESS_THAN_MIN"}},
                },
                {
                    "type": "USER_BONUS_PERSIST",
                    "success": true,
                    "input": {"__item_idx": "0", "user_id": "user-1"},
                    "output": {"user_bonus_id": "user-bonus-1"},
                },
            ]),
            1,
        )
        .await;
    let search = fixture
        .mock_search(
            vec![
                ("id_gte", "user-bonus-1"),
                ("id_lte", "user-bonus-3"),
                ("sort", "id"),
                ("limit", "300"),
            ],
            &json!({
                "items": [
                    persisted("user-bonus-1", "user-1"),
                    persisted("user-bonus-3", "user-3"),
                ],
                "has_more": false,
            }),
        )
        .await;

    let result = fixture
        .client()
        .create_user_bonuses(
            &[
                bonus("user-1"),
                UserBonus::new("user-2", Decimal::new(0, 2)),
                bonus("user-3"),
            ],
            UserBonusesCreateRequestParameters::new().with_operation_id(operation_id()),
        )
        .await
        .unwrap();

    assert!(result.covers(3));
    assert_eq!(result.item(0).unwrap().user_id, "user-1");
    assert_eq!(result.item(2).unwrap().user_id, "user-3");
    assert!(result.item(1).is_none());
    assert_eq!(
        result.validation_error(1).unwrap()["amount"]["code"],
        "VALUE_LESS_THAN_MIN"
    );
    for mock in [create, success, log, search] {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_retry_after_server_error_resumes_existing_operation() {
    let fixture = MockServerFixture::new().await;
    let query = vec![("operation_id", OPERATION_ID), ("async_mode", "true")];
    let body = || Matcher::PartialJson(json!({"__item_idx": "0"}));

    let server_error = fixture
        .mock_create(
            query.clone(),
            body(),
            500,
            &json!({"code": "INTERNAL_ERROR", "message": "Internal error"}),
            1,
        )
        .await;
    let conflict = fixture
        .mock_create(query, body(), 409, &already_exists(), 1)
        .await;
    let op_path = format!("/operations/{}", OPERATION_ID);
    let success = fixture
        .mock_get(&op_path, "create_user_bonus", "get_operation", &operation_json("SUCCESS"), 1)
        .await;
    let log = fixture
        .mock_get(
            &format!("{}/log", op_path),
            "create_user_bonus",
            "get_operation_log",
            &json!([{
                "type": "USER_BONUS_PERSIST",
                "success": true,
                "input": {"__item_idx": "0"},
                "output": {"user_bonus_id": "user-bonus-1"},
            }]),
            1,
        )
        .await;
    let fetch = fixture
        .mock_get(
            "/user-bonuses/user-bonus-1",
            "create_user_bonus",
            "get_user_bonus",
            &persisted("user-bonus-1", "user-1"),
            1,
        )
        .await;

    let created = fixture
        .client()
        .create_user_bonus(
            &bonus("user-1"),
            UserBonusCreateRequestParameters::new().with_operation_id(operation_id()),
        )
        .await
        .unwrap();

    assert_eq!(created.id.as_deref(), Some("user-bonus-1"));
    for mock in [server_error, conflict, success, log, fetch] {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_resumed_operation_that_failed_is_raised() {
    let fixture = MockServerFixture::new().await;
    let conflict = fixture
        .mock_create(
            vec![("operation_id", OPERATION_ID)],
            Matcher::Any,
            409,
            &already_exists(),
            1,
        )
        .await;
    let op_path = format!("/operations/{}", OPERATION_ID);
    let mut failed = operation_json("FAIL");
    failed["details"] = json!({"total_count": 2, "failed_count": 2});
    let fail = fixture
        .mock_get(&op_path, "create_user_bonuses", "get_operation", &failed, 1)
        .await;
    let log = fixture.mock_never("GET", &format!("{}/log", op_path)).await;

    let err = fixture
        .client()
        .create_user_bonuses(
            &[bonus("user-1"), bonus("user-2")],
            UserBonusesCreateRequestParameters::new().with_operation_id(operation_id()),
        )
        .await
        .unwrap_err();

    let operation = err.failed_operation().expect("failed operation");
    assert_eq!(operation.id, OPERATION_ID);
    assert_eq!(
        operation.details.as_ref().and_then(|d| d.failed_count),
        Some(2)
    );
    for mock in [conflict, fail, log] {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_validation_error_response_is_not_retried() {
    let fixture = MockServerFixture::new().await;
    let create = fixture
        .mock_create(
            vec![("async_mode", "false")],
            Matcher::Any,
            400,
            &json!({
                "code": "VALIDATION_ERROR",
                "message": "Validation error",
                "payload": {"amount": {"code": "VALUE_LESS_THAN_MIN"}},
            }),
            1,
        )
        .await;

    let err = fixture
        .client()
        .create_user_bonus(
            &UserBonus::new("user-1", Decimal::ZERO),
            UserBonusCreateRequestParameters::new().with_async_mode(false),
        )
        .await
        .unwrap_err();

    match err {
        Error::Remote {
            status, payload, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(payload.unwrap()["amount"]["code"], "VALUE_LESS_THAN_MIN");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
    create.assert_async().await;
}

#[tokio::test]
async fn test_negative_amount_is_reported_by_index() {
    let fixture = MockServerFixture::new().await;
    let create = fixture
        .mock_create(
            vec![("async_mode", "false"), ("skip_invalid_items", "true")],
            Matcher::Json(json!([
                {"user_id": "user-1", "amount": "1.50"},
                {"user_id": "user-2", "amount": "-5"},
            ])),
            201,
            &json!({
                "items": {"0": {"id": "user-bonus-1", "user_id": "user-1", "amount": "1.50"}},
                "validation_errors": {
                    "1": {"amount": {"code": "VALUE_LESS_THAN_MIN", "message": "Value must be greater than or equal to 0.01"}}
                },
            }),
            1,
        )
        .await;

    let result = fixture
        .client()
        .create_user_bonuses(
            &[
                UserBonus::new("user-1", Decimal::new(150, 2)),
                UserBonus::new("user-2", Decimal::new(-5, 0)),
            ],
            UserBonusesCreateRequestParameters::new()
                .with_async_mode(false)
                .with_skip_invalid_items(true),
        )
        .await
        .unwrap();

    assert!(result.covers(2));
    assert_eq!(result.item(0).unwrap().amount, Decimal::new(150, 2));
    assert!(result.item(1).is_none());
    assert!(result.validation_error(0).is_none());
    assert_eq!(
        result.validation_error(1).unwrap()["amount"]["code"],
        "VALUE_LESS_THAN_MIN"
    );
    create.assert_async().await;
}

#[tokio::test]
async fn test_sync_batch_answered_with_operation_matches_log_by_input() {
    let fixture = MockServerFixture::new().await;
    let top = "create_user_bonuses";
    let create = fixture
        .mock_create(
            vec![("operation_id", OPERATION_ID), ("async_mode", "false")],
            Matcher::Json(json!([
                {"user_id": "user-1", "amount": "1.50"},
                {"user_id": "user-2", "amount": "2"},
            ])),
            202,
            &operation_json("RUNNING"),
            1,
        )
        .await;
    let op_path = format!("/operations/{}", OPERATION_ID);
    let running = fixture
        .mock_get(&op_path, top, "get_operation", &operation_json("RUNNING"), 1)
        .await;
    let success = fixture
        .mock_get(&op_path, top, "get_operation", &operation_json("SUCCESS"), 1)
        .await;
    let log = fixture
        .mock_get(
            &format!("{}/log", op_path),
            top,
            "get_operation_log",
            &json!([
                {
                    "type": "USER_BONUS_PERSIST",
                    "success": true,
                    "input": {"user_id": "user-2", "amount": "2.00"},
                    "output": {"user_bonus_id": "user-bonus-2"},
                },
                {
                    "type": "USER_BONUS_PERSIST",
                    "success": true,
                    "input": {"user_id": "user-1", "amount": "1.50"},
                    "output": {"user_bonus_id": "user-bonus-1"},
                },
            ]),
            1,
        )
        .await;
    let search = fixture
        .mock_search(
            vec![
                ("id_gte", "user-bonus-1"),
                ("id_lte", "user-bonus-2"),
                ("sort", "id"),
            ],
            &json!({
                "items": [
                    {"id": "user-bonus-1", "user_id": "user-1", "amount": "1.50"},
                    {"id": "user-bonus-2", "user_id": "user-2", "amount": "2.00"},
                ],
                "has_more": false,
            }),
        )
        .await;

    let result = fixture
        .client()
        .create_user_bonuses(
            &[
                UserBonus::new("user-1", Decimal::new(150, 2)),
                UserBonus::new("user-2", Decimal::new(2, 0)),
            ],
            UserBonusesCreateRequestParameters::new()
                .with_operation_id(operation_id())
                .with_async_mode(false),
        )
        .await
        .unwrap();

    assert!(result.covers(2));
    assert_eq!(result.item(0).unwrap().id.as_deref(), Some("user-bonus-1"));
    assert_eq!(result.item(1).unwrap().id.as_deref(), Some("user-bonus-2"));
    for mock in [create, running, success, log, search] {
        mock.assert_async().await;
    }
}
