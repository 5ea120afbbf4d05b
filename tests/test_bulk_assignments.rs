mod helpers;

use helpers::*;
use rosterlink::application::services::bulk_assignment_service::LINE_ITEM_SLUG_ATTRIBUTE;
use rosterlink::bootstrap::build_app_state;
use rosterlink::domain::entities::{AssignmentState, BulkOperation};
use rosterlink::domain::ports::{AssignmentRepository, AssignmentUnitOfWork};
use serde_json::json;

#[tokio::test]
async fn test_bulk_cancel_with_unknown_user_rolls_back() {
    let db = setup_test_db().await;
    seed_pool(&db, 1).await;
    let user = seed_user(&db, "user1", None).await;
    let line_item = seed_line_item(&db, "1", "http://x/delivery_1.rdf", 0, "instance-01").await;
    let ready = seed_assignment(&db, &user, &line_item, AssignmentState::Ready, 0).await;
    let started = seed_assignment(&db, &user, &line_item, AssignmentState::Started, 2).await;
    let before = (
        load_assignment(&db, &ready.id).await,
        load_assignment(&db, &started.id).await,
    );

    let state = build_app_state(db.clone(), &test_config(&[])).unwrap();
    let result = state
        .bulk_assignment_service
        .cancel(&[BulkOperation::new("user1"), BulkOperation::new("doesNotExist")])
        .await
        .unwrap();

    // user1 reports true although nothing was committed.
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"applied": false, "results": {"user1": true, "doesNotExist": false}})
    );

    let after = (
        load_assignment(&db, &ready.id).await,
        load_assignment(&db, &started.id).await,
    );
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_bulk_cancel_applies() {
    let db = setup_test_db().await;
    seed_pool(&db, 1).await;
    let user1 = seed_user(&db, "user1", None).await;
    let user2 = seed_user(&db, "user2", None).await;
    let line_item = seed_line_item(&db, "1", "http://x/delivery_1.rdf", 0, "instance-01").await;
    let started = seed_assignment(&db, &user1, &line_item, AssignmentState::Started, 1).await;
    let completed = seed_assignment(&db, &user1, &line_item, AssignmentState::Completed, 1).await;
    let ready = seed_assignment(&db, &user2, &line_item, AssignmentState::Ready, 0).await;

    let state = build_app_state(db.clone(), &test_config(&[])).unwrap();
    let result = state
        .bulk_assignment_service
        .cancel(&[BulkOperation::new("user1"), BulkOperation::new("user2")])
        .await
        .unwrap();

    assert!(result.applied);
    assert_eq!(
        load_assignment(&db, &started.id).await.state,
        AssignmentState::Cancelled
    );
    assert_eq!(
        load_assignment(&db, &completed.id).await.state,
        AssignmentState::Completed
    );
    assert_eq!(
        load_assignment(&db, &ready.id).await.state,
        AssignmentState::Cancelled
    );
}

#[tokio::test]
async fn test_bulk_create() {
    let db = setup_test_db().await;
    seed_pool(&db, 1).await;
    let user1 = seed_user(&db, "user1", None).await;
    let user2 = seed_user(&db, "user2", None).await;
    let first = seed_line_item(&db, "1", "http://x/delivery_1.rdf", 0, "instance-01").await;
    let second = seed_line_item(&db, "2", "http://x/delivery_2.rdf", 0, "instance-01").await;
    seed_assignment(&db, &user2, &first, AssignmentState::Cancelled, 1).await;

    let state = build_app_state(db.clone(), &test_config(&[])).unwrap();
    let result = state
        .bulk_assignment_service
        .create(&[
            BulkOperation::new("user1")
                .with_attribute(LINE_ITEM_SLUG_ATTRIBUTE, second.slug.clone()),
            BulkOperation::new("user2"),
        ])
        .await
        .unwrap();

    assert!(result.applied);
    assert_eq!(result.get("user1"), Some(true));
    assert_eq!(result.get("user2"), Some(true));

    let mut unit_of_work = db.begin().await.unwrap();
    let user1_assignments = unit_of_work.find_user_assignments(&user1.id).await.unwrap();
    let user2_assignments = unit_of_work.find_user_assignments(&user2.id).await.unwrap();
    unit_of_work.rollback().await.unwrap();

    assert_eq!(user1_assignments.len(), 1);
    assert_eq!(user1_assignments[0].line_item_id, second.id);
    assert_eq!(user1_assignments[0].state, AssignmentState::Ready);

    assert_eq!(user2_assignments.len(), 2);
    let created = &user2_assignments[1];
    assert_eq!(created.line_item_id, first.id);
    assert_eq!(created.state, AssignmentState::Ready);
    assert_eq!(created.attempts_count, 0);
}

#[tokio::test]
async fn test_bulk_create_without_line_item_fails_item() {
    let db = setup_test_db().await;
    seed_pool(&db, 1).await;
    let user1 = seed_user(&db, "user1", None).await;
    let line_item = seed_line_item(&db, "1", "http://x/delivery_1.rdf", 0, "instance-01").await;
    seed_user(&db, "newcomer", None).await;

    let state = build_app_state(db.clone(), &test_config(&[])).unwrap();
    let result = state
        .bulk_assignment_service
        .create(&[
            BulkOperation::new("user1")
                .with_attribute(LINE_ITEM_SLUG_ATTRIBUTE, line_item.slug.clone()),
            BulkOperation::new("newcomer"),
        ])
        .await
        .unwrap();

    assert!(!result.applied);
    assert_eq!(result.get("user1"), Some(true));
    assert_eq!(result.get("newcomer"), Some(false));

    let mut unit_of_work = db.begin().await.unwrap();
    assert!(unit_of_work
        .find_user_assignments(&user1.id)
        .await
        .unwrap()
        .is_empty());
    unit_of_work.rollback().await.unwrap();
}

#[tokio::test]
async fn test_bulk_create_repeated_user_keeps_failure() {
    let db = setup_test_db().await;
    seed_pool(&db, 1).await;
    let user1 = seed_user(&db, "user1", None).await;
    let line_item = seed_line_item(&db, "2", "http://x/delivery_2.rdf", 0, "instance-01").await;

    let state = build_app_state(db.clone(), &test_config(&[])).unwrap();
    let result = state
        .bulk_assignment_service
        .create(&[
            BulkOperation::new("user1").with_attribute(LINE_ITEM_SLUG_ATTRIBUTE, "nope"),
            BulkOperation::new("user1")
                .with_attribute(LINE_ITEM_SLUG_ATTRIBUTE, line_item.slug.clone()),
        ])
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"applied": false, "results": {"user1": false}})
    );

    let mut unit_of_work = db.begin().await.unwrap();
    assert!(unit_of_work
        .find_user_assignments(&user1.id)
        .await
        .unwrap()
        .is_empty());
    unit_of_work.rollback().await.unwrap();
}
