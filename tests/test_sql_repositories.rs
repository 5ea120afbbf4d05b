mod helpers;

use chrono::{Duration, TimeZone, Utc};
use helpers::*;
use rosterlink::domain::entities::{AssignmentState, LineItem};
use rosterlink::domain::ports::{AssignmentRepository, AssignmentUnitOfWork};
use rosterlink::domain::services::assignment_lifecycle::{complete, record_attempt};

#[tokio::test]
async fn test_line_item_without_activity_window_loads() {
    let db = setup_test_db().await;
    let line_item = seed_line_item(&db, "1", "http://x/delivery_1.rdf", 0, "instance-01").await;

    let loaded = db.find_line_item("1").await.unwrap().unwrap();

    assert_eq!(loaded, line_item);
    assert_eq!(loaded.start_at, None);
    assert_eq!(loaded.end_at, None);
}

#[tokio::test]
async fn test_line_item_with_activity_window_loads() {
    let db = setup_test_db().await;
    let start_at = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
    let line_item = LineItem {
        id: "windowed".to_string(),
        uri: "http://x/windowed.rdf".to_string(),
        slug: "windowed".to_string(),
        label: "Windowed".to_string(),
        max_attempts: 2,
        start_at: Some(start_at),
        end_at: Some(start_at + Duration::hours(2)),
        lti_instance_id: "instance-01".to_string(),
    };
    db.insert_line_item(&line_item).await.unwrap();

    let loaded = db.find_line_item("windowed").await.unwrap().unwrap();
    assert_eq!(loaded, line_item);

    let mut unit_of_work = db.begin().await.unwrap();
    let by_slug = unit_of_work.find_line_item_by_slug("windowed").await.unwrap();
    unit_of_work.rollback().await.unwrap();
    assert_eq!(by_slug, Some(line_item));
}

#[tokio::test]
async fn test_users_with_and_without_group_load() {
    let db = setup_test_db().await;
    let loner = seed_user(&db, "loner", None).await;
    let grouped = seed_user(&db, "grouped", Some("cohort_a")).await;

    assert_eq!(db.find_user(&loner.id).await.unwrap(), Some(loner.clone()));
    assert_eq!(db.find_user(&grouped.id).await.unwrap(), Some(grouped));

    let mut unit_of_work = db.begin().await.unwrap();
    let by_username = unit_of_work.find_user_by_username("loner").await.unwrap();
    unit_of_work.rollback().await.unwrap();
    assert_eq!(by_username.unwrap().group_id, None);
}

#[tokio::test]
async fn test_compare_and_save_rejects_stale_write() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "user1", None).await;
    let line_item = seed_line_item(&db, "1", "http://x/delivery_1.rdf", 0, "instance-01").await;
    let loaded = seed_assignment(&db, &user, &line_item, AssignmentState::Started, 1).await;

    // Someone completes the assignment after it was read.
    let mut completed = loaded.clone();
    assert!(complete(&mut completed));
    assert!(db.compare_and_save(&loaded, &completed).await.unwrap());

    let mut launched = loaded.clone();
    record_attempt(&mut launched).unwrap();
    assert!(!db.compare_and_save(&loaded, &launched).await.unwrap());

    let stored = load_assignment(&db, &loaded.id).await;
    assert_eq!(stored.state, AssignmentState::Completed);
    assert_eq!(stored.attempts_count, 1);
}

#[tokio::test]
async fn test_compare_and_save_rejects_lost_attempt() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "user1", None).await;
    let line_item = seed_line_item(&db, "1", "http://x/delivery_1.rdf", 2, "instance-01").await;
    let loaded = seed_assignment(&db, &user, &line_item, AssignmentState::Ready, 0).await;

    // Two launches read the same row; only the first write may land.
    let mut first = loaded.clone();
    record_attempt(&mut first).unwrap();
    let mut second = loaded.clone();
    record_attempt(&mut second).unwrap();

    assert!(db.compare_and_save(&loaded, &first).await.unwrap());
    assert!(!db.compare_and_save(&loaded, &second).await.unwrap());
    assert_eq!(load_assignment(&db, &loaded.id).await.attempts_count, 1);
}
