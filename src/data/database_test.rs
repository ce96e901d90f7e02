//! Database tests

use super::*;
use crate::error::AppError;
use chrono::Utc;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn test_user(id: &str, category: ProfileCategory) -> User {
    User {
        id: id.to_string(),
        firstname: format!("First {id}"),
        lastname: format!("Last {id}"),
        email: format!("{id}@example.com"),
        avatar: None,
        status: "active".to_string(),
        profile_category: category,
        role: "user".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn seed_users(db: &Database, ids: &[&str]) {
    for id in ids {
        db.insert_user(&test_user(id, ProfileCategory::Public))
            .await
            .unwrap();
    }
}

fn always_pending(_: Option<&Follow>) -> ThreadRequestStatus {
    ThreadRequestStatus::Pending
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_user_insert_and_get() {
    let (db, _temp_dir) = create_test_db().await;
    db.insert_user(&test_user("u1", ProfileCategory::Private))
        .await
        .unwrap();

    let user = db.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.email, "u1@example.com");
    assert_eq!(user.profile_category, ProfileCategory::Private);
    assert!(db.get_user("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_follow_operations() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2"]).await;

    let (follow, created) = db
        .insert_follow("u1", "u2", FollowStatus::Pending)
        .await
        .unwrap();
    assert!(created);
    assert_eq!(follow.status, FollowStatus::Pending);

    // Second insert keeps the existing edge
    let (follow, created) = db
        .insert_follow("u1", "u2", FollowStatus::Approved)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(follow.status, FollowStatus::Pending);

    assert!(db.approve_follow("u1", "u2").await.unwrap());
    assert!(!db.approve_follow("u1", "u2").await.unwrap());
    let follow = db.get_follow("u1", "u2").await.unwrap().unwrap();
    assert_eq!(follow.status, FollowStatus::Approved);

    assert_eq!(db.count_followers("u2").await.unwrap(), 1);
    assert_eq!(db.count_followings("u1").await.unwrap(), 1);
    assert_eq!(db.count_followers("u1").await.unwrap(), 0);

    assert!(db.delete_follow("u1", "u2").await.unwrap());
    assert!(db.get_follow("u1", "u2").await.unwrap().is_none());
    assert!(!db.delete_follow("u1", "u2").await.unwrap());
}

#[tokio::test]
async fn test_self_follow_is_rejected_by_store() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1"]).await;

    assert!(
        db.insert_follow("u1", "u1", FollowStatus::Approved)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_follow_statuses_from_is_directional() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["v", "a", "b", "c"]).await;
    db.insert_follow("v", "a", FollowStatus::Pending)
        .await
        .unwrap();
    db.insert_follow("v", "b", FollowStatus::Approved)
        .await
        .unwrap();
    db.insert_follow("c", "v", FollowStatus::Approved)
        .await
        .unwrap();

    let targets = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let mut rows = db.get_follow_statuses_from("v", &targets).await.unwrap();
    rows.sort_by(|left, right| left.0.cmp(&right.0));

    assert_eq!(
        rows,
        vec![
            ("a".to_string(), FollowStatus::Pending),
            ("b".to_string(), FollowStatus::Approved),
        ]
    );
    assert!(
        db.get_follow_statuses_from("v", &[])
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_follower_and_following_listings() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2", "u3"]).await;
    db.insert_follow("u2", "u1", FollowStatus::Approved)
        .await
        .unwrap();
    db.insert_follow("u3", "u1", FollowStatus::Pending)
        .await
        .unwrap();

    let followers: Vec<String> = db
        .get_followers_of("u1")
        .await
        .unwrap()
        .into_iter()
        .map(|user| user.id)
        .collect();
    assert_eq!(followers.len(), 2);
    assert!(followers.contains(&"u2".to_string()));
    assert!(followers.contains(&"u3".to_string()));

    let followings = db.get_followings_of("u2").await.unwrap();
    assert_eq!(followings.len(), 1);
    assert_eq!(followings[0].id, "u1");

    let others = db.get_users_except("u1").await.unwrap();
    assert_eq!(others.len(), 2);
    assert!(others.iter().all(|user| user.id != "u1"));
}

#[tokio::test]
async fn test_create_thread_with_request_writes_all_rows() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2"]).await;

    let (thread, request) = db
        .create_thread_with_request("u1", "u2", always_pending)
        .await
        .unwrap();

    assert_eq!(request.thread_id, thread.id);
    let stored = db.get_thread(&thread.id).await.unwrap().unwrap();
    assert_eq!(stored.id, thread.id);
    assert_eq!(db.get_thread_members(&thread.id).await.unwrap().len(), 2);

    let by_reverse_pair = db
        .get_thread_request_for_pair("u2", "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_reverse_pair.id, request.id);
    assert_eq!(by_reverse_pair.status, ThreadRequestStatus::Pending);
}

#[tokio::test]
async fn test_decision_sees_sender_edge_only() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2"]).await;
    db.insert_follow("u2", "u1", FollowStatus::Approved)
        .await
        .unwrap();

    let (_, request) = db
        .create_thread_with_request("u1", "u2", |edge| {
            assert!(edge.is_none());
            ThreadRequestStatus::Pending
        })
        .await
        .unwrap();
    assert_eq!(request.status, ThreadRequestStatus::Pending);
}

#[tokio::test]
async fn test_second_creation_for_pair_conflicts() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2"]).await;

    db.create_thread_with_request("u1", "u2", always_pending)
        .await
        .unwrap();
    let error = db
        .create_thread_with_request("u2", "u1", always_pending)
        .await
        .unwrap_err();

    assert!(matches!(error, AppError::Conflict(_)));
    assert_eq!(db.count_rows_for_test("threads").await.unwrap(), 1);
    assert_eq!(db.count_rows_for_test("thread_users").await.unwrap(), 2);
    assert_eq!(db.count_rows_for_test("thread_requests").await.unwrap(), 1);
}

#[tokio::test]
async fn test_interrupted_creation_leaves_nothing_behind() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2"]).await;

    // Fail after the thread and memberships are written
    db.execute_for_test(
        "CREATE TRIGGER fail_thread_request BEFORE INSERT ON thread_requests \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
    )
    .await
    .unwrap();

    let error = db
        .create_thread_with_request("u1", "u2", always_pending)
        .await
        .unwrap_err();
    assert!(matches!(error, AppError::Database(_)));

    assert_eq!(db.count_rows_for_test("threads").await.unwrap(), 0);
    assert_eq!(db.count_rows_for_test("thread_users").await.unwrap(), 0);
    assert!(db.get_thread_ids_for_user("u1").await.unwrap().is_empty());

    // The connection is usable again once the failure is gone
    db.execute_for_test("DROP TRIGGER fail_thread_request")
        .await
        .unwrap();
    db.create_thread_with_request("u1", "u2", always_pending)
        .await
        .unwrap();
    assert_eq!(db.count_rows_for_test("threads").await.unwrap(), 1);
}

#[tokio::test]
async fn test_threads_by_ids() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2", "u3"]).await;

    let (t1, _) = db
        .create_thread_with_request("u1", "u2", always_pending)
        .await
        .unwrap();
    let (t2, _) = db
        .create_thread_with_request("u1", "u3", always_pending)
        .await
        .unwrap();

    let ids = db.get_thread_ids_for_user("u1").await.unwrap();
    assert_eq!(ids.len(), 2);

    let threads = db.get_threads_by_ids(&ids).await.unwrap();
    let mut fetched: Vec<String> = threads.into_iter().map(|thread| thread.id).collect();
    fetched.sort();
    let mut expected = vec![t1.id, t2.id];
    expected.sort();
    assert_eq!(fetched, expected);

    assert!(db.get_threads_by_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_creation_releases_write_lock() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2", "u3", "u4"]).await;
    let db = std::sync::Arc::new(db);

    // Abandon the call after the thread and memberships are written,
    // the same way a dropped request future would
    let abandoned = {
        let db = db.clone();
        tokio::spawn(async move {
            db.create_thread_with_request(
                "u1",
                "u2",
                |_: Option<&Follow>| -> ThreadRequestStatus { panic!("caller went away") },
            )
            .await
        })
    };
    assert!(abandoned.await.unwrap_err().is_panic());

    // Other writers are not blocked and no partial thread is visible
    let started = std::time::Instant::now();
    let (thread, _) = db
        .create_thread_with_request("u3", "u4", always_pending)
        .await
        .unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(2));

    assert_eq!(db.count_rows_for_test("threads").await.unwrap(), 1);
    assert_eq!(db.count_rows_for_test("thread_users").await.unwrap(), 2);
    assert!(db.get_thread_ids_for_user("u1").await.unwrap().is_empty());
    assert_eq!(db.get_thread_ids_for_user("u3").await.unwrap(), vec![thread.id]);

    // The abandoned pair can still be created afterwards
    db.create_thread_with_request("u1", "u2", always_pending)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_pairs_with_separator_in_ids_stay_distinct() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a:b", "c", "a", "b:c"]).await;

    let (first, _) = db
        .create_thread_with_request("a:b", "c", always_pending)
        .await
        .unwrap();

    assert!(db
        .get_thread_request_for_pair("a", "b:c")
        .await
        .unwrap()
        .is_none());

    let (second, request) = db
        .create_thread_with_request("a", "b:c", always_pending)
        .await
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(request.sender_id, "a");

    let found = db
        .get_thread_request_for_pair("b:c", "a")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.thread_id, second.id);
}

#[tokio::test]
async fn test_bulk_reads_accept_large_id_sets() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["u1", "u2", "u3"]).await;
    db.insert_follow("u1", "u2", FollowStatus::Approved)
        .await
        .unwrap();
    db.insert_follow("u1", "u3", FollowStatus::Pending)
        .await
        .unwrap();
    let (t1, _) = db
        .create_thread_with_request("u1", "u2", always_pending)
        .await
        .unwrap();
    let (t2, _) = db
        .create_thread_with_request("u1", "u3", always_pending)
        .await
        .unwrap();

    // Well past SQLite's bound variable limit, real ids at both ends
    let mut ids: Vec<String> = vec!["u2".to_string(), t1.id.clone()];
    ids.extend((0..40_000).map(|i| format!("ghost-{i}")));
    ids.push("u3".to_string());
    ids.push(t2.id.clone());

    let mut statuses = db.get_follow_statuses_from("u1", &ids).await.unwrap();
    statuses.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        statuses,
        vec![
            ("u2".to_string(), FollowStatus::Approved),
            ("u3".to_string(), FollowStatus::Pending),
        ]
    );

    let threads = db.get_threads_by_ids(&ids).await.unwrap();
    assert_eq!(threads.len(), 2);
    assert!(threads[0].created_at >= threads[1].created_at);
}
