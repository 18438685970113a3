// SPDX-License-Identifier: MIT

//! User record store semantics: upsert-by-subject, email refresh rules.

use profile_portal::db::Database;
use profile_portal::models::ProfileChanges;

async fn test_db() -> Database {
    let db = Database::in_memory().await.expect("in-memory database");
    db.init_schema().await.expect("schema");
    db
}

#[tokio::test]
async fn test_upsert_login_creates_row_for_new_subject() {
    let db = test_db().await;

    let user = db
        .upsert_login("abc123", Some("a@example.com"))
        .await
        .unwrap();

    assert_eq!(user.subject, "abc123");
    assert_eq!(user.email.as_deref(), Some("a@example.com"));
    assert!(user.first_name.is_none());
    assert!(user.last_name.is_none());
    assert!(user.age.is_none());
    assert_eq!(user.created_at, user.updated_at);
}

#[tokio::test]
async fn test_upsert_login_reuses_row_and_refreshes_email() {
    let db = test_db().await;

    let created = db
        .upsert_login("abc123", Some("a@example.com"))
        .await
        .unwrap();
    let updated = db
        .upsert_login("abc123", Some("b@example.com"))
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.email.as_deref(), Some("b@example.com"));
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn test_upsert_login_keeps_email_when_new_value_empty_or_absent() {
    let db = test_db().await;

    db.upsert_login("abc123", Some("a@example.com"))
        .await
        .unwrap();

    let after_empty = db.upsert_login("abc123", Some("")).await.unwrap();
    assert_eq!(after_empty.email.as_deref(), Some("a@example.com"));

    let after_absent = db.upsert_login("abc123", None).await.unwrap();
    assert_eq!(after_absent.email.as_deref(), Some("a@example.com"));
}

#[tokio::test]
async fn test_upsert_login_keys_by_subject_not_email() {
    let db = test_db().await;

    let first = db
        .upsert_login("abc123", Some("shared@example.com"))
        .await
        .unwrap();
    let second = db
        .upsert_login("xyz789", Some("shared@example.com"))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn test_save_profile_creates_row_when_absent() {
    let db = test_db().await;

    let changes = ProfileChanges {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        age: Some(42),
    };
    let user = db
        .save_profile("abc123", Some("a@example.com"), &changes)
        .await
        .unwrap();

    assert_eq!(user.subject, "abc123");
    assert_eq!(user.email.as_deref(), Some("a@example.com"));
    assert_eq!(user.first_name.as_deref(), Some("Jane"));
    assert_eq!(user.age, Some(42));
}

#[tokio::test]
async fn test_save_profile_updates_in_place() {
    let db = test_db().await;

    let created = db
        .upsert_login("abc123", Some("a@example.com"))
        .await
        .unwrap();

    let changes = ProfileChanges {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        age: None,
    };
    let updated = db
        .save_profile("abc123", Some("other@example.com"), &changes)
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.first_name.as_deref(), Some("Jane"));
    assert_eq!(updated.age, None);
    // Email stays provider-authoritative on updates.
    assert_eq!(updated.email.as_deref(), Some("a@example.com"));
    assert_ne!(updated.updated_at, created.updated_at);
}

#[tokio::test]
async fn test_save_profile_overwrites_age_with_null() {
    let db = test_db().await;

    let with_age = ProfileChanges {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        age: Some(42),
    };
    db.save_profile("abc123", None, &with_age).await.unwrap();

    let without_age = ProfileChanges {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        age: None,
    };
    let user = db.save_profile("abc123", None, &without_age).await.unwrap();

    assert_eq!(user.age, None);
}
