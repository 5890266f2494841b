//! End-to-end tests: publish events through gate, session, and submission
//!
//! Uses a temporary SQLite database and the mock transport, so the full
//! store/session/record path runs without network access.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use libsyndicast::config::Config;
use libsyndicast::service::gate::SkipReason;
use libsyndicast::service::{PostSavedOutcome, SyndicastService};
use libsyndicast::store::keys;
use libsyndicast::xrpc::{MockReply, MockTransport, CREATE_RECORD, CREATE_SESSION, REFRESH_SESSION};
use libsyndicast::{Database, Hooks, PostSnapshot, Store, SyndicationOutcome};
use secrecy::SecretString;
use tempfile::TempDir;

/// Setup a service backed by a temporary database and a mock PDS
async fn setup_service(mock: &MockTransport) -> (SyndicastService, Arc<Database>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("syndicast.db");
    let db = Arc::new(Database::new(db_path.to_str().unwrap()).await.unwrap());

    let mut config = Config::default();
    config.database.path = db_path.to_str().unwrap().to_string();
    config.bluesky.domain = "https://pds.test".to_string();

    let service = SyndicastService::with_parts(config, db.clone(), Arc::new(mock.clone()), Hooks::new());

    (service, db, temp_dir)
}

fn hello_post(published: &str) -> PostSnapshot {
    PostSnapshot {
        id: "101".to_string(),
        post_type: "post".to_string(),
        status: "publish".to_string(),
        title: "Hello".to_string(),
        permalink: "https://example.com/hello".to_string(),
        published_at_gmt: published.to_string(),
    }
}

fn mock_happy_pds() -> MockTransport {
    let mock = MockTransport::new();
    mock.on(
        CREATE_SESSION,
        MockReply::ok_json(serde_json::json!({
            "accessJwt": "access-1",
            "refreshJwt": "refresh-1",
            "did": "did:plc:author"
        })),
    );
    mock.on(
        REFRESH_SESSION,
        MockReply::ok_json(serde_json::json!({
            "accessJwt": "access-2",
            "refreshJwt": "refresh-2"
        })),
    );
    mock.on(
        CREATE_RECORD,
        MockReply::ok_json(serde_json::json!({
            "uri": "at://did:plc:author/app.bsky.feed.post/3k",
            "cid": "bafy"
        })),
    );
    mock
}

#[tokio::test]
async fn test_connect_then_publish() {
    let mock = mock_happy_pds();
    let (service, db, _temp_dir) = setup_service(&mock).await;
    let activated = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

    service.on_activate(activated).await.unwrap();
    service
        .connect(None, "author.pds.test", SecretString::from("app-pw".to_string()))
        .await
        .unwrap();

    let outcome = service.on_post_saved(&hello_post("2024-05-01 12:00:00")).await;

    let status = match outcome {
        PostSavedOutcome::Attempted(status) => status,
        other => panic!("Expected attempted syndication, got {:?}", other),
    };
    assert_eq!(status.outcome, SyndicationOutcome::Delivered);
    assert!(status.body.contains("at://did:plc:author"));

    // Password gone, rotated tokens persisted
    assert_eq!(db.get_option(keys::PASSWORD).await.unwrap().as_deref(), Some(""));
    assert_eq!(db.get_option(keys::ACCESS_JWT).await.unwrap().as_deref(), Some("access-2"));
    assert_eq!(db.get_option(keys::REFRESH_JWT).await.unwrap().as_deref(), Some("refresh-2"));

    // The record that went out
    let request = &mock.requests_to(CREATE_RECORD)[0];
    assert_eq!(request.url, "https://pds.test/xrpc/com.atproto.repo.createRecord");
    assert_eq!(request.bearer.as_deref(), Some("access-2"));

    let body = request.body.as_ref().unwrap();
    assert_eq!(body["collection"], "app.bsky.feed.post");
    assert_eq!(body["repo"], "did:plc:author");
    assert_eq!(body["did"], "did:plc:author");
    assert_eq!(
        body["record"],
        serde_json::json!({
            "$type": "app.bsky.feed.post",
            "createdAt": "2024-05-01T12:00:00+00:00",
            "text": "Hello https://example.com/hello",
            "facets": [{
                "index": {"byteStart": 6, "byteEnd": 31},
                "features": [{
                    "$type": "app.bsky.richtext.facet#link",
                    "uri": "https://example.com/hello"
                }]
            }]
        })
    );
}

#[tokio::test]
async fn test_resave_never_resubmits() {
    let mock = mock_happy_pds();
    let (service, _db, _temp_dir) = setup_service(&mock).await;
    service
        .connect(None, "author.pds.test", SecretString::from("app-pw".to_string()))
        .await
        .unwrap();

    let post = hello_post("2024-05-01 12:00:00");
    assert!(matches!(
        service.on_post_saved(&post).await,
        PostSavedOutcome::Attempted(_)
    ));

    for _ in 0..3 {
        assert_eq!(
            service.on_post_saved(&post).await,
            PostSavedOutcome::Skipped(SkipReason::AlreadyAttempted)
        );
    }
    assert_eq!(mock.call_count(CREATE_RECORD), 1);
}

#[tokio::test]
async fn test_failed_attempt_also_blocks_resave() {
    let mock = mock_happy_pds();
    mock.on(CREATE_RECORD, MockReply::status(400, r#"{"error":"InvalidRequest"}"#));
    let (service, _db, _temp_dir) = setup_service(&mock).await;
    service
        .connect(None, "author.pds.test", SecretString::from("app-pw".to_string()))
        .await
        .unwrap();

    let post = hello_post("2024-05-01 12:00:00");
    match service.on_post_saved(&post).await {
        PostSavedOutcome::Attempted(status) => {
            assert_eq!(status.outcome, SyndicationOutcome::Rejected);
            assert_eq!(status.body, r#"{"error":"InvalidRequest"}"#);
        }
        other => panic!("Expected attempt, got {:?}", other),
    }

    assert_eq!(
        service.on_post_saved(&post).await,
        PostSavedOutcome::Skipped(SkipReason::AlreadyAttempted)
    );
}

#[tokio::test]
async fn test_posts_before_activation_are_never_sent() {
    let mock = mock_happy_pds();
    let (service, _db, _temp_dir) = setup_service(&mock).await;
    service
        .on_activate(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();
    service
        .connect(None, "author.pds.test", SecretString::from("app-pw".to_string()))
        .await
        .unwrap();

    for published in ["2024-04-30 23:59:59", "2023-01-01 00:00:00", "2019-07-04T10:00:00Z"] {
        assert_eq!(
            service.on_post_saved(&hello_post(published)).await,
            PostSavedOutcome::Skipped(SkipReason::PublishedBeforeActivation)
        );
    }
    assert_eq!(mock.call_count(CREATE_RECORD), 0);
}

#[tokio::test]
async fn test_rejected_login_means_no_status() {
    let mock = MockTransport::new();
    mock.on(CREATE_SESSION, MockReply::status(401, r#"{"error":"AuthenticationRequired"}"#));
    mock.on(REFRESH_SESSION, MockReply::status(400, r#"{"error":"InvalidToken"}"#));
    let (service, db, _temp_dir) = setup_service(&mock).await;

    service
        .connect(None, "author.pds.test", SecretString::from("wrong".to_string()))
        .await
        .unwrap();

    let post = hello_post("2024-05-01 12:00:00");
    assert_eq!(service.on_post_saved(&post).await, PostSavedOutcome::Aborted);
    assert_eq!(db.get_post_status(&post.id).await.unwrap(), None);
    assert_eq!(mock.call_count(CREATE_RECORD), 0);

    // Nothing half-written either
    assert_eq!(db.get_option(keys::ACCESS_JWT).await.unwrap(), None);
    assert_eq!(db.get_option(keys::DID).await.unwrap(), None);
}

#[tokio::test]
async fn test_unreachable_refresh_leaves_tokens_identical() {
    let mock = mock_happy_pds();
    let (service, db, _temp_dir) = setup_service(&mock).await;
    service
        .connect(None, "author.pds.test", SecretString::from("app-pw".to_string()))
        .await
        .unwrap();

    mock.on(REFRESH_SESSION, MockReply::unreachable("connection refused"));
    let before_access = db.get_option(keys::ACCESS_JWT).await.unwrap();
    let before_refresh = db.get_option(keys::REFRESH_JWT).await.unwrap();

    let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    service.on_activate(now).await.unwrap();
    service.on_refresh_tick(now).await.unwrap();
    service
        .on_refresh_tick(now + chrono::Duration::days(1))
        .await
        .unwrap();

    assert_eq!(mock.call_count(REFRESH_SESSION), 2);
    assert_eq!(db.get_option(keys::ACCESS_JWT).await.unwrap(), before_access);
    assert_eq!(db.get_option(keys::REFRESH_JWT).await.unwrap(), before_refresh);
}

#[tokio::test]
async fn test_hooks_shape_the_record() {
    let mock = mock_happy_pds();
    let (service, _db, _temp_dir) = setup_service(&mock).await;

    let mut hooks = Hooks::new();
    hooks
        .post_types(|mut types, _| {
            types.push("note".to_string());
            types
        })
        .record_text(|_, post| format!("📝 {}", post.title));
    let service = service.with_hooks(hooks);

    service
        .connect(None, "author.pds.test", SecretString::from("app-pw".to_string()))
        .await
        .unwrap();

    let mut note = hello_post("2024-05-01 12:00:00");
    note.post_type = "note".to_string();
    note.id = "202".to_string();

    assert!(matches!(
        service.on_post_saved(&note).await,
        PostSavedOutcome::Attempted(_)
    ));

    let body = mock.requests_to(CREATE_RECORD)[0].body.clone().unwrap();
    assert_eq!(body["record"]["text"], "📝 Hello");
    assert_eq!(body["record"]["facets"], serde_json::json!([]));
}
