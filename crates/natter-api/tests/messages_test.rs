mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::{MockCompletion, Reply, TestApp, triple};

#[tokio::test]
async fn created_message_is_read_once_as_unseen() {
    let app = TestApp::new(MockCompletion::new(Reply::Fixed("unused")));
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;

    let (status, body) = app.send("alice", "bob", "hi bob").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sender_name"], "alice");
    assert_eq!(body["receiver_name"], "bob");
    assert_eq!(body["description"], "hi bob");
    assert!(body["time"].is_string());

    let (status, unseen) = app.get(&format!("/api/messages/{alice}/{bob}")).await;
    assert_eq!(status, StatusCode::OK);
    let unseen = unseen.as_array().unwrap();
    assert_eq!(unseen.len(), 1);
    assert_eq!(unseen[0]["description"], "hi bob");
    assert_eq!(unseen[0]["sender_name"], "alice");

    let (status, again) = app.get(&format!("/api/messages/{alice}/{bob}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, json!([]));
}

#[tokio::test]
async fn unseen_read_is_directional() {
    let app = TestApp::new(MockCompletion::new(Reply::Fixed("unused")));
    let alice = app.sign_up("alice").await;
    let bob = app.sign_up("bob").await;
    app.send("alice", "bob", "ping").await;

    let (_, reversed) = app.get(&format!("/api/messages/{bob}/{alice}")).await;
    assert_eq!(reversed, json!([]));

    let (_, forward) = app.get(&format!("/api/messages/{alice}/{bob}")).await;
    assert_eq!(forward.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_receiver_is_rejected_and_nothing_is_stored() {
    let app = TestApp::new(MockCompletion::new(Reply::Fixed("unused")));
    app.sign_up("alice").await;

    let (status, body) = app.send("alice", "zed", "anyone there?").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["receiver_name"][0], "Object with username=zed does not exist.");
    assert!(body.get("sender_name").is_none());
    assert!(app.conversation("alice", "chatgpt").is_empty());
    let count: i64 = app
        .state
        .db
        .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn missing_fields_are_all_reported() {
    let app = TestApp::new(MockCompletion::new(Reply::Fixed("unused")));

    let (status, body) = app.post("/api/messages", json!({ "time": "" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["sender_name", "receiver_name", "description"] {
        assert_eq!(body[field][0], "This field is required.", "field {field}");
    }
}

#[tokio::test]
async fn empty_description_is_accepted() {
    let app = TestApp::new(MockCompletion::new(Reply::Fixed("unused")));
    app.sign_up("alice").await;
    app.sign_up("bob").await;

    let (status, body) = app.send("alice", "bob", "").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["description"], "");
}

#[tokio::test]
async fn explicit_time_is_kept_and_bad_time_rejected() {
    let app = TestApp::new(MockCompletion::new(Reply::Fixed("unused")));
    app.sign_up("alice").await;
    app.sign_up("bob").await;

    let (status, body) = app
        .post(
            "/api/messages",
            json!({
                "sender_name": "alice",
                "receiver_name": "bob",
                "description": "dated",
                "time": "2024-05-01 08:15:00",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["time"], "2024-05-01T08:15:00Z");

    let (status, body) = app
        .post(
            "/api/messages",
            json!({
                "sender_name": "alice",
                "receiver_name": "bob",
                "description": "undated",
                "time": "tomorrow-ish",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["time"][0].as_str().unwrap().starts_with("Datetime has wrong format"));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new(MockCompletion::new(Reply::Fixed("unused")));

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn message_to_bot_stores_exactly_one_reply() {
    let client = MockCompletion::new(Reply::Fixed("T"));
    let app = TestApp::new(client.clone());
    let alice = app.sign_up("alice").await;

    let (status, body) = app.send("alice", "chatgpt", "hello").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["receiver_name"], "chatgpt");
    assert_eq!(client.call_count(), 1);
    assert_eq!(
        app.conversation("alice", "chatgpt"),
        vec![triple("alice", "chatgpt", "hello"), triple("chatgpt", "alice", "T")]
    );

    let bot = app.user_id("chatgpt");
    let (_, unseen) = app.get(&format!("/api/messages/{bot}/{alice}")).await;
    assert_eq!(unseen[0]["description"], "T");
    assert_eq!(unseen[0]["receiver_name"], "alice");
}

#[tokio::test]
async fn bot_sees_system_preamble_then_history() {
    let client = MockCompletion::new(Reply::Echo);
    let app = TestApp::new(client.clone());
    app.sign_up("alice").await;

    app.send("alice", "chatgpt", "first").await;
    app.send("alice", "chatgpt", "second").await;

    let calls = client.calls.lock().unwrap();
    let second: Vec<&str> = calls[1].iter().map(|t| t.content.as_str()).collect();
    assert_eq!(
        second,
        vec![
            "You are a human being. You will try to convince the user you are human.",
            "first",
            "re: first",
            "second",
        ]
    );
}

#[tokio::test]
async fn failing_completion_keeps_trigger_and_skips_reply() {
    let client = MockCompletion::new(Reply::Fail);
    let app = TestApp::new(client.clone());
    app.sign_up("alice").await;

    let (status, _) = app.send("alice", "chatgpt", "hello?").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(client.call_count(), 1);
    assert_eq!(app.conversation("alice", "chatgpt"), vec![triple("alice", "chatgpt", "hello?")]);
}

#[tokio::test]
async fn bot_authored_messages_are_never_dispatched() {
    let client = MockCompletion::new(Reply::Fixed("loop"));
    let app = TestApp::new(client.clone());
    app.sign_up("alice").await;

    let (to_user, _) = app.send("chatgpt", "alice", "unprompted").await;
    let (to_self, _) = app.send("chatgpt", "chatgpt", "talking to myself").await;

    assert_eq!(to_user, StatusCode::CREATED);
    assert_eq!(to_self, StatusCode::CREATED);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn concurrent_bot_conversations_stay_separate() {
    let client = MockCompletion::slow(Reply::Echo, Duration::from_millis(50));
    let app = TestApp::new(client.clone());
    app.sign_up("alice").await;
    app.sign_up("bob").await;

    let (a, b) = tokio::join!(
        app.send("alice", "chatgpt", "alice asks"),
        app.send("bob", "chatgpt", "bob asks"),
    );
    assert_eq!(a.0, StatusCode::CREATED);
    assert_eq!(b.0, StatusCode::CREATED);

    assert_eq!(
        app.conversation("alice", "chatgpt"),
        vec![triple("alice", "chatgpt", "alice asks"), triple("chatgpt", "alice", "re: alice asks")]
    );
    assert_eq!(
        app.conversation("bob", "chatgpt"),
        vec![triple("bob", "chatgpt", "bob asks"), triple("chatgpt", "bob", "re: bob asks")]
    );

    for call in client.calls.lock().unwrap().iter() {
        assert_eq!(call.len(), 2, "each session holds only its own turn: {call:?}");
    }
}

#[tokio::test]
async fn conversation_lists_both_directions() {
    let app = TestApp::new(MockCompletion::new(Reply::Fixed("unused")));
    app.sign_up("alice").await;
    app.sign_up("bob").await;
    app.send("alice", "bob", "one").await;
    app.send("bob", "alice", "two").await;

    let (status, body) = app.get("/api/conversations/alice/bob").await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<&str> = body.as_array().unwrap().iter().map(|m| m["description"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["one", "two"]);

    let (status, body) = app.get("/api/conversations/alice/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User 'nobody' not found");
}
