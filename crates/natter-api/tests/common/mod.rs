#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use natter_api::{AppState, AppStateInner, router};
use natter_bot::{BotConfig, BotResponder, CompletionClient, CompletionError, Turn};
use natter_db::Database;

pub enum Reply {
    Fixed(&'static str),
    /// `"re: <last user turn>"`
    Echo,
    Fail,
}

/// Stand-in for the completion service. Records every turn list it receives.
pub struct MockCompletion {
    reply: Reply,
    delay: Duration,
    pub calls: Mutex<Vec<Vec<Turn>>>,
}

impl MockCompletion {
    pub fn new(reply: Reply) -> Arc<Self> {
        Self::slow(reply, Duration::ZERO)
    }

    pub fn slow(reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self { reply, delay, calls: Mutex::new(vec![]) })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CompletionClient for MockCompletion {
    async fn complete(&self, turns: &[Turn], _model: &str) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(turns.to_vec());
        tokio::time::sleep(self.delay).await;
        match &self.reply {
            Reply::Fixed(text) => Ok(text.to_string()),
            Reply::Echo => Ok(format!("re: {}", turns.last().map(|t| t.content.as_str()).unwrap_or(""))),
            Reply::Fail => Err(CompletionError::RequestFailed("service unavailable".into())),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new(client: Arc<MockCompletion>) -> Self {
        let db = Database::open_in_memory().unwrap();
        let bot = BotResponder::new(client, BotConfig::default());
        let state = AppStateInner::new(db, bot).unwrap();
        Self { router: router(state.clone()), state }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    /// Register `username` and return its id.
    pub async fn sign_up(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/api/users",
                json!({
                    "username": username,
                    "name": format!("{} Example", username),
                    "email": format!("{}@example.com", username),
                    "password": "correct horse",
                    "password_confirm": "correct horse",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "sign-up failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn send(&self, sender: &str, receiver: &str, text: &str) -> (StatusCode, Value) {
        self.post(
            "/api/messages",
            json!({ "sender_name": sender, "receiver_name": receiver, "description": text }),
        )
        .await
    }

    pub fn user_id(&self, username: &str) -> String {
        self.state.db.get_user_by_username(username).unwrap().unwrap().id
    }

    /// Stored messages between two users as (sender, receiver, text), oldest first.
    pub fn conversation(&self, a: &str, b: &str) -> Vec<(String, String, String)> {
        self.state
            .db
            .get_conversation(&self.user_id(a), &self.user_id(b))
            .unwrap()
            .into_iter()
            .map(|m| (m.sender_name, m.receiver_name, m.description))
            .collect()
    }
}

pub fn triple(sender: &str, receiver: &str, text: &str) -> (String, String, String) {
    (sender.to_string(), receiver.to_string(), text.to_string())
}
