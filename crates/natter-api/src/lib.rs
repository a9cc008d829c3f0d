pub mod error;
pub mod friends;
pub mod messages;
pub mod state;
pub mod users;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All HTTP routes, without transport layers (CORS, tracing) which the
/// binary adds.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", get(users::search_users).post(users::sign_up))
        .route("/api/users/{username}", get(users::get_user))
        .route(
            "/api/users/{username}/friends",
            get(friends::list_friends).post(friends::add_friend),
        )
        .route("/api/messages", post(messages::send_message))
        .route("/api/messages/{sender_id}/{receiver_id}", get(messages::list_unseen))
        .route("/api/conversations/{username}/{friend}", get(messages::get_conversation))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
