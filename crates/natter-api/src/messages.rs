use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use natter_db::models::{format_timestamp, parse_timestamp};
use natter_types::api::{CreateMessageRequest, MessageResponse};
use natter_types::models::Message;

use crate::error::{ApiError, Validator};
use crate::state::{AppState, AppStateInner, run_db};

pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let message = create_message(&state, req).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// Validate and store a message. If it is addressed to the bot account, the
/// bot's reply is produced and stored before this returns.
///
/// A failing bot never fails the triggering message: it is already stored,
/// and the error is only logged.
pub async fn create_message(state: &AppStateInner, req: CreateMessageRequest) -> Result<Message, ApiError> {
    let mut v = Validator::new();
    let sender_name = v.require("sender_name", req.sender_name);
    let receiver_name = v.require("receiver_name", req.receiver_name);
    let description = v.require("description", req.description);

    let time = match req.time.as_deref().map(str::trim) {
        None | Some("") => Utc::now(),
        Some(raw) => parse_timestamp(raw).unwrap_or_else(|_| {
            v.add("time", "Datetime has wrong format. Use RFC 3339 or YYYY-MM-DD HH:MM:SS.");
            Utc::now()
        }),
    };

    let lookup = (sender_name.clone(), receiver_name.clone());
    let (sender, receiver) = run_db(&state.db, move |db| {
        let sender = match lookup.0 {
            Some(name) => db.get_user_by_username(&name)?,
            None => None,
        };
        let receiver = match lookup.1 {
            Some(name) => db.get_user_by_username(&name)?,
            None => None,
        };
        Ok((sender, receiver))
    })
    .await?;

    for (field, name, row) in [
        ("sender_name", &sender_name, &sender),
        ("receiver_name", &receiver_name, &receiver),
    ] {
        if let (Some(name), None) = (name, row) {
            v.add(field, format!("Object with username={} does not exist.", name));
        }
    }
    v.finish()?;

    let (Some(sender), Some(receiver), Some(description)) = (sender, receiver, description) else {
        return Err(ApiError::Internal(anyhow::anyhow!("validated message is incomplete")));
    };

    let id = Uuid::new_v4().to_string();
    let time = format_timestamp(&time);
    let (sender_id, receiver_id) = (sender.id, receiver.id);
    let message = run_db(&state.db, move |db| {
        db.insert_message(&id, &sender_id, &receiver_id, &description, &time)?;
        db.get_message(&id)?
            .ok_or_else(|| anyhow::anyhow!("Message {} missing after insert", id))?
            .into_message()
    })
    .await?;
    debug!("Stored message {} from {} to {}", message.id, message.sender_name, message.receiver_name);

    if state.bot.is_bot(&message.receiver_name) && !state.bot.is_bot(&message.sender_name) {
        if let Err(e) = state.bot.respond(state, &message.sender_name, &message.description).await {
            warn!("Bot reply to {} skipped: {}", message.sender_name, e);
        }
    }

    Ok(message)
}

/// Unseen messages from `sender_id` to `receiver_id`. Reading marks them seen.
pub async fn list_unseen(
    State(state): State<AppState>,
    Path((sender_id, receiver_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state.db, move |db| {
        db.take_unseen_messages(&sender_id.to_string(), &receiver_id.to_string())
    })
    .await?;

    let messages = rows
        .into_iter()
        .map(|row| row.into_message().map(MessageResponse::from))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(messages))
}

/// Full history between two users, both directions. Leaves `seen` alone.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path((username, friend)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state.db, move |db| {
        let Some(user) = db.get_user_by_username(&username)? else {
            return Ok(Err(username));
        };
        let Some(other) = db.get_user_by_username(&friend)? else {
            return Ok(Err(friend));
        };
        Ok(Ok(db.get_conversation(&user.id, &other.id)?))
    })
    .await?
    .map_err(|missing| ApiError::NotFound(format!("User '{}' not found", missing)))?;

    let messages = rows
        .into_iter()
        .map(|row| row.into_message().map(MessageResponse::from))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(messages))
}
