use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use natter_types::api::{AddFriendRequest, AddFriendResponse, UserResponse};

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Friends of `username`. An unknown user simply has no friends.
pub async fn list_friends(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state.db, move |db| match db.get_user_by_username(&username)? {
        Some(user) => db.get_friends(&user.id),
        None => Ok(vec![]),
    })
    .await?;

    let friends = rows
        .into_iter()
        .map(|row| row.into_user().map(UserResponse::from))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(friends))
}

/// Befriend `req.friend`. The edge is written both ways; repeating the call
/// changes nothing and answers `added: false`.
pub async fn add_friend(
    State(state): State<AppState>,
    Path(username): Path<String>,
    payload: Result<Json<AddFriendRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    if req.friend == username {
        return Err(ApiError::field("friend", "You cannot add yourself as a friend."));
    }

    let (user_name, friend_name) = (username.clone(), req.friend.clone());
    let (user, friend) = run_db(&state.db, move |db| {
        Ok((db.get_user_by_username(&user_name)?, db.get_user_by_username(&friend_name)?))
    })
    .await?;
    let user = user.ok_or_else(|| ApiError::NotFound(format!("User '{}' not found", username)))?;
    let friend = friend.ok_or_else(|| ApiError::NotFound(format!("User '{}' not found", req.friend)))?;

    let (user_id, friend_id) = (user.id, friend.id);
    let added = run_db(&state.db, move |db| db.add_friend(&user_id, &friend_id)).await?;

    let status = if added {
        info!("{} and {} are now friends", user.username, friend.username);
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(AddFriendResponse { added })))
}
