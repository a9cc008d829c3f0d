use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use natter_types::api::{SignUpRequest, UserResponse, UserSearchQuery};

use crate::error::{ApiError, Validator};
use crate::state::{AppState, run_db};

/// Users listed when browsing without a search term.
const BROWSE_LIMIT: u32 = 10;

pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let mut v = Validator::new();
    if req.username.len() < 3 || req.username.len() > 32 {
        v.add("username", "Ensure this field has 3 to 32 characters.");
    }
    if req.name.trim().is_empty() {
        v.add("name", "This field may not be blank.");
    }
    if !req.email.contains('@') {
        v.add("email", "Enter a valid email address.");
    }
    if req.password.len() < 8 {
        v.add("password", "Ensure this field has at least 8 characters.");
    }
    if req.password != req.password_confirm {
        v.add("password_confirm", "Passwords don't match!");
    }

    let (username, email) = (req.username.clone(), req.email.clone());
    let (email_taken, username_taken) = run_db(&state.db, move |db| {
        Ok((db.email_taken(&email)?, db.get_user_by_username(&username)?.is_some()))
    })
    .await?;
    if email_taken {
        v.add("email", "Email already registered!");
    }
    if username_taken {
        v.add("username", "Username already registered!");
    }
    v.finish()?;

    let user_id = Uuid::new_v4();
    let user = run_db(&state.db, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        db.create_user(&user_id.to_string(), &req.username, req.name.trim(), &req.email, &password_hash)?;
        db.get_user_by_id(&user_id.to_string())?
            .ok_or_else(|| anyhow::anyhow!("User {} missing after insert", user_id))?
            .into_user()
    })
    .await?;

    info!("Registered user {}", user.username);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = username.clone();
    let row = run_db(&state.db, move |db| db.get_user_by_username(&lookup))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User '{}' not found", username)))?;

    Ok(Json(UserResponse::from(row.into_user()?)))
}

/// Substring search over name and username. Without a search term, the first
/// few users are listed instead.
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let search = query.search.filter(|s| !s.is_empty());
    let limit = if search.is_some() { None } else { Some(BROWSE_LIMIT) };

    let rows = run_db(&state.db, move |db| {
        db.search_users(search.as_deref(), query.exclude.as_deref(), limit)
    })
    .await?;

    let users = rows
        .into_iter()
        .map(|row| row.into_user().map(UserResponse::from))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(users))
}
