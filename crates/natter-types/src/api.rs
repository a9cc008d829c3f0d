use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, User};

/// Field name -> list of problems with that field. Serialized as-is in 400 bodies.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    pub search: Option<String>,
    /// Username to leave out of the results, usually the caller's own.
    pub exclude: Option<String>,
}

// -- Friends --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddFriendRequest {
    pub friend: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddFriendResponse {
    pub added: bool,
}

// -- Messages --

/// Every field is optional so that a missing one surfaces as a field error
/// instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMessageRequest {
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
    pub description: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub sender_name: String,
    pub receiver_name: String,
    pub description: String,
    pub time: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            sender_name: message.sender_name,
            receiver_name: message.receiver_name,
            description: message.description,
            time: message.time,
        }
    }
}
