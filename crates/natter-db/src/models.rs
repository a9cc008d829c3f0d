//! Database row types. These map directly to SQLite rows and are converted
//! into `natter_types::models` at the edge.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use natter_types::models::{Message, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id.parse().with_context(|| format!("corrupt user id '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("corrupt created_at on user '{}'", self.username))?,
            username: self.username,
            name: self.name,
            email: self.email,
        })
    }
}

/// A message joined with both parties' usernames.
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub receiver_id: String,
    pub receiver_name: String,
    pub description: String,
    pub time: String,
    pub seen: bool,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: self.id.parse().with_context(|| format!("corrupt message id '{}'", self.id))?,
            sender_id: self
                .sender_id
                .parse()
                .with_context(|| format!("corrupt sender_id on message '{}'", self.id))?,
            receiver_id: self
                .receiver_id
                .parse()
                .with_context(|| format!("corrupt receiver_id on message '{}'", self.id))?,
            time: parse_timestamp(&self.time)
                .with_context(|| format!("corrupt time on message '{}'", self.id))?,
            sender_name: self.sender_name,
            receiver_name: self.receiver_name,
            description: self.description,
            seen: self.seen,
        })
    }
}

/// Accepts RFC 3339, or SQLite's `datetime('now')` format which carries no
/// offset and is read as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("unrecognized timestamp '{}'", value))
}

/// Stored form of a timestamp. Fixed width so that text ordering is time ordering.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}
