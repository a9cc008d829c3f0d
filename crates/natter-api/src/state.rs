use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use natter_bot::{BotError, BotResponder, ReplySink};
use natter_db::Database;
use natter_types::api::CreateMessageRequest;

use crate::error::ApiError;
use crate::messages;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub bot: BotResponder,
}

impl AppStateInner {
    /// Build the shared state, creating the bot account if it does not exist yet.
    pub fn new(db: Database, bot: BotResponder) -> anyhow::Result<AppState> {
        let username = bot.username().to_string();
        let row = db.ensure_user(
            &Uuid::new_v4().to_string(),
            &username,
            "ChatGPT",
            &format!("{}@bot.natter.local", username),
        )?;
        info!("Bot account '{}' ready (id {})", row.username, row.id);

        Ok(Arc::new(Self { db: Arc::new(db), bot }))
    }
}

/// Bot replies re-enter the regular message write path.
#[async_trait]
impl ReplySink for AppStateInner {
    async fn post_reply(&self, sender: &str, receiver: &str, text: &str) -> Result<(), BotError> {
        let req = CreateMessageRequest {
            sender_name: Some(sender.to_string()),
            receiver_name: Some(receiver.to_string()),
            description: Some(text.to_string()),
            time: None,
        };

        messages::create_message(self, req)
            .await
            .map(|_| ())
            .map_err(|e| BotError::Reply(e.to_string()))
    }
}

/// Run a blocking DB call off the async runtime.
pub async fn run_db<F, T>(db: &Arc<Database>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::Internal)
}
