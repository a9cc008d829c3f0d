use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::completion::{CompletionClient, CompletionError};
use crate::session::SessionStore;

pub const DEFAULT_BOT_USERNAME: &str = "chatgpt";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PREAMBLE: &str =
    "You are a human being. You will try to convince the user you are human.";

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Reserved username of the bot account.
    pub username: String,
    pub model: String,
    pub preamble: String,
    pub timeout: Duration,
    /// Non-system turns kept per session; 0 keeps everything.
    pub max_history_turns: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_BOT_USERNAME.to_string(),
            model: DEFAULT_MODEL.to_string(),
            preamble: DEFAULT_PREAMBLE.to_string(),
            timeout: Duration::from_secs(30),
            max_history_turns: 40,
        }
    }
}

/// Where the bot's replies are written. Implemented by the message write
/// path, so a reply is validated and stored like any client message.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn post_reply(&self, sender: &str, receiver: &str, text: &str) -> Result<(), BotError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
    #[error("reply rejected: {0}")]
    Reply(String),
    #[error("message authored by the bot account")]
    SelfAddressed,
}

pub struct BotResponder {
    client: Arc<dyn CompletionClient>,
    sessions: SessionStore,
    config: BotConfig,
}

impl BotResponder {
    pub fn new(client: Arc<dyn CompletionClient>, config: BotConfig) -> Self {
        Self {
            client,
            sessions: SessionStore::new(config.preamble.clone(), config.max_history_turns),
            config,
        }
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub fn is_bot(&self, username: &str) -> bool {
        username == self.config.username
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Produce a reply to `text` from `sender` and post it back through `sink`.
    ///
    /// The sender's session stays locked until the completion arrives, then is
    /// released before the reply is posted. A failed or timed-out completion
    /// leaves the session as it was before the call.
    pub async fn respond(&self, sink: &dyn ReplySink, sender: &str, text: &str) -> Result<String, BotError> {
        if self.is_bot(sender) {
            return Err(BotError::SelfAddressed);
        }

        let reply = {
            let handle = self.sessions.get(sender);
            let mut session = handle.lock().await;
            session.push_user(text);
            debug!("Bot completion for {} with {} turns", sender, session.turns().len());

            let completion = tokio::time::timeout(
                self.config.timeout,
                self.client.complete(session.turns(), &self.config.model),
            )
            .await;

            match completion {
                Ok(Ok(reply)) => {
                    session.push_assistant(reply.clone());
                    reply
                }
                Ok(Err(e)) => {
                    session.discard_pending();
                    return Err(e.into());
                }
                Err(_) => {
                    session.discard_pending();
                    return Err(BotError::Timeout(self.config.timeout));
                }
            }
        };

        sink.post_reply(&self.config.username, sender, &reply).await?;
        info!("Bot replied to {}", sender);
        Ok(reply)
    }
}
