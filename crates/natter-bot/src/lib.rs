//! Automated replies for the bot account.
//!
//! Messages addressed to the bot are fed, together with the sender's running
//! conversation, to an external chat-completion service. The completion is
//! posted back as an ordinary message through a [`ReplySink`].

pub mod completion;
pub mod openai;
pub mod responder;
pub mod session;

pub use completion::{CompletionClient, CompletionError, Role, Turn};
pub use openai::OpenAiClient;
pub use responder::{BotConfig, BotError, BotResponder, ReplySink};
pub use session::{Session, SessionStore};
