//! Bot module - conversation state, orchestration and the Telegram side.

pub mod orchestrator;
pub mod replies;
pub mod store;
pub mod telegram;


pub use orchestrator::{ImageSource, Orchestrator};
pub use replies::{Attachment, Button, Reply, ReplyKind};
pub use store::{ChatLocks, ChatSession, ConversationStore};
pub use telegram::TelegramClient;
