//! Chat transport seam.
//!
//! The account lifecycle only needs a narrow capability surface from the chat
//! platform: "is the connection up" (the sweeper waits for it) and
//! best-effort direct messages. Command handling lives in `commands/` and
//! talks to Telegram directly through teloxide.

pub mod commands;
pub mod telegram;

use async_trait::async_trait;

use crate::error::Error;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether the transport has an established connection. The expiry sweep
    /// polls this before its first pass so expiry notifications can be
    /// delivered.
    fn is_connected(&self) -> bool;

    /// Best-effort direct message to a chat user. Callers log failures and
    /// carry on; an undeliverable notification never fails an operation.
    async fn send_direct_message(&self, chat_user_id: &str, text: &str) -> Result<(), Error>;
}
