//! # Telegram delivery
//!
//! Sends alert notifications to the chat that owns each alert. Alert owners
//! are stored as the decimal Telegram chat id, so delivery only needs to parse
//! the owner back into a [`ChatId`].
//!
//! Messages are plain text. Nothing here retries: a failed delivery is
//! reported to the evaluator, which leaves the alert's fired-marker alone so
//! the next cycle tries again.

use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::debug;

use crate::error::DeliveryError;
use crate::traits::Notifier;

/// Telegram implementation of [`Notifier`].
///
/// Cloning is cheap; `Bot` shares its HTTP client internally.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Parses an alert owner into a chat id.
pub fn parse_chat_id(recipient: &str) -> Result<ChatId, DeliveryError> {
    recipient
        .trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| DeliveryError::InvalidRecipient(recipient.to_string()))
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        let chat_id = parse_chat_id(recipient)?;
        self.bot.send_message(chat_id, text).await?;
        debug!(chat_id = chat_id.0, "Telegram message delivered");
        Ok(())
    }
}
