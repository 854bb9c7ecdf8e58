//! Telegram command handlers.

use std::collections::HashSet;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::commands;
use crate::database::Database;
use crate::error::{StoreError, TelegramError};
use crate::evaluator::AlertEvaluator;
use crate::messages;
use crate::traits::{AlertStore, MarketSource};

/// Bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Show help")]
    Help,
    #[command(description = "Show bot status")]
    Status,
    #[command(description = "Create an alert. Usage: /alert <resource_id> <target_price> [quality] [label]")]
    Alert(String),
    #[command(description = "List your alerts")]
    Alerts,
    #[command(description = "Edit an alert. Usage: /edit <id> <price|quality|label> <value>")]
    Edit(String),
    #[command(description = "Delete alerts. Usage: /delete <id> [id...]")]
    Delete(String),
    #[command(description = "Delete all of your alerts")]
    DeleteAll,
    #[command(description = "Delete every alert (admins only)")]
    Purge,
    #[command(description = "Current prices. Usage: /price <resource_id> [quality]")]
    Price(String),
    #[command(description = "Run an alert check now (admins only)")]
    Check,
}

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    db: Database,
    market: Arc<dyn MarketSource>,
    evaluator: AlertEvaluator,
    admins: HashSet<String>,
}

impl TelegramBot {
    pub fn new(
        bot: Bot,
        db: Database,
        market: Arc<dyn MarketSource>,
        evaluator: AlertEvaluator,
        admins: HashSet<String>,
    ) -> Self {
        Self {
            bot,
            db,
            market,
            evaluator,
            admins,
        }
    }

    /// Run the bot command handler until Ctrl-C.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(bot, msg, cmd).await }
            },
        );

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    fn is_admin(&self, chat_id: &str) -> bool {
        self.admins.contains(chat_id)
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        let chat_id = msg.chat.id.to_string();
        let elevated = self.is_admin(&chat_id);

        let reply = match cmd {
            Command::Help => messages::HELP.to_string(),
            Command::Status => self.status(&chat_id).await,
            Command::Alert(args) => self.create_alert(&chat_id, &args).await,
            Command::Alerts => match self.db.list_by_owner(&chat_id).await {
                Ok(alerts) => messages::alert_list(&alerts),
                Err(e) => storage_reply(&e),
            },
            Command::Edit(args) => self.edit_alert(&chat_id, elevated, &args).await,
            Command::Delete(args) => match commands::parse_ids(&args) {
                Ok(ids) => match self.db.delete_many(&ids, &chat_id, elevated).await {
                    Ok(report) => {
                        info!(chat_id = %chat_id, deleted = ?report.deleted, "Alerts deleted");
                        messages::delete_report(&report)
                    }
                    Err(e) => storage_reply(&e),
                },
                Err(e) => e.to_string(),
            },
            Command::DeleteAll => match AlertStore::delete_all_for_owner(&self.db, &chat_id).await {
                Ok(count) => format!("Deleted {count} alert(s)."),
                Err(e) => storage_reply(&e),
            },
            Command::Purge => match self.db.delete_all(elevated).await {
                Ok(count) => {
                    warn!(chat_id = %chat_id, count, "All alerts purged");
                    format!("Deleted all {count} alert(s).")
                }
                Err(StoreError::PermissionDenied) => "Only admins can do that.".to_string(),
                Err(e) => storage_reply(&e),
            },
            Command::Price(args) => self.price(&args).await,
            Command::Check => {
                if !elevated {
                    "Only admins can do that.".to_string()
                } else {
                    match self.evaluator.run_cycle().await {
                        Ok(outcomes) => messages::cycle_summary(&outcomes),
                        Err(e) => storage_reply(&e),
                    }
                }
            }
        };

        bot.send_message(msg.chat.id, reply).await?;
        Ok(())
    }

    async fn status(&self, chat_id: &str) -> String {
        let total = self.db.count_alerts().await;
        let mine = self.db.list_by_owner(chat_id).await;
        match (total, mine) {
            (Ok(total), Ok(mine)) => messages::status(total, mine.len()),
            (Err(e), _) | (_, Err(e)) => storage_reply(&e),
        }
    }

    async fn create_alert(&self, chat_id: &str, args: &str) -> String {
        let new_alert = match commands::parse_new_alert(chat_id, args) {
            Ok(alert) => alert,
            Err(e) => return e.to_string(),
        };
        match self.db.insert(new_alert).await {
            Ok(alert) => {
                info!(chat_id = %chat_id, alert_id = alert.id, "Alert created");
                messages::alert_created(&alert)
            }
            Err(StoreError::Validation(e)) => e.to_string(),
            Err(e) => storage_reply(&e),
        }
    }

    async fn edit_alert(&self, chat_id: &str, elevated: bool, args: &str) -> String {
        let (id, edit) = match commands::parse_edit(args) {
            Ok(parsed) => parsed,
            Err(e) => return e.to_string(),
        };
        match self.db.update(id, chat_id, elevated, edit).await {
            Ok(alert) => messages::alert_updated(&alert),
            Err(StoreError::NotFound(id)) => format!("You have no alert with id {id}."),
            Err(StoreError::Validation(e)) => e.to_string(),
            Err(e) => storage_reply(&e),
        }
    }

    async fn price(&self, args: &str) -> String {
        let (resource_id, quality) = match commands::parse_price_query(args) {
            Ok(query) => query,
            Err(e) => return e.to_string(),
        };
        match self.market.fetch_all_prices().await {
            Ok(prices) => {
                let found: Vec<_> = prices
                    .into_iter()
                    .filter(|p| p.resource_id == resource_id)
                    .filter(|p| quality.is_none_or(|q| p.quality == q))
                    .collect();
                messages::prices(resource_id, quality, &found)
            }
            Err(e) => {
                warn!(resource_id, error = %e, "Price lookup failed");
                "Could not reach the market right now, please try again later.".to_string()
            }
        }
    }
}

/// Storage failures are logged in full and reported without detail.
fn storage_reply(error: &StoreError) -> String {
    tracing::error!(error = %error, "Store operation failed");
    "Something went wrong saving your alerts, nothing was changed.".to_string()
}
