use std::sync::Arc;

use anyhow::Result;
use teloxide::Bot;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod database;
mod error;
mod evaluator;
mod market;
mod messages;
mod models;
mod notifier;
mod telegram;
mod traits;

use config::Config;
use database::Database;
use evaluator::AlertEvaluator;
use market::SimcoToolsClient;
use notifier::TelegramNotifier;
use telegram::TelegramBot;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting SimcoTools price alert bot");

    let database = Database::connect(&config.database_url).await?;
    let store = Arc::new(database.clone());
    let market = Arc::new(SimcoToolsClient::new(
        config.market_api_url.clone(),
        config.fetch_timeout,
        config.snapshot_ttl,
    )?);
    let bot = Bot::new(&config.telegram_token);
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));

    let evaluator = AlertEvaluator::new(
        store.clone(),
        store,
        market.clone(),
        notifier,
        config.evaluator_settings(),
    );

    // Run once immediately
    if let Err(e) = evaluator.run_cycle().await {
        error!("Error during initial alert check: {}", e);
    }

    let mut sched = JobScheduler::new().await?;

    let job_evaluator = evaluator.clone();
    sched
        .add(Job::new_async(config.check_schedule.as_str(), move |_uuid, _l| {
            let evaluator = job_evaluator.clone();
            Box::pin(async move {
                if let Err(e) = evaluator.try_run_cycle().await {
                    error!("Error checking alerts: {}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started with schedule '{}'", config.check_schedule);
    sched.start().await?;

    let telegram = Arc::new(TelegramBot::new(
        bot,
        database,
        market,
        evaluator,
        config.admin_chat_ids.clone(),
    ));
    telegram.run().await;

    info!("Shutting down");
    sched.shutdown().await?;
    Ok(())
}
