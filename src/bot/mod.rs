use std::sync::Arc;

use futures_util::FutureExt;
use teloxide::adaptors::Throttle;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::BotCommand;

use crate::impls::LoggableErrorResult;
use crate::numbers::{Dispenser, NumberPool};
use crate::registry::Registry;
use crate::scheduler::{DailyJob, Job};
use crate::settings::Settings;
use crate::submissions::SubmissionBox;

mod broadcast;
mod entity;
mod fsm;
mod impls;
mod keyboard;
mod report;
mod res;

type WBot = Throttle<Bot>;
type MyStorage = InMemStorage<fsm::State>;

/// Runs long polling until ctrl-c.
pub async fn start(settings: Arc<Settings>, registry: Arc<Registry>) -> anyhow::Result<()> {
    let bot = Bot::new(settings.bot_token.as_str()).throttle(Default::default());
    let pool = Arc::new(NumberPool::new(settings.uploads_dir.clone()));
    let submissions = Arc::new(SubmissionBox::new(settings.user_files_dir()));
    tokio::fs::create_dir_all(submissions.root()).await?;
    let dispenser = Arc::new(Dispenser::new(settings.cooldown));

    let job: Job = {
        let (bot, registry, submissions) = (bot.clone(), registry.clone(), submissions.clone());
        let admins = settings.admin_ids.clone();
        Arc::new(move || report::run(bot.clone(), registry.clone(), submissions.clone(), admins.clone()).boxed())
    };
    let daily = Arc::new(DailyJob::new(job));
    daily.reschedule(&registry.delivery_schedule()).ok_or_log();
    if !daily.is_scheduled() {
        log::info!("delivery time is not set, daily reports are off");
    }

    let bot_username = bot
        .get_me()
        .await
        .ok_or_log()
        .map(|me| me.username().to_owned())
        .unwrap_or("unknown".to_owned());
    bot.set_my_commands([BotCommand::new("start", "Main menu")]).await.ok_or_log();
    log::info!("Bot @{} started!", bot_username);

    Dispatcher::builder(bot, fsm::make_dialogue_handler())
        .dependencies(dptree::deps![
            MyStorage::new(),
            settings,
            registry,
            pool,
            submissions,
            dispenser,
            daily.clone()
        ])
        .error_handler(LoggingErrorHandler::with_custom_text("An error has occurred in the dispatcher"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    daily.cancel();
    log::info!("Bot @{} stopped", bot_username);
    Ok(())
}
