use std::path::PathBuf;
use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use codelaunch::bot::telegram::{callback_to_update, message_to_update};
use codelaunch::bot::{ConversationStore, Orchestrator, TelegramClient};
use codelaunch::classifier::InboundUpdate;
use codelaunch::config::{Config, DEFAULT_CONFIG_PATH};
use codelaunch::deploy::{PlatformCatalog, Packager};
use codelaunch::generation::AnthropicGateway;

struct BotState {
    orchestrator: Orchestrator,
    telegram: Arc<TelegramClient>,
}

#[tokio::main]
async fn main() {
    // An explicit path must exist; the default one is optional.
    let config_path = std::env::args().nth(1).map(PathBuf::from).or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        default.exists().then_some(default)
    });
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("codelaunch.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting codelaunch...");
    match config_path {
        Some(ref path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file, using environment"),
    }
    if config.anthropic_api_key.is_none() {
        warn!("No Anthropic API key configured - generation requests will fail until one is set");
    }

    let bot = Bot::new(&config.telegram_bot_token);
    match bot.get_me().await {
        Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
        Err(e) => warn!("Failed to get bot info: {e}"),
    }

    let generator = match AnthropicGateway::new(config.gateway_settings()) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to build generation client: {e}");
            std::process::exit(1);
        }
    };

    let catalog = Arc::new(PlatformCatalog::builtin());
    info!(
        "Platforms: {}",
        catalog.list().iter().map(|p| p.id).collect::<Vec<_>>().join(", ")
    );

    let telegram = Arc::new(TelegramClient::new(bot.clone()));
    let orchestrator = Orchestrator::new(
        ConversationStore::new(config.session_capacity),
        Packager::new(catalog),
        Arc::new(generator),
        telegram.clone(),
    );
    let state = Arc::new(BotState { orchestrator, telegram });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shutting down bot...");
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if msg.from.as_ref().is_some_and(|u| u.is_bot) {
        return Ok(());
    }
    let update = message_to_update(&msg);
    deliver(&state, &update).await;
    Ok(())
}

async fn handle_callback(query: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    state.telegram.answer_callback(&query).await;

    let Some(update) = callback_to_update(&query) else {
        warn!("Button press from {} without a message, ignoring", query.from.id);
        return Ok(());
    };
    deliver(&state, &update).await;
    Ok(())
}

/// Run the update through the orchestrator and send the reply.
/// Send failures are logged and dropped.
async fn deliver(state: &BotState, update: &InboundUpdate) {
    let Some(reply) = state.orchestrator.handle(update).await else {
        return;
    };
    match state.telegram.send_reply(update.chat_id, &reply).await {
        Ok(message_id) => {
            state
                .orchestrator
                .reply_sent(update.chat_id, &reply, message_id)
                .await
        }
        Err(e) => error!("Dropping reply to chat {}: {e}", update.chat_id),
    }
}
