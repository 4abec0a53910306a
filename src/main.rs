use std::{env, sync::Arc};

use dastardly_automod::config::{BotConfig, OracleConfig};
use dastardly_automod::moderation::{
    AuditStore, JsonlAuditStore, MemoryAuditStore, Monitor, MonitorParts, MonitorStats, Oracle,
};
use dastardly_automod::{BOT_NAME, Data, Error, commands, discord, handlers, logging};
use poise::serenity_prelude::{self as serenity};
use serenity::GatewayIntents;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[cfg(feature = "llm")]
fn build_oracle(config: &OracleConfig) -> Result<Arc<dyn Oracle>, Error> {
    let oracle = dastardly_automod::moderation::OpenAiOracle::new(config)?;
    Ok(Arc::new(oracle))
}

#[cfg(not(feature = "llm"))]
fn build_oracle(_config: &OracleConfig) -> Result<Arc<dyn Oracle>, Error> {
    tracing::warn!("Built without the llm feature, every message will be left alone");
    Ok(Arc::new(dastardly_automod::moderation::StaticOracle))
}

fn build_audit_store(config: &BotConfig) -> Arc<dyn AuditStore> {
    match &config.audit.path {
        Some(path) => {
            info!("Writing audit records to {path}");
            Arc::new(JsonlAuditStore::new(path))
        }
        None => {
            info!("No audit path configured, keeping audit records in memory");
            Arc::new(MemoryAuditStore::new())
        }
    }
}

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    logging::init()?;

    let config = BotConfig::load(BotConfig::path_from_env()).await?;
    let token = env::var("DISCORD_TOKEN").map_err(|_| "DISCORD_TOKEN must be set")?;

    // The moderation backends talk to Discord over their own HTTP client so the
    // monitor can exist before the gateway client does
    let http = Arc::new(serenity::Http::new(&token));
    let stats = Arc::new(MonitorStats::new());
    let monitor = Monitor::new(
        config.moderation.clone(),
        MonitorParts {
            oracle: build_oracle(&config.oracle)?,
            enforcement: Arc::new(discord::DiscordEnforcement::new(Arc::clone(&http))),
            identity: Arc::new(discord::DiscordIdentity::new(Arc::clone(&http))),
            chat: Arc::new(discord::DiscordChat::new(Arc::clone(&http))),
            audit: build_audit_store(&config),
            metrics: stats.clone(),
        },
    );
    let intake = monitor.intake();
    let data = Data::new(config, monitor.inspector(), stats);

    let cancel = CancellationToken::new();
    let monitor_task = tokio::spawn(monitor.run(cancel.clone()));

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::automod()],
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx);
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx);
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_command_error(&error);
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                logging::log_console(format!("Registering {BOT_NAME} commands"));
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .event_handler(handlers::Handler::new(intake))
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
            return;
        }
        info!("Shutting down");
        shutdown.cancel();
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot...");
    let result = client.start().await;
    cancel.cancel();
    if let Err(e) = monitor_task.await {
        error!("Moderation monitor task failed: {e}");
    }

    result.map_err(Into::into)
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(async_main()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
