#![warn(clippy::pedantic)]
#![allow(clippy::unreadable_literal)]

mod error;

use std::sync::Arc;
use std::time::Duration;

use albertox3_core::config::{Config, Environment};
use albertox3_core::data::{Data, Database};
use albertox3_core::translations::Translations;
use poise::serenity_prelude as serenity;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), albertox3_core::data::Error> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env loaded: {e}");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let env = Environment::from_env()?;
    let config = Config::load(&env.config_path)?;
    tracing::info!("Starting {} v{}", config.name, config.version);

    let translations = Translations::new(&config.language);
    let namespaces = translations.load_folder(&config.scales_folder)?;
    tracing::info!("Loaded {namespaces} translation namespaces");

    let database = Database::connect(&env).await?;
    database.migrate().await?;

    let data = Data::new(config, database, translations);
    albertox3_commands::register(&data);
    albertox3_commands::setup(&data).await?;

    let prefix = data.config.prefix.clone();
    let options = poise::FrameworkOptions {
        commands: albertox3_commands::commands(),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(prefix),
            edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                Duration::from_secs(600),
            ))),
            ..Default::default()
        },

        on_error: |error| Box::pin(error::handler(error)),

        command_check: Some(|ctx| Box::pin(albertox3_commands::command_check(ctx))),
        pre_command: |ctx| Box::pin(albertox3_commands::pre_command(ctx)),
        post_command: |ctx| Box::pin(albertox3_commands::post_command(ctx)),

        event_handler: |ctx, event, framework, data| {
            Box::pin(albertox3_events::event_handler(ctx, event, framework, data))
        },

        skip_checks_for_owners: false,
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .options(options)
        .setup(|_, _, _| Box::pin(async move { Ok(data) }))
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_PRESENCES;

    let mut settings = serenity::cache::Settings::default();
    settings.max_messages = 1000;

    let mut client = serenity::ClientBuilder::new(&env.token, intents)
        .framework(framework)
        .cache_settings(settings)
        .await?;

    client.start().await?;
    Ok(())
}
