use std::sync::atomic::Ordering;

use albertox3_core::data::{Data, Error};
use poise::serenity_prelude::{self as serenity, Ready};

pub async fn ready(ctx: &serenity::Context, ready: &Ready, data: &Data) -> Result<(), Error> {
    ctx.set_activity(Some(serenity::ActivityData::listening(format!(
        "{}help",
        data.config.prefix
    ))));

    if data.has_started.swap(true, Ordering::SeqCst) {
        tracing::info!("Reconnected as {}", ready.user.name);
        return Ok(());
    }

    tracing::info!(
        "Logged in as {} (ID:{}) in {} guild(s)",
        ready.user.name,
        ready.user.id,
        ready.guilds.len()
    );
    tracing::info!(
        "Running {} v{} with {} scale(s), {} of them enabled",
        data.config.name,
        data.config.version,
        data.scales.len(),
        data.scales.list().iter().filter(|s| s.enabled).count()
    );

    Ok(())
}
