#![warn(clippy::pedantic)]
// clippy warns for u64 -> i64 conversions despite this being totally okay in this scenario.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::unreadable_literal
)]

use albertox3_core::data::{Data, Error, FrameworkContext};
use poise::serenity_prelude::{self as serenity, FullEvent};

pub mod handlers;
use handlers::{blocking, ready};

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: FrameworkContext<'_>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot, .. } => {
            ready::ready(ctx, data_about_bot, data).await?;
        }
        FullEvent::CacheReady { guilds } => {
            tracing::info!("Cache ready for {} guild(s)", guilds.len());
        }
        FullEvent::GuildCreate {
            guild,
            is_new: Some(true),
        } => {
            tracing::info!("Joined {} (ID:{})", guild.name, guild.id);
        }
        _ => {}
    }

    blocking::dispatch(ctx, event, data).await
}
