use std::time::Duration;

use albertox3_core::colors;
use poise::serenity_prelude::CreateEmbed;
use poise::CreateReply;

use crate::utils::owner;
use crate::{Context, Error, Scale};

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "development",
        name: "debug",
        commands: || vec![debug()],
        subscribe: None,
    }
}

/// Owners only, limited to the debug guild when one is configured.
async fn can_debug(ctx: Context<'_>) -> Result<bool, Error> {
    if let Some(guild) = ctx.data().config.debug_guild {
        if ctx.guild_id().map(|id| id.get()) != Some(guild) {
            return Ok(false);
        }
    }
    owner(ctx).await
}

fn debug_embed(title: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("Debug: {title}"))
        .colour(colors::MAX_CONCURRENCY)
}

/// Formats a duration as `1d 2h 3m 4s`, leading zero units are skipped.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let units = [
        (secs / 86400, "d"),
        (secs / 3600 % 24, "h"),
        (secs / 60 % 60, "m"),
        (secs % 60, "s"),
    ];

    let parts: Vec<String> = units
        .iter()
        .skip_while(|(value, unit)| *value == 0 && *unit != "s")
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();
    parts.join(" ")
}

#[poise::command(
    prefix_command,
    category = "Development",
    subcommands("config", "info"),
    check = "can_debug",
    hide_in_help
)]
pub async fn debug(ctx: Context<'_>) -> Result<(), Error> {
    info_inner(ctx).await
}

/// Dumps the loaded config.
#[poise::command(prefix_command, check = "can_debug", hide_in_help)]
pub async fn config(ctx: Context<'_>) -> Result<(), Error> {
    let embed = debug_embed("Config").description(format!(
        "```ini\n{}```",
        ctx.data().config.describe()
    ));
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Uptime, version and loaded scales.
#[poise::command(prefix_command, check = "can_debug", hide_in_help)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    info_inner(ctx).await
}

async fn info_inner(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let scales = data.scales.list();
    let enabled = scales.iter().filter(|s| s.enabled).count();

    let embed = debug_embed("Info")
        .field("Version", &data.config.version, true)
        .field("Uptime", format_uptime(data.time_started.elapsed()), true)
        .field("Scales", format!("{enabled}/{} enabled", scales.len()), true)
        .field("Commands", ctx.framework().options().commands.len().to_string(), true)
        .field("Guilds", ctx.cache().guild_count().to_string(), true);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(Duration::ZERO), "0s");
        assert_eq!(format_uptime(Duration::from_secs(59)), "59s");
        assert_eq!(format_uptime(Duration::from_secs(3600)), "1h 0m 0s");
        assert_eq!(format_uptime(Duration::from_secs(90061)), "1d 1h 1m 1s");
    }
}
