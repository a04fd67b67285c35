#![warn(clippy::pedantic)]
// clippy warns for u64 -> i64 conversions despite this being totally okay in this scenario.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::unreadable_literal,
    clippy::too_many_lines
)]

pub mod development;
pub mod events;
pub mod information;
pub mod misc;
pub mod moderation;
pub mod social;
pub mod utils;

pub use albertox3_core::data::{Command, Context, Data, Error, PrefixContext};

use albertox3_core::data::Session;
use albertox3_core::listener::Listeners;
use albertox3_core::models::stats;

use utils::CheckError;

/// A pluggable group of commands and listeners.
pub struct Scale {
    pub category: &'static str,
    pub name: &'static str,
    pub commands: fn() -> Vec<Command>,
    pub subscribe: Option<fn(&Listeners)>,
}

#[must_use]
pub fn scales() -> [Scale; 11] {
    [
        social::money::scale(),
        social::inventory::scale(),
        moderation::kick::scale(),
        moderation::automod::scale(),
        events::quiz::scale(),
        information::activity::scale(),
        information::about::scale(),
        misc::profile::scale(),
        misc::leet::scale(),
        development::debug::scale(),
        development::admin::scale(),
    ]
}

struct ScaleTag(&'static str);

fn tag(command: &mut Command, scale: &'static str) {
    command.custom_data = Box::new(ScaleTag(scale));
    for subcommand in &mut command.subcommands {
        tag(subcommand, scale);
    }
}

/// Name of the scale a command belongs to.
#[must_use]
pub fn scale_of(command: &Command) -> Option<&'static str> {
    command
        .custom_data
        .downcast_ref::<ScaleTag>()
        .map(|tag| tag.0)
}

/// Every command of every scale, tagged with the scale it belongs to.
#[must_use]
pub fn commands() -> Vec<Command> {
    scales()
        .iter()
        .flat_map(|scale| {
            (scale.commands)().into_iter().map(move |mut command| {
                tag(&mut command, scale.name);
                command
            })
        })
        .collect()
}

/// Registers every scale and subscribes its listeners.
pub fn register(data: &Data) {
    for scale in scales() {
        data.scales
            .register(scale.category, scale.name, &data.config.disabled_scales);
        if let Some(subscribe) = scale.subscribe {
            subscribe(&data.listeners);
        }
    }
}

/// Startup work of the scales that has to happen before the client connects.
pub async fn setup(data: &Data) -> Result<(), Error> {
    social::inventory::create_all_items(data).await?;
    moderation::automod::sync_lists(data).await?;
    misc::profile::create_all_flags(data).await?;
    Ok(())
}

pub async fn command_check(ctx: Context<'_>) -> Result<bool, Error> {
    if utils::is_blocked(ctx).await? {
        tracing::debug!("Ignoring command of blocked user {}", ctx.author().id);
        return Ok(false);
    }

    if let Some(scale) = scale_of(ctx.command()) {
        if !ctx.data().scales.is_enabled(scale) {
            return Err(CheckError::ScaleDisabled(scale).into());
        }
    }

    Ok(true)
}

fn stats_name(ctx: Context<'_>) -> String {
    let command = ctx.command();
    format!(
        "{}:{}",
        scale_of(command).unwrap_or("bot"),
        command.qualified_name.replace(' ', "_")
    )
}

/// Opens the session of the invocation and counts it.
pub async fn pre_command(ctx: Context<'_>) {
    let name = stats_name(ctx);
    tracing::info!("{} ran {}", ctx.author().name, ctx.command().qualified_name);

    let mut session = match ctx.data().database.session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to open a session for {name}: {e}");
            return;
        }
    };

    if let Err(e) = count_invocation(&mut session, &name).await {
        tracing::warn!("Failed to count the invocation of {name}: {e}");
    }
    ctx.set_invocation_data(session).await;
}

async fn count_invocation(session: &mut Session, name: &str) -> Result<(), Error> {
    stats::incr(session.conn()?, name, 1).await?;
    stats::incr_commands(session.conn()?).await?;
    Ok(())
}

pub async fn post_command(ctx: Context<'_>) {
    if let Err(e) = commit_session(ctx).await {
        tracing::error!("Failed to commit the session of {}: {e}", ctx.command().qualified_name);
    }
}

/// Commits whatever the invocation wrote, also used when the command failed.
pub async fn commit_session(ctx: Context<'_>) -> Result<(), Error> {
    if let Some(mut session) = ctx.invocation_data::<Session>().await {
        session.commit().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_is_tagged() {
        fn check(command: &Command) {
            assert!(scale_of(command).is_some(), "{}", command.qualified_name);
            command.subcommands.iter().for_each(check);
        }

        let commands = commands();
        assert!(!commands.is_empty());
        commands.iter().for_each(check);
    }

    #[test]
    fn scale_names_are_unique() {
        let mut names: Vec<_> = scales().iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), scales().len());
    }
}
