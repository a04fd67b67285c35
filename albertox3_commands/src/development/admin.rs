use std::fmt::Write;

use albertox3_core::colors;
use albertox3_core::data::session;
use albertox3_core::models::permissions::{self, PermissionLevel};
use albertox3_core::models::settings::{self, SettingInfo};
use albertox3_core::models::{blocked, stats};
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter};
use poise::CreateReply;
use sqlx::PgPool;

use crate::utils::{admin, find_user, UserError};
use crate::{Context, Error, Scale};

/// The admin scale can't be disabled, it is the only way back.
const SELF: &str = "admin";
const DAILY_STATS_DAYS: i64 = 7;

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "development",
        name: SELF,
        commands: || {
            vec![
                block(),
                unblock(),
                scale_command(),
                setting(),
                permission(),
                stats(),
                dbstats(),
            ]
        },
        subscribe: None,
    }
}

/// Settings that can be changed at runtime.
#[must_use]
pub fn known_settings() -> [SettingInfo; 2] {
    [
        crate::moderation::automod::THRESHOLD.describe(),
        crate::events::quiz::REWARD.describe(),
    ]
}

fn find_setting(key: &str) -> Result<SettingInfo, Error> {
    known_settings()
        .into_iter()
        .find(|s| s.key == key)
        .ok_or_else(|| UserError::Assertion(format!("Unknown setting `{key}`.")).into())
}

/// Whether `value` has the same shape as the settings default.
#[must_use]
pub fn valid_setting_value(info: &SettingInfo, value: &str) -> bool {
    if info.default.parse::<i64>().is_ok() {
        value.parse::<i64>().is_ok()
    } else {
        !value.is_empty()
    }
}

fn admin_embed(title: &str) -> CreateEmbed {
    CreateEmbed::new().title(title).colour(colors::MIDNIGHTBLUE)
}

async fn say(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    ctx.send(CreateReply::default().content(text).reply(true))
        .await?;
    Ok(())
}

/// Blocks a user from commands and listeners.
#[poise::command(prefix_command, category = "Admin", check = "admin", hide_in_help)]
pub async fn block(ctx: Context<'_>, #[rest] who: String) -> Result<(), Error> {
    let Some(user) = find_user(ctx, &who).await else {
        return Err(UserError::Assertion(format!("Unable to find `{who}`.")).into());
    };
    if ctx.data().config.is_author(user.id.get()) {
        return Err(UserError::Assertion("The author can't be blocked.".to_owned()).into());
    }

    let changed = {
        let mut session = session(&ctx).await?;
        blocked::block(&mut session, user.id).await?
    };

    if changed {
        say(ctx, format!("Blocked {}.", user.tag())).await
    } else {
        say(ctx, format!("{} is already blocked.", user.tag())).await
    }
}

#[poise::command(prefix_command, category = "Admin", check = "admin", hide_in_help)]
pub async fn unblock(ctx: Context<'_>, #[rest] who: String) -> Result<(), Error> {
    let Some(user) = find_user(ctx, &who).await else {
        return Err(UserError::Assertion(format!("Unable to find `{who}`.")).into());
    };

    let changed = {
        let mut session = session(&ctx).await?;
        blocked::unblock(&mut session, user.id).await?
    };

    if changed {
        say(ctx, format!("Unblocked {}.", user.tag())).await
    } else {
        say(ctx, format!("{} isn't blocked.", user.tag())).await
    }
}

#[poise::command(
    prefix_command,
    rename = "scale",
    category = "Admin",
    subcommands("scale_list", "scale_enable", "scale_disable"),
    check = "admin",
    hide_in_help
)]
pub async fn scale_command(ctx: Context<'_>) -> Result<(), Error> {
    scale_list_inner(ctx).await
}

#[poise::command(prefix_command, rename = "list", check = "admin", hide_in_help)]
pub async fn scale_list(ctx: Context<'_>) -> Result<(), Error> {
    scale_list_inner(ctx).await
}

async fn scale_list_inner(ctx: Context<'_>) -> Result<(), Error> {
    let mut description = String::new();
    for scale in ctx.data().scales.list() {
        let state = if scale.enabled { "enabled" } else { "disabled" };
        writeln!(description, "`{}/{}` {state}", scale.category, scale.name)?;
    }

    ctx.send(CreateReply::default().embed(admin_embed("Scales").description(description)))
        .await?;
    Ok(())
}

#[poise::command(prefix_command, rename = "enable", check = "admin", hide_in_help)]
pub async fn scale_enable(ctx: Context<'_>, name: String) -> Result<(), Error> {
    toggle_scale(ctx, &name, true).await
}

#[poise::command(prefix_command, rename = "disable", check = "admin", hide_in_help)]
pub async fn scale_disable(ctx: Context<'_>, name: String) -> Result<(), Error> {
    if name == SELF {
        return Err(UserError::Assertion(format!("The `{SELF}` scale can't be disabled.")).into());
    }
    toggle_scale(ctx, &name, false).await
}

async fn toggle_scale(ctx: Context<'_>, name: &str, enabled: bool) -> Result<(), Error> {
    let changed = ctx
        .data()
        .scales
        .set_enabled(name, enabled)
        .map_err(|e| UserError::Assertion(e.to_string()))?;

    let state = if enabled { "enabled" } else { "disabled" };
    if changed {
        tracing::info!("{} {state} the scale {name}", ctx.author().name);
        say(ctx, format!("The scale `{name}` is now {state}.")).await
    } else {
        say(ctx, format!("The scale `{name}` is already {state}.")).await
    }
}

#[poise::command(
    prefix_command,
    category = "Admin",
    subcommands("setting_get", "setting_set", "setting_reset"),
    check = "admin",
    hide_in_help
)]
pub async fn setting(ctx: Context<'_>) -> Result<(), Error> {
    let mut description = String::new();
    {
        let mut session = session(&ctx).await?;
        for info in known_settings() {
            let value = settings::get_raw(
                &ctx.data().database,
                session.conn()?,
                &info.key,
                &info.default,
            )
            .await?;
            writeln!(description, "`{}` = `{value}` (default `{}`)", info.key, info.default)?;
        }
    }

    ctx.send(CreateReply::default().embed(admin_embed("Settings").description(description)))
        .await?;
    Ok(())
}

#[poise::command(prefix_command, rename = "get", check = "admin", hide_in_help)]
pub async fn setting_get(ctx: Context<'_>, key: String) -> Result<(), Error> {
    let info = find_setting(&key)?;
    let value = {
        let mut session = session(&ctx).await?;
        settings::get_raw(&ctx.data().database, session.conn()?, &info.key, &info.default).await?
    };

    say(ctx, format!("`{key}` = `{value}`")).await
}

#[poise::command(prefix_command, rename = "set", check = "admin", hide_in_help)]
pub async fn setting_set(ctx: Context<'_>, key: String, value: String) -> Result<(), Error> {
    let info = find_setting(&key)?;
    if !valid_setting_value(&info, &value) {
        return Err(UserError::Assertion(format!("`{value}` isn't valid for `{key}`.")).into());
    }

    {
        let mut session = session(&ctx).await?;
        settings::set_raw(&mut session, &info.key, &value).await?;
    }

    tracing::info!("{} set {key} to {value}", ctx.author().name);
    say(ctx, format!("`{key}` = `{value}`")).await
}

#[poise::command(prefix_command, rename = "reset", check = "admin", hide_in_help)]
pub async fn setting_reset(ctx: Context<'_>, key: String) -> Result<(), Error> {
    let info = find_setting(&key)?;
    {
        let mut session = session(&ctx).await?;
        settings::set_raw(&mut session, &info.key, &info.default).await?;
    }

    say(ctx, format!("`{key}` = `{}`", info.default)).await
}

#[poise::command(
    prefix_command,
    category = "Admin",
    subcommands("permission_get", "permission_set"),
    check = "admin",
    hide_in_help
)]
pub async fn permission(ctx: Context<'_>) -> Result<(), Error> {
    let stored = {
        let mut session = session(&ctx).await?;
        permissions::all(session.conn()?).await?
    };

    let mut description = String::new();
    for (name, level) in &stored {
        writeln!(description, "`{name}` {level}")?;
    }
    if description.is_empty() {
        description.push_str("No permissions stored yet.");
    }

    ctx.send(CreateReply::default().embed(admin_embed("Permissions").description(description)))
        .await?;
    Ok(())
}

#[poise::command(prefix_command, rename = "get", check = "admin", hide_in_help)]
pub async fn permission_get(ctx: Context<'_>, name: String) -> Result<(), Error> {
    let stored = {
        let mut session = session(&ctx).await?;
        permissions::all(session.conn()?).await?
    };

    match stored.into_iter().find(|(n, _)| *n == name) {
        Some((_, level)) => say(ctx, format!("`{name}` requires {level}")).await,
        None => say(ctx, format!("`{name}` wasn't used yet.")).await,
    }
}

#[poise::command(prefix_command, rename = "set", check = "admin", hide_in_help)]
pub async fn permission_set(ctx: Context<'_>, name: String, level: String) -> Result<(), Error> {
    let level: PermissionLevel = level
        .parse()
        .map_err(|e: permissions::UnknownLevel| UserError::Assertion(e.to_string()))?;

    {
        let mut session = session(&ctx).await?;
        permissions::set(&mut session, &name, level).await?;
    }

    tracing::info!("{} set the permission {name} to {level}", ctx.author().name);
    say(ctx, format!("`{name}` requires {level}")).await
}

/// Command counters and the daily totals.
#[poise::command(prefix_command, category = "Admin", check = "admin", hide_in_help)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let (counters, daily) = {
        let mut session = session(&ctx).await?;
        let conn = session.conn()?;
        let counters = stats::all(&mut *conn).await?;
        (counters, stats::daily(conn, DAILY_STATS_DAYS).await?)
    };

    let mut commands = String::new();
    for (name, value) in counters.iter().take(20) {
        writeln!(commands, "`{name}` {value}")?;
    }
    let mut days = String::new();
    for day in &daily {
        writeln!(days, "**{}** {} events, {} commands", day.day, day.events, day.commands)?;
    }

    let embed = admin_embed("Stats")
        .field("Commands", or_none(commands), true)
        .field("Days", or_none(days), true);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn or_none(text: String) -> String {
    if text.is_empty() {
        "/".to_owned()
    } else {
        text
    }
}

/// Tables of every scale group, in the order they are shown.
const TABLE_GROUPS: [(&str, &[&str]); 4] = [
    ("Core", &["settings", "permissions", "stats", "daily_stats", "blocked_user"]),
    ("Social", &["money", "item", "inventory"]),
    ("Moderation", &["kick", "bad_words", "scam_links"]),
    ("Miscellaneous", &["quiz_yesno", "quiz_quad", "activity"]),
];

#[derive(Clone, Debug, PartialEq, Eq)]
struct TableStats {
    name: String,
    /// Estimated by the statistics collector.
    rows: i64,
    bytes: i64,
}

/// Row estimate and size of every table, in one round trip.
async fn table_stats(db: &PgPool) -> Result<Vec<TableStats>, sqlx::Error> {
    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT relname::TEXT, n_live_tup, pg_total_relation_size(relid) FROM pg_stat_user_tables",
    )
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, rows, bytes)| TableStats { name, rows, bytes })
        .collect())
}

fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// One line per table, tables that don't exist yet are shown as missing.
fn describe_tables(stats: &[TableStats], tables: &[&str]) -> String {
    let mut text = String::new();
    for table in tables {
        let _ = match stats.iter().find(|s| s.name == *table) {
            Some(s) => writeln!(text, "`{table}` ~{} rows, {}", s.rows, format_size(s.bytes)),
            None => writeln!(text, "`{table}` missing"),
        };
    }
    text
}

#[poise::command(
    prefix_command,
    aliases("db-stats", "db-info"),
    category = "Admin",
    check = "admin",
    hide_in_help
)]
pub async fn dbstats(ctx: Context<'_>) -> Result<(), Error> {
    let db = &ctx.data().database.db;
    let (stats, size) = tokio::try_join!(
        table_stats(db),
        sqlx::query_scalar::<_, i64>("SELECT pg_database_size(current_database())").fetch_one(db),
    )?;

    let embed = TABLE_GROUPS
        .iter()
        .fold(admin_embed("Database Stats"), |embed, (group, tables)| {
            embed.field(*group, describe_tables(&stats, tables), false)
        })
        .footer(CreateEmbedFooter::new(format!("Database size: {}", format_size(size))));
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_are_unique() {
        let settings = known_settings();
        assert_eq!(settings[0].key, "automod:threshold");
        assert_ne!(settings[0].key, settings[1].key);
    }

    #[test]
    fn setting_values_keep_their_shape() {
        let info = SettingInfo {
            key: "quiz:reward".into(),
            default: "10".into(),
        };
        assert!(valid_setting_value(&info, "25"));
        assert!(valid_setting_value(&info, "-3"));
        assert!(!valid_setting_value(&info, "ten"));
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(8 * 1024 * 1024), "8.0 MiB");
    }

    #[test]
    fn every_table_is_listed() {
        let stats = vec![TableStats {
            name: "money".into(),
            rows: 42,
            bytes: 16384,
        }];
        assert_eq!(
            describe_tables(&stats, &["money", "item"]),
            "`money` ~42 rows, 16.0 KiB\n`item` missing\n"
        );

        let mut tables: Vec<&str> = TABLE_GROUPS.iter().flat_map(|(_, t)| t.iter().copied()).collect();
        let count = tables.len();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), count);
    }
}
