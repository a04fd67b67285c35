//! Scores messages by listed bad words and scam links and deletes the ones above the threshold.

use std::fmt::Write;
use std::sync::Arc;

use albertox3_core::colors;
use albertox3_core::data::{session, Data, Error, Session};
use albertox3_core::listener::{Listeners, Subscriber};
use albertox3_core::models::automod::{self, ListEntry, ListKind, Score};
use albertox3_core::models::permissions::PermissionLevel;
use albertox3_core::models::settings::Setting;
use albertox3_core::translations::{Args, Translator};
use poise::serenity_prelude::{
    self as serenity, ChannelId, CreateEmbed, CreateMessage, FullEvent, GuildId, MessageId, User,
};

use crate::utils::{embed, ensure, reply_embed, require_level, translator};
use crate::{Context, Scale};

pub const COLOUR: u32 = colors::WETASPHALT;
pub const DELETED: u32 = colors::ALIZARIN;

pub const THRESHOLD: Setting<i32> = Setting::new("automod", "threshold", 10);

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "moderation",
        name: "automod",
        commands: || vec![automod()],
        subscribe: Some(subscribe),
    }
}

fn subscribe(listeners: &Listeners) {
    let filter: Arc<dyn Subscriber> = Arc::new(MessageFilter);
    listeners.event.subscribe(Arc::clone(&filter));
    listeners.blocked_message_create.subscribe(Arc::clone(&filter));
    listeners.blocked_message_update.subscribe(filter);
}

/// Syncs the configured csv files into the database and loads both lists.
pub async fn sync_lists(data: &Data) -> Result<(), Error> {
    let files = [
        (ListKind::BadWords, data.config.automod.bad_words.as_ref()),
        (ListKind::ScamLinks, data.config.automod.scam_links.as_ref()),
    ];

    let mut session = data.database.session().await?;
    for (kind, path) in files {
        if let Some(path) = path {
            match tokio::fs::read_to_string(path).await {
                Ok(text) => {
                    let entries = automod::parse_csv(&text, kind)?;
                    let added = automod::sync(session.conn()?, kind, &entries).await?;
                    tracing::info!("Synced {} ({added} new) from {}", kind_name(kind), path.display());
                }
                Err(e) => tracing::warn!("Failed to read {}: {e}", path.display()),
            }
        }

        let entries = automod::entries(session.conn()?, kind).await?;
        data.automod
            .replace(kind, entries.into_iter().map(|e| (e.value, e.weight)));
    }
    session.commit().await?;

    Ok(())
}

fn kind_name(kind: ListKind) -> &'static str {
    match kind {
        ListKind::BadWords => "bad words",
        ListKind::ScamLinks => "scam links",
    }
}

struct MessageFilter;

struct Inspected<'a> {
    guild_id: GuildId,
    channel_id: ChannelId,
    message_id: MessageId,
    author: &'a User,
    content: &'a str,
}

fn inspect(event: &FullEvent) -> Option<Inspected<'_>> {
    match event {
        FullEvent::Message { new_message } => Some(Inspected {
            guild_id: new_message.guild_id?,
            channel_id: new_message.channel_id,
            message_id: new_message.id,
            author: &new_message.author,
            content: &new_message.content,
        }),
        FullEvent::MessageUpdate { event, .. } => Some(Inspected {
            guild_id: event.guild_id?,
            channel_id: event.channel_id,
            message_id: event.id,
            author: event.author.as_ref()?,
            content: event.content.as_deref()?,
        }),
        _ => None,
    }
}

#[serenity::async_trait]
impl Subscriber for MessageFilter {
    fn scale(&self) -> &'static str {
        "automod"
    }

    async fn receive(
        &self,
        ctx: &serenity::Context,
        data: &Data,
        session: &mut Session,
        event: &FullEvent,
    ) -> Result<(), Error> {
        let Some(message) = inspect(event) else {
            return Ok(());
        };
        if message.author.bot || message.author.id == ctx.cache.current_user().id {
            return Ok(());
        }

        let score = data.automod.score(message.content);
        let total = score.total();
        if total == 0 {
            return Ok(());
        }

        let threshold = THRESHOLD.get(&data.database, session.conn()?).await?;
        if total < i64::from(threshold) {
            return Ok(());
        }

        tracing::info!(
            "Deleting message {} of {} in {} (score {total}/{threshold})",
            message.message_id,
            message.author.name,
            message.channel_id
        );
        message
            .channel_id
            .delete_message(ctx, message.message_id)
            .await?;

        let locale = ctx
            .cache
            .guild(message.guild_id)
            .map(|g| g.preferred_locale.clone());
        let t = data.translator(locale.as_deref(), "automod");
        let warning = CreateEmbed::new()
            .colour(DELETED)
            .timestamp(serenity::Timestamp::now())
            .description(t.format(
                "deleted",
                &Args::new()
                    .with("user", format!("<@{}>", message.author.id))
                    .with("reasons", reasons(&score)),
            )?);
        message
            .channel_id
            .send_message(ctx, CreateMessage::new().embed(warning))
            .await?;

        Ok(())
    }
}

fn reasons(score: &Score) -> String {
    score
        .words
        .iter()
        .chain(&score.links)
        .map(|(value, weight)| format!("`{value}` ({weight})"))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn can_moderate(ctx: Context<'_>) -> Result<bool, Error> {
    require_level(ctx, "automod:manage", PermissionLevel::Moderator).await
}

/// Manages the automatic moderation.
#[poise::command(
    prefix_command,
    category = "Moderation",
    subcommands("check", "badword", "scamlink", "threshold"),
    subcommand_required
)]
pub async fn automod(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Shows how a text would be scored.
#[poise::command(prefix_command, category = "Moderation")]
pub async fn check(ctx: Context<'_>, #[rest] text: String) -> Result<(), Error> {
    let threshold = {
        let mut session = session(&ctx).await?;
        THRESHOLD.get(&ctx.data().database, session.conn()?).await?
    };

    let score = ctx.data().automod.score(&text);
    let t = translator(ctx, "automod");
    let key = if score.total() >= i64::from(threshold) {
        "check.delete"
    } else {
        "check.keep"
    };

    let mut description = t.format(
        key,
        &Args::new()
            .with("score", score.total())
            .with("threshold", threshold),
    )?;
    if !score.words.is_empty() || !score.links.is_empty() {
        write!(description, "\n{}", reasons(&score))?;
    }

    reply_embed(ctx, embed(ctx, COLOUR)?.description(description)).await
}

#[poise::command(
    prefix_command,
    category = "Moderation",
    subcommands("badword_add", "badword_remove", "badword_list"),
    subcommand_required
)]
pub async fn badword(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

#[poise::command(
    prefix_command,
    category = "Moderation",
    subcommands("scamlink_add", "scamlink_remove", "scamlink_list"),
    subcommand_required
)]
pub async fn scamlink(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Adds a bad word with its weight.
#[poise::command(prefix_command, rename = "add", check = "can_moderate")]
pub async fn badword_add(
    ctx: Context<'_>,
    word: String,
    weight: i32,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    add_entry(ctx, ListKind::BadWords, word, weight, reason).await
}

/// Removes a bad word.
#[poise::command(prefix_command, rename = "remove", check = "can_moderate")]
pub async fn badword_remove(ctx: Context<'_>, word: String) -> Result<(), Error> {
    remove_entry(ctx, ListKind::BadWords, &word).await
}

/// Lists every bad word.
#[poise::command(prefix_command, rename = "list", check = "can_moderate")]
pub async fn badword_list(ctx: Context<'_>) -> Result<(), Error> {
    list_entries(ctx, ListKind::BadWords).await
}

/// Adds a scam link with its weight.
#[poise::command(prefix_command, rename = "add", check = "can_moderate")]
pub async fn scamlink_add(
    ctx: Context<'_>,
    link: String,
    weight: i32,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    add_entry(ctx, ListKind::ScamLinks, link, weight, reason).await
}

/// Removes a scam link.
#[poise::command(prefix_command, rename = "remove", check = "can_moderate")]
pub async fn scamlink_remove(ctx: Context<'_>, link: String) -> Result<(), Error> {
    remove_entry(ctx, ListKind::ScamLinks, &link).await
}

/// Lists every scam link.
#[poise::command(prefix_command, rename = "list", check = "can_moderate")]
pub async fn scamlink_list(ctx: Context<'_>) -> Result<(), Error> {
    list_entries(ctx, ListKind::ScamLinks).await
}

fn list_key(kind: ListKind, key: &str) -> String {
    match kind {
        ListKind::BadWords => format!("badword.{key}"),
        ListKind::ScamLinks => format!("scamlink.{key}"),
    }
}

async fn add_entry(
    ctx: Context<'_>,
    kind: ListKind,
    value: String,
    weight: i32,
    reason: Option<String>,
) -> Result<(), Error> {
    let t = translator(ctx, "automod");
    let g = translator(ctx, "g");
    let entry = ListEntry {
        value: kind.normalise(&value),
        weight,
        reason: match reason {
            Some(reason) => reason,
            None => g.text("no_reason")?,
        },
    };
    ensure(!entry.value.is_empty(), || Ok(t.text("empty")?))?;

    let added = {
        let mut session = session(&ctx).await?;
        automod::add(session.conn()?, kind, &entry).await?
    };
    ensure(added, || {
        Ok(t.format(&list_key(kind, "exists"), &Args::new().with("value", &entry.value))?)
    })?;
    ctx.data().automod.insert(kind, entry.value.clone(), entry.weight);

    let description = t.format(
        &list_key(kind, "added"),
        &Args::new()
            .with("value", &entry.value)
            .with("weight", entry.weight),
    )?;
    reply_embed(ctx, embed(ctx, COLOUR)?.description(description)).await
}

async fn remove_entry(ctx: Context<'_>, kind: ListKind, value: &str) -> Result<(), Error> {
    let t = translator(ctx, "automod");
    let value = kind.normalise(value);

    let removed = {
        let mut session = session(&ctx).await?;
        automod::remove(session.conn()?, kind, &value).await?
    };
    ensure(removed, || {
        Ok(t.format(&list_key(kind, "missing"), &Args::new().with("value", &value))?)
    })?;
    ctx.data().automod.remove(kind, &value);

    let description = t.format(&list_key(kind, "removed"), &Args::new().with("value", &value))?;
    reply_embed(ctx, embed(ctx, COLOUR)?.description(description)).await
}

async fn list_entries(ctx: Context<'_>, kind: ListKind) -> Result<(), Error> {
    let entries = {
        let mut session = session(&ctx).await?;
        automod::entries(session.conn()?, kind).await?
    };

    let t = translator(ctx, "automod");
    let description = if entries.is_empty() {
        t.text(&list_key(kind, "none"))?
    } else {
        format_entries(&t, &entries)?
    };

    let embed = embed(ctx, COLOUR)?
        .title(t.plural(&list_key(kind, "title"), entries.len() as i64, &Args::new())?)
        .description(description);
    reply_embed(ctx, embed).await
}

fn format_entries(t: &Translator<'_>, entries: &[automod::StoredEntry]) -> Result<String, Error> {
    // embed descriptions are limited to 4096 characters
    const LIMIT: usize = 4000;

    let mut out = String::new();
    for entry in entries {
        let line = t.format(
            "entry",
            &Args::new()
                .with("value", &entry.value)
                .with("weight", entry.weight)
                .with("reason", &entry.reason),
        )?;
        if out.len() + line.len() > LIMIT {
            out.push('…');
            break;
        }
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Shows or changes the score at which messages are deleted.
#[poise::command(prefix_command, category = "Moderation", check = "can_moderate")]
pub async fn threshold(ctx: Context<'_>, value: Option<i32>) -> Result<(), Error> {
    let t = translator(ctx, "automod");

    let current = {
        let mut session = session(&ctx).await?;
        let db = &ctx.data().database;
        match value {
            Some(value) => {
                ensure(value > 0, || Ok(t.text("threshold.invalid")?))?;
                THRESHOLD.set(&mut session, &value).await?;
                value
            }
            None => THRESHOLD.get(db, session.conn()?).await?,
        }
    };

    let key = if value.is_some() {
        "threshold.set"
    } else {
        "threshold.get"
    };
    let description = t.format(key, &Args::new().with("threshold", current))?;
    reply_embed(ctx, embed(ctx, COLOUR)?.description(description)).await
}
