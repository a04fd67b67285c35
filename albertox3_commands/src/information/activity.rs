use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use albertox3_core::colors;
use albertox3_core::data::{session, Data, Error, Session};
use albertox3_core::emojis;
use albertox3_core::listener::{Listeners, Subscriber};
use albertox3_core::models::activity;
use albertox3_core::models::permissions::PermissionLevel;
use albertox3_core::translations::{Args, Translator};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex;
use poise::serenity_prelude::{
    self as serenity, ChannelId, ChannelType, CreateEmbed, FullEvent, GetMessages, GuildId,
    MessageId, UserId,
};
use poise::{CreateReply, ReplyHandle};

use crate::utils::{embed, find_user, reply_embed, require_level, translator, UserError};
use crate::{commit_session, Context, Scale};

pub const COLOUR: u32 = colors::GREENSEA;

const SECONDS_PER_DAY: i64 = 86400;
const PARALLEL_CHANNELS: usize = 15;
const PARALLEL_MEMBERS: usize = 5;

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "information",
        name: "activity",
        commands: || vec![scan_activity(), activity()],
        subscribe: Some(subscribe),
    }
}

fn subscribe(listeners: &Listeners) {
    listeners.event.subscribe(Arc::new(ActivityTracker));
}

struct ActivityTracker;

#[serenity::async_trait]
impl Subscriber for ActivityTracker {
    fn scale(&self) -> &'static str {
        "activity"
    }

    async fn receive(
        &self,
        _: &serenity::Context,
        _: &Data,
        session: &mut Session,
        event: &FullEvent,
    ) -> Result<(), Error> {
        let FullEvent::Message { new_message } = event else {
            return Ok(());
        };
        if new_message.guild_id.is_none() || new_message.author.bot {
            return Ok(());
        }

        if let Some(timestamp) = activity::from_unix(new_message.timestamp.unix_timestamp()) {
            activity::update(session.conn()?, new_message.author.id, timestamp).await?;
        }
        Ok(())
    }
}

/// Oldest timestamp a scan of `days` days reaches, `None` if it doesn't fit.
fn cutoff(now: i64, days: i64) -> Option<i64> {
    if days < 0 {
        return None;
    }
    days.checked_mul(SECONDS_PER_DAY)
        .and_then(|seconds| now.checked_sub(seconds))
}

/// Whole days between two unix timestamps.
fn days_between(from: i64, to: i64) -> i64 {
    (to - from).max(0) / SECONDS_PER_DAY
}

async fn can_scan(ctx: Context<'_>) -> Result<bool, Error> {
    require_level(ctx, "activity:scan", PermissionLevel::Admin).await
}

/// Removes the guild from the running scans once dropped.
struct ScanGuard<'a> {
    data: &'a Data,
    guild_id: GuildId,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.data.activity_scans.remove(&self.guild_id);
    }
}

struct ScanState {
    /// Latest message of every author.
    members: Mutex<HashMap<UserId, i64>>,
    /// Channels currently scanned, with the age in days of the oldest message seen.
    active: DashMap<ChannelId, i64>,
    completed: Mutex<usize>,
}

/// Scans the message history of every readable text channel and records the last activity.
#[poise::command(
    prefix_command,
    rename = "scan-activity",
    category = "Information",
    guild_only,
    check = "can_scan"
)]
pub async fn scan_activity(ctx: Context<'_>, days: Option<i64>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let t = translator(ctx, "activity");

    if !data.activity_scans.insert(guild_id) {
        let embed = embed(ctx, colors::MAX_CONCURRENCY)?.description(t.text("already_scanning")?);
        return reply_embed(ctx, embed).await;
    }
    let _guard = ScanGuard { data, guild_id };

    let now = Utc::now().timestamp();
    let days = days.unwrap_or_else(|| days_between(guild_id.created_at().unix_timestamp(), now));
    let Some(oldest) = cutoff(now, days) else {
        return Err(UserError::Assertion(t.text("invalid_days")?).into());
    };

    // the scan takes minutes, members are stored in sessions of their own
    commit_session(ctx).await?;

    let channels = readable_channels(ctx, guild_id);
    let state = ScanState {
        members: Mutex::new(HashMap::new()),
        active: DashMap::new(),
        completed: Mutex::new(0),
    };

    let reply = ctx
        .send(CreateReply::default().embed(progress_embed(&t, t.text("scanning")?)))
        .await?;

    let scan = futures::stream::iter(channels.iter().copied()).for_each_concurrent(
        PARALLEL_CHANNELS,
        |channel| scan_channel(ctx, channel, oldest, &state),
    );
    tokio::pin!(scan);

    loop {
        tokio::select! {
            () = &mut scan => break,
            () = tokio::time::sleep(Duration::from_secs(2)) => {
                let content = progress(&t, &state, channels.len(), days, now)?;
                update_status(ctx, &reply, progress_embed(&t, content)).await;
            }
        }
    }

    let done = t.plural("scan_complete", channels.len() as i64, &Args::new())?;
    update_status(ctx, &reply, progress_embed(&t, done)).await;

    let members: Vec<(UserId, i64)> = state.members.lock().drain().collect();
    let reply = ctx
        .send(CreateReply::default().embed(progress_embed(&t, t.text("updating_members")?)))
        .await?;

    futures::stream::iter(members.iter().copied())
        .for_each_concurrent(PARALLEL_MEMBERS, |(member, timestamp)| async move {
            if let Err(e) = store_activity(data, member, timestamp).await {
                tracing::warn!("Failed to update the activity of {member}: {e}");
            }
        })
        .await;

    let done = t.plural("updated_members", members.len() as i64, &Args::new())?;
    update_status(ctx, &reply, progress_embed(&t, done)).await;
    Ok(())
}

fn readable_channels(ctx: Context<'_>, guild_id: GuildId) -> Vec<ChannelId> {
    let Some(guild) = ctx.cache().guild(guild_id) else {
        return Vec::new();
    };
    let Some(me) = guild.members.get(&ctx.cache().current_user().id) else {
        return Vec::new();
    };

    guild
        .channels
        .values()
        .filter(|c| c.kind == ChannelType::Text)
        .filter(|c| {
            let permissions = guild.user_permissions_in(c, me);
            permissions.view_channel() && permissions.read_message_history()
        })
        .map(|c| c.id)
        .collect()
}

async fn scan_channel(ctx: Context<'_>, channel: ChannelId, cutoff: i64, state: &ScanState) {
    state.active.insert(channel, 0);
    if let Err(e) = scan_history(ctx, channel, cutoff, state).await {
        tracing::warn!("Failed to scan {channel}: {e}");
    }
    state.active.remove(&channel);
    *state.completed.lock() += 1;
}

async fn scan_history(
    ctx: Context<'_>,
    channel: ChannelId,
    cutoff: i64,
    state: &ScanState,
) -> Result<(), Error> {
    let now = Utc::now().timestamp();
    let mut before: Option<MessageId> = None;

    loop {
        let mut request = GetMessages::new().limit(100);
        if let Some(before) = before {
            request = request.before(before);
        }
        let messages = channel.messages(ctx, request).await?;
        let Some(last) = messages.last() else {
            return Ok(());
        };
        before = Some(last.id);

        let mut members = state.members.lock();
        for message in &messages {
            let timestamp = message.timestamp.unix_timestamp();
            if timestamp < cutoff {
                return Ok(());
            }
            let latest = members.entry(message.author.id).or_insert(timestamp);
            *latest = (*latest).max(timestamp);
            state.active.insert(channel, days_between(timestamp, now));
        }
    }
}

async fn store_activity(data: &Data, member: UserId, timestamp: i64) -> Result<(), Error> {
    let Some(timestamp) = activity::from_unix(timestamp) else {
        return Ok(());
    };

    let mut session = data.database.session().await?;
    activity::update(session.conn()?, member, timestamp).await?;
    session.commit().await?;
    Ok(())
}

fn progress(
    t: &Translator<'_>,
    state: &ScanState,
    all: usize,
    days: i64,
    now: i64,
) -> Result<String, Error> {
    let active: Vec<(ChannelId, i64)> = state.active.iter().map(|e| (*e.key(), *e.value())).collect();

    let mut content = t.plural(
        "scanning_channel",
        active.len() as i64,
        &Args::new()
            .with("done", *state.completed.lock())
            .with("all", all),
    )?;
    for (channel, done) in active {
        let age = days_between(channel.created_at().unix_timestamp(), now);
        write!(
            content,
            "\n{} {}",
            emojis::ORANGE_DIAMOND,
            t.plural(
                "channel",
                age.min(days),
                &Args::new()
                    .with("channel", format!("<#{channel}>"))
                    .with("done", done),
            )?
        )?;
    }
    Ok(content)
}

fn progress_embed(t: &Translator<'_>, description: String) -> CreateEmbed {
    CreateEmbed::new()
        .title(t.text("title").unwrap_or_default())
        .colour(COLOUR)
        .description(description)
        .timestamp(serenity::Timestamp::now())
}

async fn update_status(ctx: Context<'_>, reply: &ReplyHandle<'_>, embed: CreateEmbed) {
    if let Err(e) = reply.edit(ctx, CreateReply::default().embed(embed)).await {
        tracing::debug!("Failed to update the scan progress: {e}");
    }
}

fn format_activity(t: &Translator<'_>, user: &str, last: Option<DateTime<Utc>>) -> Result<String, Error> {
    Ok(match last {
        Some(last) => t.format(
            "last_active",
            &Args::new()
                .with("user", user)
                .with("timestamp", last.timestamp()),
        )?,
        None => t.format("never_active", &Args::new().with("user", user))?,
    })
}

/// Shows when a member was last active.
#[poise::command(prefix_command, category = "Information", guild_only)]
pub async fn activity(ctx: Context<'_>, #[rest] who: String) -> Result<(), Error> {
    let Some(user) = find_user(ctx, &who).await else {
        let embed = embed(ctx, colors::POMEGRANATE)?.description(translator(ctx, "g").text("not_found.user")?);
        return reply_embed(ctx, embed).await;
    };

    let last = {
        let mut session = session(&ctx).await?;
        activity::get(session.conn()?, user.id).await?
    };

    let t = translator(ctx, "activity");
    let description = format_activity(&t, &format!("<@{}>", user.id), last)?;
    reply_embed(ctx, embed(ctx, COLOUR)?.description(description)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_days() {
        assert_eq!(days_between(0, SECONDS_PER_DAY - 1), 0);
        assert_eq!(days_between(0, SECONDS_PER_DAY * 3 + 5), 3);
        assert_eq!(days_between(100, 0), 0);
    }

    #[test]
    fn scan_cutoff() {
        assert_eq!(cutoff(SECONDS_PER_DAY * 10, 3), Some(SECONDS_PER_DAY * 7));
        assert_eq!(cutoff(1000, 0), Some(1000));
        assert_eq!(cutoff(1000, -1), None);
    }

    #[test]
    fn huge_scans_are_rejected() {
        let now = Utc::now().timestamp();
        assert_eq!(cutoff(now, i64::MAX), None);
        assert_eq!(cutoff(now, i64::MAX / 1000), None);
        // still representable, reaches far before the epoch
        assert!(cutoff(now, 1_000_000).is_some_and(|c| c < 0));
    }
}
