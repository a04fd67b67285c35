use std::fmt::Write;
use std::future::Future;

use albertox3_core::colors;
use albertox3_core::data::session;
use albertox3_core::models::kick;
use albertox3_core::models::permissions::PermissionLevel;
use albertox3_core::translations::Args;

use crate::utils::{embed, find_member, find_user, reply_embed, require_level, translator};
use crate::{Context, Error, Scale};

pub const KICKED: u32 = colors::EMERLAND;
pub const FAILED: u32 = colors::POMEGRANATE;

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "moderation",
        name: "kick",
        commands: || vec![kick(), kicks()],
        subscribe: None,
    }
}

async fn can_kick(ctx: Context<'_>) -> Result<bool, Error> {
    require_level(ctx, "kick:kick", PermissionLevel::Moderator).await
}

async fn can_list_kicks(ctx: Context<'_>) -> Result<bool, Error> {
    require_level(ctx, "kick:kicks", PermissionLevel::Moderator).await
}

/// Runs `record` only once Discord accepted the kick, so a refused kick leaves no entry
/// behind when the failed invocation's session is committed.
async fn kick_then_record<E>(
    kick: impl Future<Output = Result<(), E>>,
    record: impl Future<Output = Result<(), Error>>,
) -> Result<(), Error>
where
    E: Into<Error>,
{
    if let Err(e) = kick.await {
        return Err(e.into());
    }
    record.await
}

/// Kicks a member and records the kick.
#[poise::command(
    prefix_command,
    category = "Moderation",
    guild_only,
    check = "can_kick",
    required_bot_permissions = "KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "mention, id, name#discriminator, name or nickname"] who: String,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let g = translator(ctx, "g");
    let reason = match reason.filter(|r| !r.trim().is_empty()) {
        Some(reason) => reason,
        None => g.text("no_reason")?,
    };

    let Some(member) = find_member(ctx, &who).await else {
        let embed = embed(ctx, FAILED)?.description(g.text("not_found.user")?);
        return reply_embed(ctx, embed).await;
    };

    kick_then_record(member.kick_with_reason(ctx, &reason), async {
        let mut session = session(&ctx).await?;
        kick::add(session.conn()?, member.user.id, ctx.author().id, &reason).await?;
        Ok::<_, Error>(())
    })
    .await?;
    tracing::info!("{} kicked {} ({reason})", ctx.author().name, member.user.name);

    let t = translator(ctx, "kick");
    let embed = embed(ctx, KICKED)?.description(t.format(
        "kicked",
        &Args::new()
            .with("user", member.user.tag())
            .with("id", member.user.id)
            .with("reason", &reason),
    )?);
    reply_embed(ctx, embed).await
}

/// Lists the recorded kicks of a user.
#[poise::command(prefix_command, category = "Moderation", guild_only, check = "can_list_kicks")]
pub async fn kicks(ctx: Context<'_>, who: String) -> Result<(), Error> {
    let Some(user) = find_user(ctx, &who).await else {
        let embed = embed(ctx, FAILED)?.description(translator(ctx, "g").text("not_found.user")?);
        return reply_embed(ctx, embed).await;
    };

    let kicks = {
        let mut session = session(&ctx).await?;
        kick::of_member(session.conn()?, user.id).await?
    };

    let t = translator(ctx, "kick");
    let mut description = String::new();
    for kick in &kicks {
        writeln!(
            description,
            "{}",
            t.format(
                "kicks.entry",
                &Args::new()
                    .with("timestamp", kick.timestamp.timestamp())
                    .with("executor", format!("<@{}>", kick.executor_id()))
                    .with("reason", &kick.reason),
            )?
        )?;
    }

    let title = t.plural(
        "kicks.title",
        kicks.len() as i64,
        &Args::new().with("user", user.tag()),
    )?;
    let embed = embed(ctx, KICKED)?.title(title).description(description);
    reply_embed(ctx, embed).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn refused_kick_is_not_recorded() {
        let recorded = AtomicBool::new(false);
        let result = block_on(kick_then_record(
            async { Err::<(), _>(serenity::Error::Other("missing permissions")) },
            async {
                recorded.store(true, Ordering::SeqCst);
                Ok::<(), Error>(())
            },
        ));

        assert!(result.is_err());
        assert!(!recorded.load(Ordering::SeqCst));
    }

    #[test]
    fn accepted_kick_is_recorded() {
        let recorded = AtomicBool::new(false);
        let result = block_on(kick_then_record(async { Ok::<(), serenity::Error>(()) }, async {
            recorded.store(true, Ordering::SeqCst);
            Ok::<(), Error>(())
        }));

        assert!(result.is_ok());
        assert!(recorded.load(Ordering::SeqCst));
    }
}
