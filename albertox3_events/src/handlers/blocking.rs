//! Routes events of blocked users away from the regular listeners.

use albertox3_core::data::{Data, Error};
use albertox3_core::listener::Channel;
use albertox3_core::models::{blocked, stats};
use futures::future::join_all;
use poise::serenity_prelude::{self as serenity, FullEvent, Interaction, UserId};

/// Users that caused an event.
#[must_use]
pub fn user_ids(ctx: &serenity::Context, event: &FullEvent) -> Vec<UserId> {
    let mut ids = Vec::new();
    match event {
        FullEvent::Message { new_message } => ids.push(new_message.author.id),
        FullEvent::MessageUpdate { event, .. } => {
            ids.extend(event.author.as_ref().map(|a| a.id));
        }
        FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            ..
        } => {
            ids.extend(
                ctx.cache
                    .message(*channel_id, *deleted_message_id)
                    .map(|m| m.author.id),
            );
        }
        FullEvent::GuildMemberAddition { new_member } => ids.push(new_member.user.id),
        FullEvent::GuildMemberUpdate { event, .. } => ids.push(event.user.id),
        FullEvent::GuildMemberRemoval { user, .. } => ids.push(user.id),
        FullEvent::ReactionAdd { add_reaction } => ids.extend(add_reaction.user_id),
        FullEvent::ReactionRemove { removed_reaction } => ids.extend(removed_reaction.user_id),
        FullEvent::TypingStart { event } => ids.push(event.user_id),
        FullEvent::VoiceStateUpdate { new, .. } => ids.push(new.user_id),
        FullEvent::PresenceUpdate { new_data } => ids.push(new_data.user.id),
        FullEvent::InteractionCreate { interaction } => match interaction {
            Interaction::Command(i) | Interaction::Autocomplete(i) => ids.push(i.user.id),
            Interaction::Component(i) => ids.push(i.user.id),
            Interaction::Modal(i) => ids.push(i.user.id),
            _ => {}
        },
        _ => {}
    }

    ids.dedup();
    ids
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserStatus {
    pub author: bool,
    pub contributor: bool,
    pub blocked: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    /// Publish to the blocked channel of the event instead of the regular one.
    pub blocked: bool,
    pub contributor: bool,
}

/// Decides where an event goes, users are checked in order and the first blocked one wins.
/// The author of the bot is never blocked.
#[must_use]
pub fn route(users: &[UserStatus]) -> Route {
    let mut contributor = false;
    for user in users {
        contributor |= user.contributor;
        if user.author {
            continue;
        }
        if user.blocked {
            return Route {
                blocked: true,
                contributor,
            };
        }
    }

    Route {
        blocked: false,
        contributor,
    }
}

pub async fn dispatch(ctx: &serenity::Context, event: &FullEvent, data: &Data) -> Result<(), Error> {
    let ids = user_ids(ctx, event);

    let mut session = data.database.session().await?;
    stats::incr_events(session.conn()?).await?;
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        users.push(UserStatus {
            author: data.config.is_author(id.get()),
            contributor: data.config.is_contributor(id.get()),
            blocked: blocked::is_blocked(&data.database, session.conn()?, id).await?,
        });
    }
    session.commit().await?;

    let route = route(&users);
    let mut channels: Vec<&Channel> = Vec::with_capacity(2);
    if route.contributor {
        channels.push(&data.listeners.contributor_event);
    }
    if route.blocked {
        tracing::debug!("Blocked dispatching event: {}", event.snake_case_name());
        channels.extend(data.listeners.blocked_channel(event.snake_case_name()));
    } else {
        channels.push(&data.listeners.event);
    }

    join_all(channels.iter().map(|c| c.publish(ctx, data, event))).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserStatus = UserStatus {
        author: false,
        contributor: false,
        blocked: false,
    };

    #[test]
    fn regular_event() {
        assert_eq!(route(&[]), Route {
            blocked: false,
            contributor: false
        });
        assert_eq!(route(&[USER, USER]), Route {
            blocked: false,
            contributor: false
        });
    }

    #[test]
    fn blocked_user() {
        let blocked = UserStatus {
            blocked: true,
            ..USER
        };
        assert!(route(&[USER, blocked]).blocked);
    }

    #[test]
    fn author_is_never_blocked() {
        let author = UserStatus {
            author: true,
            blocked: true,
            ..USER
        };
        assert!(!route(&[author]).blocked);
    }

    #[test]
    fn contributors_are_flagged() {
        let contributor = UserStatus {
            contributor: true,
            ..USER
        };
        assert_eq!(route(&[contributor]), Route {
            blocked: false,
            contributor: true
        });

        let blocked_contributor = UserStatus {
            contributor: true,
            blocked: true,
            ..USER
        };
        assert_eq!(route(&[blocked_contributor]), Route {
            blocked: true,
            contributor: true
        });

        // users after the first blocked one aren't looked at
        let blocked = UserStatus {
            blocked: true,
            ..USER
        };
        assert!(!route(&[blocked, contributor]).contributor);
    }
}
