//! Pub/sub channels connecting the gateway event handler with the scales.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use poise::serenity_prelude::{self as serenity, FullEvent};

use crate::data::{Data, Error, Session};
use crate::scales::ScaleRegistry;

/// A scale's reaction to events published on a [`Channel`].
#[serenity::async_trait]
pub trait Subscriber: Send + Sync {
    /// Name of the scale this subscriber belongs to.
    fn scale(&self) -> &'static str;

    async fn receive(
        &self,
        ctx: &serenity::Context,
        data: &Data,
        session: &mut Session,
        event: &FullEvent,
    ) -> Result<(), Error>;
}

pub struct Channel {
    name: &'static str,
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
}

impl Channel {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Channel {
            name,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.write().push(subscriber);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Subscribers of enabled scales, in subscription order.
    #[must_use]
    pub fn subscribers_for(&self, scales: &ScaleRegistry) -> Vec<Arc<dyn Subscriber>> {
        self.subscribers
            .read()
            .iter()
            .filter(|s| scales.is_enabled(s.scale()))
            .cloned()
            .collect()
    }

    /// Runs every subscriber concurrently, each in its own database session.
    /// Returns the amount of subscribers that failed.
    pub async fn publish(&self, ctx: &serenity::Context, data: &Data, event: &FullEvent) -> usize {
        let subscribers = self.subscribers_for(&data.scales);
        if subscribers.is_empty() {
            return 0;
        }

        let results = join_all(subscribers.iter().map(|subscriber| async move {
            let mut session = data.database.session().await?;
            let result = subscriber.receive(ctx, data, &mut session, event).await;
            session.commit().await?;
            result
        }))
        .await;

        let mut failed = 0;
        for (subscriber, result) in subscribers.iter().zip(results) {
            if let Err(e) = result {
                failed += 1;
                tracing::error!(
                    "Subscriber of {} failed on channel {}: {e}",
                    subscriber.scale(),
                    self.name
                );
            }
        }
        failed
    }
}

/// Every channel the event handler can publish to.
pub struct Listeners {
    /// Regular dispatch, events of users that aren't blocked.
    pub event: Channel,
    pub blocked_message_create: Channel,
    pub blocked_message_update: Channel,
    pub blocked_message_delete: Channel,
    pub blocked_guild_member_add: Channel,
    pub blocked_guild_member_update: Channel,
    pub blocked_guild_member_remove: Channel,
    /// Events caused by a contributor of the bot.
    pub contributor_event: Channel,
}

impl Default for Listeners {
    fn default() -> Self {
        Listeners {
            event: Channel::new("event"),
            blocked_message_create: Channel::new("blocked_message_create"),
            blocked_message_update: Channel::new("blocked_message_update"),
            blocked_message_delete: Channel::new("blocked_message_delete"),
            blocked_guild_member_add: Channel::new("blocked_guild_member_add"),
            blocked_guild_member_update: Channel::new("blocked_guild_member_update"),
            blocked_guild_member_remove: Channel::new("blocked_guild_member_remove"),
            contributor_event: Channel::new("contributor_event"),
        }
    }
}

impl Listeners {
    /// The blocked channel for an event kind, as named by `FullEvent::snake_case_name`.
    /// Only message and member events of blocked users are published.
    #[must_use]
    pub fn blocked_channel(&self, event_name: &str) -> Option<&Channel> {
        match event_name {
            "message" => Some(&self.blocked_message_create),
            "message_update" => Some(&self.blocked_message_update),
            "message_delete" => Some(&self.blocked_message_delete),
            "guild_member_addition" => Some(&self.blocked_guild_member_add),
            "guild_member_update" => Some(&self.blocked_guild_member_update),
            "guild_member_removal" => Some(&self.blocked_guild_member_remove),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude as serenity;

    struct Noop(&'static str);

    #[serenity::async_trait]
    impl Subscriber for Noop {
        fn scale(&self) -> &'static str {
            self.0
        }

        async fn receive(
            &self,
            _: &serenity::Context,
            _: &Data,
            _: &mut Session,
            _: &FullEvent,
        ) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn skips_disabled_scales() {
        let scales = ScaleRegistry::new();
        scales.register("moderation", "automod", &["automod".to_string()]);
        scales.register("information", "activity", &[]);

        let channel = Channel::new("event");
        channel.subscribe(Arc::new(Noop("activity")));
        channel.subscribe(Arc::new(Noop("automod")));
        channel.subscribe(Arc::new(Noop("quiz")));

        let names: Vec<_> = channel
            .subscribers_for(&scales)
            .iter()
            .map(|s| s.scale())
            .collect();
        assert_eq!(names, ["activity", "quiz"]);
        assert_eq!(channel.len(), 3);

        scales.set_enabled("automod", true).unwrap();
        assert_eq!(channel.subscribers_for(&scales).len(), 3);
    }

    #[test]
    fn blocked_channels() {
        let listeners = Listeners::default();

        assert_eq!(
            listeners.blocked_channel("message").map(Channel::name),
            Some("blocked_message_create")
        );
        assert_eq!(
            listeners.blocked_channel("guild_member_removal").map(Channel::name),
            Some("blocked_guild_member_remove")
        );
        assert!(listeners.blocked_channel("reaction_add").is_none());
        assert!(listeners.event.is_empty());
    }
}
