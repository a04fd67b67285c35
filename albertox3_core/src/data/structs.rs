use std::ops::DerefMut;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use dashmap::DashSet;
use poise::serenity_prelude::GuildId;

use crate::config::Config;
use crate::data::database::{Database, Session, SessionClosed};
use crate::listener::Listeners;
use crate::models::automod::AutomodLists;
use crate::scales::ScaleRegistry;
use crate::translations::{Translations, Translator};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type PrefixContext<'a> = poise::PrefixContext<'a, Data, Error>;
pub type FrameworkContext<'a> = poise::FrameworkContext<'a, Data, Error>;
pub type Command = poise::Command<Data, Error>;

pub struct Data {
    /// If the bots startup has been handled in the `ready` event.
    pub has_started: AtomicBool,
    /// Time the bot started.
    pub time_started: Instant,
    /// Wrapper for the bots database with the lookup caches.
    pub database: Database,
    /// Http client.
    pub reqwest: reqwest::Client,
    /// Bot configuration, loaded from `config.yml`.
    pub config: Config,
    pub translations: Translations,
    pub scales: ScaleRegistry,
    /// Pub/sub channels the event handler publishes to.
    pub listeners: Listeners,
    pub automod: AutomodLists,
    /// Guilds with a running activity scan.
    pub activity_scans: DashSet<GuildId>,
}

impl Data {
    #[must_use]
    pub fn new(config: Config, database: Database, translations: Translations) -> Self {
        Data {
            has_started: AtomicBool::new(false),
            time_started: Instant::now(),
            database,
            reqwest: reqwest::Client::new(),
            config,
            translations,
            scales: ScaleRegistry::new(),
            listeners: Listeners::default(),
            automod: AutomodLists::default(),
            activity_scans: DashSet::new(),
        }
    }

    /// Translator for a Discord locale, unknown locales use the default language.
    #[must_use]
    pub fn translator(&self, locale: Option<&str>, namespace: &'static str) -> Translator<'_> {
        let language = self.translations.resolve_locale(locale);
        self.translations.translator(language, namespace)
    }
}

/// The database session opened for the current invocation.
pub async fn session<'a>(
    ctx: &'a Context<'_>,
) -> Result<impl DerefMut<Target = Session> + 'a, SessionClosed> {
    ctx.invocation_data::<Session>().await.ok_or(SessionClosed)
}
