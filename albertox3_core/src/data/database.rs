use std::sync::Arc;

use parking_lot::Mutex;
use serenity::all::UserId;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgConnection, PgPool, Postgres, Transaction};

use crate::cache::TtlCache;
use crate::config::Environment;

/// Wrapper for the bots database, holding the pool and the lookup caches.
pub struct Database {
    pub db: PgPool,
    /// `settings::<key>` -> raw value
    pub settings: Arc<TtlCache<String, String>>,
    /// `permissions::<permission>` -> level
    pub permissions: Arc<TtlCache<String, i32>>,
    /// true if blocked
    pub blocked: Arc<TtlCache<UserId, bool>>,
}

impl Database {
    pub async fn connect(env: &Environment) -> Result<Self, sqlx::Error> {
        let mut options = match &env.database_url {
            Some(url) => url.parse::<PgConnectOptions>()?,
            None => PgConnectOptions::new()
                .host(&env.db_host)
                .port(env.db_port)
                .database(&env.db_database)
                .username(&env.db_username)
                .password(&env.db_password),
        };
        if !env.db_show_sql_statements {
            options = options.disable_statement_logging();
        }

        let pool = PgPoolOptions::new()
            .max_connections(env.db_pool_size + env.db_pool_max_overflow)
            .max_lifetime(env.db_pool_recycle)
            .test_before_acquire(true)
            .connect_with(options)
            .await?;

        Ok(Self::from_pool(pool, env.cache_ttl))
    }

    #[must_use]
    pub fn from_pool(db: PgPool, cache_ttl: std::time::Duration) -> Self {
        Database {
            db,
            settings: Arc::new(TtlCache::new(cache_ttl)),
            permissions: Arc::new(TtlCache::new(cache_ttl)),
            blocked: Arc::new(TtlCache::new(cache_ttl)),
        }
    }

    /// Creates every table that doesn't exist yet.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        tracing::debug!("Creating tables");
        sqlx::migrate!("./migrations").run(&self.db).await
    }

    /// Opens a new session, it has to be committed or everything done in it is rolled back.
    pub async fn session(&self) -> Result<Session, sqlx::Error> {
        Ok(Session {
            tx: Mutex::new(Some(self.db.begin().await?)),
            caches: Caches {
                settings: Arc::clone(&self.settings),
                permissions: Arc::clone(&self.permissions),
                blocked: Arc::clone(&self.blocked),
            },
            pending: PendingCache::default(),
        })
    }
}

/// A cache entry changed by a write inside a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheWrite {
    /// cache key and raw value
    Setting(String, String),
    /// cache key and level
    Permission(String, i32),
    Blocked(UserId, bool),
}

#[derive(Clone)]
struct Caches {
    settings: Arc<TtlCache<String, String>>,
    permissions: Arc<TtlCache<String, i32>>,
    blocked: Arc<TtlCache<UserId, bool>>,
}

impl Caches {
    fn store(&self, write: CacheWrite) {
        match write {
            CacheWrite::Setting(key, value) => self.settings.insert(key, value),
            CacheWrite::Permission(key, level) => self.permissions.insert(key, level),
            CacheWrite::Blocked(user, blocked) => self.blocked.insert(user, blocked),
        }
    }

    fn forget(&self, write: &CacheWrite) {
        match write {
            CacheWrite::Setting(key, _) => {
                self.settings.remove(key);
            }
            CacheWrite::Permission(key, _) => {
                self.permissions.remove(key);
            }
            CacheWrite::Blocked(user, _) => {
                self.blocked.remove(user);
            }
        }
    }
}

/// Cache writes of a session, they become visible once its transaction committed.
#[derive(Default)]
struct PendingCache {
    writes: Vec<CacheWrite>,
}

impl PendingCache {
    fn push(&mut self, caches: &Caches, write: CacheWrite) {
        // reads until the commit have to go to the database
        caches.forget(&write);
        self.writes.push(write);
    }

    fn publish(&mut self, caches: &Caches) {
        for write in self.writes.drain(..) {
            caches.store(write);
        }
    }

    /// Also drops whatever was cached from reads of the uncommitted rows.
    fn discard(&mut self, caches: &Caches) {
        for write in self.writes.drain(..) {
            caches.forget(&write);
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("the database session was already closed")]
pub struct SessionClosed;

/// One transaction, scoped to a command invocation or a listener call.
pub struct Session {
    // only locked through `get_mut`, the mutex is there to make the session `Sync`
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
    caches: Caches,
    pending: PendingCache,
}

impl Session {
    pub fn conn(&mut self) -> Result<&mut PgConnection, SessionClosed> {
        self.tx.get_mut().as_deref_mut().ok_or(SessionClosed)
    }

    #[must_use]
    pub fn is_open(&mut self) -> bool {
        self.tx.get_mut().is_some()
    }

    /// Updates a cache entry once the session committed.
    pub fn cache_after_commit(&mut self, write: CacheWrite) {
        self.pending.push(&self.caches, write);
    }

    /// Commits and closes the session, committing a closed session is a no-op.
    pub async fn commit(&mut self) -> Result<(), sqlx::Error> {
        let tx = self.tx.get_mut().take();
        let Some(tx) = tx else {
            return Ok(());
        };

        match tx.commit().await {
            Ok(()) => {
                self.pending.publish(&self.caches);
                Ok(())
            }
            Err(e) => {
                self.pending.discard(&self.caches);
                Err(e)
            }
        }
    }

    pub async fn rollback(&mut self) -> Result<(), sqlx::Error> {
        let tx = self.tx.get_mut().take();
        self.pending.discard(&self.caches);
        match tx {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    // a dropped open transaction is rolled back by sqlx
    fn drop(&mut self) {
        self.pending.discard(&self.caches);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn caches() -> Caches {
        let ttl = Duration::from_secs(60);
        Caches {
            settings: Arc::new(TtlCache::new(ttl)),
            permissions: Arc::new(TtlCache::new(ttl)),
            blocked: Arc::new(TtlCache::new(ttl)),
        }
    }

    #[test]
    fn writes_wait_for_the_commit() {
        let caches = caches();
        caches.settings.insert("settings::quiz:reward".into(), "10".into());

        let mut pending = PendingCache::default();
        pending.push(&caches, CacheWrite::Setting("settings::quiz:reward".into(), "25".into()));
        pending.push(&caches, CacheWrite::Blocked(UserId::new(42), true));

        // the old value is gone, the new one isn't there yet
        assert_eq!(caches.settings.get(&"settings::quiz:reward".to_owned()), None);
        assert_eq!(caches.blocked.get(&UserId::new(42)), None);

        pending.publish(&caches);
        assert_eq!(caches.settings.get(&"settings::quiz:reward".to_owned()).as_deref(), Some("25"));
        assert_eq!(caches.blocked.get(&UserId::new(42)), Some(true));
    }

    #[test]
    fn rolled_back_writes_leave_nothing_behind() {
        let caches = caches();
        caches.permissions.insert("permissions::kick:kick".into(), 1);

        let mut pending = PendingCache::default();
        pending.push(&caches, CacheWrite::Permission("permissions::kick:kick".into(), 3));
        // a read inside the transaction cached the uncommitted level
        caches.permissions.insert("permissions::kick:kick".into(), 3);

        pending.discard(&caches);
        assert_eq!(caches.permissions.get(&"permissions::kick:kick".to_owned()), None);

        // nothing is left to publish afterwards
        pending.publish(&caches);
        assert!(caches.permissions.is_empty());
    }

    #[test]
    fn released_session_refuses_work() {
        let mut session = Session {
            tx: Mutex::new(None),
            caches: caches(),
            pending: PendingCache::default(),
        };

        assert!(!session.is_open());
        assert!(session.conn().is_err());

        // a command that released its session early is committed again afterwards
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        assert!(rt.block_on(session.commit()).is_ok());
        assert!(rt.block_on(session.rollback()).is_ok());
    }
}
