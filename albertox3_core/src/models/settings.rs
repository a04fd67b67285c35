use sqlx::PgConnection;

use crate::data::database::CacheWrite;
use crate::data::{Database, Error, Session};

/// Conversion between a settings value and its stored text form.
pub trait SettingValue: Sized + Clone + Send + Sync {
    fn to_raw(&self) -> String;
    fn from_raw(raw: &str) -> Option<Self>;
}

macro_rules! numeric_setting {
    ($($ty:ty),*) => {
        $(
            impl SettingValue for $ty {
                fn to_raw(&self) -> String {
                    self.to_string()
                }

                fn from_raw(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

numeric_setting!(i32, i64, u32, u64);

// stored as 0/1
impl SettingValue for bool {
    fn to_raw(&self) -> String {
        i32::from(*self).to_string()
    }

    fn from_raw(raw: &str) -> Option<Self> {
        raw.trim().parse::<i64>().ok().map(|v| v != 0)
    }
}

/// A typed setting owned by a scale, stored under `"{scale}:{name}"`.
pub struct Setting<T: 'static> {
    pub scale: &'static str,
    pub name: &'static str,
    pub default: T,
}

impl<T: SettingValue> Setting<T> {
    pub const fn new(scale: &'static str, name: &'static str, default: T) -> Self {
        Setting {
            scale,
            name,
            default,
        }
    }

    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.scale, self.name)
    }

    /// Cached value, then the stored one, then the default (which gets stored).
    pub async fn get(&self, db: &Database, conn: &mut PgConnection) -> Result<T, sqlx::Error> {
        let raw = get_raw(db, conn, &self.key(), &self.default.to_raw()).await?;
        Ok(T::from_raw(&raw).unwrap_or_else(|| self.default.clone()))
    }

    pub async fn set(&self, session: &mut Session, value: &T) -> Result<(), Error> {
        set_raw(session, &self.key(), &value.to_raw()).await
    }

    pub async fn reset(&self, session: &mut Session) -> Result<T, Error> {
        self.set(session, &self.default).await?;
        Ok(self.default.clone())
    }

    /// Untyped view, used to list and reset settings by key.
    #[must_use]
    pub fn describe(&self) -> SettingInfo {
        SettingInfo {
            key: self.key(),
            default: self.default.to_raw(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingInfo {
    pub key: String,
    pub default: String,
}

fn cache_key(key: &str) -> String {
    format!("settings::{key}")
}

/// Returns the stored value without creating it.
pub async fn find_raw(
    db: &Database,
    conn: &mut PgConnection,
    key: &str,
) -> Result<Option<String>, sqlx::Error> {
    if let Some(value) = db.settings.get(&cache_key(key)) {
        return Ok(Some(value));
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(conn)
        .await?;

    if let Some(value) = &value {
        db.settings.insert(cache_key(key), value.clone());
    }
    Ok(value)
}

pub async fn get_raw(
    db: &Database,
    conn: &mut PgConnection,
    key: &str,
    default: &str,
) -> Result<String, sqlx::Error> {
    if let Some(value) = find_raw(db, &mut *conn, key).await? {
        return Ok(value);
    }

    sqlx::query("INSERT INTO settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING")
        .bind(key)
        .bind(default)
        .execute(conn)
        .await?;

    db.settings.insert(cache_key(key), default.to_owned());
    Ok(default.to_owned())
}

/// Stores a value, the cache follows once the session committed.
pub async fn set_raw(session: &mut Session, key: &str, value: &str) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = \
         EXCLUDED.value",
    )
    .bind(key)
    .bind(value)
    .execute(session.conn()?)
    .await?;

    session.cache_after_commit(CacheWrite::Setting(cache_key(key), value.to_owned()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Setting<i32> = Setting::new("automod", "threshold", 10);
    const ENABLED: Setting<bool> = Setting::new("automod", "enabled", true);

    #[test]
    fn keys_and_defaults() {
        assert_eq!(THRESHOLD.key(), "automod:threshold");
        assert_eq!(THRESHOLD.describe(), SettingInfo {
            key: "automod:threshold".into(),
            default: "10".into(),
        });
        assert_eq!(ENABLED.describe().default, "1");
    }

    #[test]
    fn bools_are_stored_as_numbers() {
        assert_eq!(true.to_raw(), "1");
        assert_eq!(false.to_raw(), "0");
        assert_eq!(bool::from_raw("0"), Some(false));
        assert_eq!(bool::from_raw("2"), Some(true));
        assert_eq!(bool::from_raw("yes"), None);
    }

    #[test]
    fn numbers_parse_trimmed() {
        assert_eq!(i32::from_raw(" 42 "), Some(42));
        assert_eq!(u64::from_raw("-1"), None);
        assert_eq!(i64::from_raw("abc"), None);
    }
}
