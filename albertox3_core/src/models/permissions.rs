use std::fmt;
use std::str::FromStr;

use sqlx::PgConnection;

use crate::data::database::CacheWrite;
use crate::data::{Database, Error, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PermissionLevel {
    Public = 0,
    Moderator = 1,
    Admin = 2,
    Owner = 3,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::Public,
        PermissionLevel::Moderator,
        PermissionLevel::Admin,
        PermissionLevel::Owner,
    ];

    /// Levels outside of the known range are clamped.
    #[must_use]
    pub fn from_level(level: i32) -> Self {
        match level {
            i32::MIN..=0 => PermissionLevel::Public,
            1 => PermissionLevel::Moderator,
            2 => PermissionLevel::Admin,
            _ => PermissionLevel::Owner,
        }
    }

    #[must_use]
    pub fn level(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PermissionLevel::Public => "public",
            PermissionLevel::Moderator => "moderator",
            PermissionLevel::Admin => "admin",
            PermissionLevel::Owner => "owner",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.level())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown permission level `{0}`")]
pub struct UnknownLevel(pub String);

impl FromStr for PermissionLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(level) = s.parse::<i32>() {
            return PermissionLevel::ALL
                .into_iter()
                .find(|l| l.level() == level)
                .ok_or_else(|| UnknownLevel(s.to_owned()));
        }

        PermissionLevel::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLevel(s.to_owned()))
    }
}

fn cache_key(permission: &str) -> String {
    format!("permissions::{permission}")
}

/// Required level of a permission, the default is stored on first use.
pub async fn get(
    db: &Database,
    conn: &mut PgConnection,
    permission: &str,
    default: PermissionLevel,
) -> Result<PermissionLevel, sqlx::Error> {
    if let Some(level) = db.permissions.get(&cache_key(permission)) {
        return Ok(PermissionLevel::from_level(level));
    }

    let stored: Option<i32> =
        sqlx::query_scalar("SELECT level FROM permissions WHERE permission = $1")
            .bind(permission)
            .fetch_optional(&mut *conn)
            .await?;

    let level = match stored {
        Some(level) => level,
        None => {
            sqlx::query(
                "INSERT INTO permissions (permission, level) VALUES ($1, $2) ON CONFLICT \
                 (permission) DO NOTHING",
            )
            .bind(permission)
            .bind(default.level())
            .execute(conn)
            .await?;
            default.level()
        }
    };

    db.permissions.insert(cache_key(permission), level);
    Ok(PermissionLevel::from_level(level))
}

pub async fn set(session: &mut Session, permission: &str, level: PermissionLevel) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO permissions (permission, level) VALUES ($1, $2) ON CONFLICT (permission) DO \
         UPDATE SET level = EXCLUDED.level",
    )
    .bind(permission)
    .bind(level.level())
    .execute(session.conn()?)
    .await?;

    session.cache_after_commit(CacheWrite::Permission(cache_key(permission), level.level()));
    Ok(())
}

/// Every stored permission, sorted by name.
pub async fn all(conn: &mut PgConnection) -> Result<Vec<(String, PermissionLevel)>, sqlx::Error> {
    let rows: Vec<(String, i32)> =
        sqlx::query_as("SELECT permission, level FROM permissions ORDER BY permission")
            .fetch_all(conn)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(permission, level)| (permission, PermissionLevel::from_level(level)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(PermissionLevel::Public < PermissionLevel::Moderator);
        assert!(PermissionLevel::Moderator < PermissionLevel::Admin);
        assert!(PermissionLevel::Admin < PermissionLevel::Owner);
    }

    #[test]
    fn parsing() {
        assert_eq!("admin".parse::<PermissionLevel>().unwrap(), PermissionLevel::Admin);
        assert_eq!("MODERATOR".parse::<PermissionLevel>().unwrap(), PermissionLevel::Moderator);
        assert_eq!("3".parse::<PermissionLevel>().unwrap(), PermissionLevel::Owner);
        assert!("7".parse::<PermissionLevel>().is_err());
        assert!("root".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn clamped_levels() {
        assert_eq!(PermissionLevel::from_level(-5), PermissionLevel::Public);
        assert_eq!(PermissionLevel::from_level(2), PermissionLevel::Admin);
        assert_eq!(PermissionLevel::from_level(99), PermissionLevel::Owner);
        assert_eq!(PermissionLevel::Admin.to_string(), "admin (2)");
    }
}
