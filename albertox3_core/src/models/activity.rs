use chrono::{DateTime, Utc};
use serenity::all::UserId;
use sqlx::PgConnection;

/// Converts a unix timestamp given in seconds or milliseconds.
#[must_use]
pub fn from_unix(timestamp: i64) -> Option<DateTime<Utc>> {
    // anything past year 9999 in seconds has to be milliseconds
    const MAX_SECONDS: i64 = 253_402_300_799;

    if timestamp.abs() > MAX_SECONDS {
        DateTime::from_timestamp_millis(timestamp)
    } else {
        DateTime::from_timestamp(timestamp, 0)
    }
}

/// Records activity, a member's timestamp only ever moves forward.
pub async fn update(
    conn: &mut PgConnection,
    member: UserId,
    timestamp: DateTime<Utc>,
) -> Result<DateTime<Utc>, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO activity (member, timestamp) VALUES ($1, $2) ON CONFLICT (member) DO UPDATE \
         SET timestamp = GREATEST(activity.timestamp, EXCLUDED.timestamp) RETURNING timestamp",
    )
    .bind(member.get() as i64)
    .bind(timestamp)
    .fetch_one(conn)
    .await
}

pub async fn get(
    conn: &mut PgConnection,
    member: UserId,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar("SELECT timestamp FROM activity WHERE member = $1")
        .bind(member.get() as i64)
        .fetch_optional(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_and_millis() {
        let seconds = from_unix(1_650_000_000).unwrap();
        let millis = from_unix(1_650_000_000_000).unwrap();
        assert_eq!(seconds, millis);
        assert_eq!(seconds.timestamp(), 1_650_000_000);
    }
}
