use chrono::{DateTime, Utc};
use serenity::all::UserId;
use sqlx::PgConnection;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Kick {
    pub id: i32,
    pub member: i64,
    pub executor: i64,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

impl Kick {
    #[must_use]
    pub fn executor_id(&self) -> UserId {
        UserId::new(self.executor as u64)
    }
}

pub async fn add(
    conn: &mut PgConnection,
    member: UserId,
    executor: UserId,
    reason: &str,
) -> Result<Kick, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO kick (member, executor, timestamp, reason) VALUES ($1, $2, $3, $4) RETURNING \
         id, member, executor, timestamp, reason",
    )
    .bind(member.get() as i64)
    .bind(executor.get() as i64)
    .bind(Utc::now())
    .bind(reason)
    .fetch_one(conn)
    .await
}

/// Every recorded kick of a member, oldest first.
pub async fn of_member(conn: &mut PgConnection, member: UserId) -> Result<Vec<Kick>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, member, executor, timestamp, reason FROM kick WHERE member = $1 ORDER BY \
         timestamp",
    )
    .bind(member.get() as i64)
    .fetch_all(conn)
    .await
}
