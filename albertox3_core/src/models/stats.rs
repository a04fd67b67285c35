use chrono::NaiveDate;
use sqlx::PgConnection;

pub async fn get(conn: &mut PgConnection, name: &str) -> Result<i64, sqlx::Error> {
    let value: Option<i64> = sqlx::query_scalar("SELECT value FROM stats WHERE name = $1")
        .bind(name)
        .fetch_optional(conn)
        .await?;

    Ok(value.unwrap_or(0))
}

/// Returns the new value.
pub async fn incr(conn: &mut PgConnection, name: &str, by: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO stats (name, value) VALUES ($1, $2) ON CONFLICT (name) DO UPDATE SET value = \
         stats.value + EXCLUDED.value RETURNING value",
    )
    .bind(name)
    .bind(by)
    .fetch_one(conn)
    .await
}

pub async fn reset(conn: &mut PgConnection, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE stats SET value = 0 WHERE name = $1")
        .bind(name)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn all(conn: &mut PgConnection) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT name, value FROM stats ORDER BY value DESC, name")
        .fetch_all(conn)
        .await
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct DailyStats {
    pub day: NaiveDate,
    pub events: i64,
    pub commands: i64,
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

pub async fn incr_events(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO daily_stats (day, events, commands) VALUES ($1, 1, 0) ON CONFLICT (day) DO \
         UPDATE SET events = daily_stats.events + 1",
    )
    .bind(today())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn incr_commands(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO daily_stats (day, events, commands) VALUES ($1, 0, 1) ON CONFLICT (day) DO \
         UPDATE SET commands = daily_stats.commands + 1",
    )
    .bind(today())
    .execute(conn)
    .await?;
    Ok(())
}

/// The last `days` days that have any recorded stats, newest first.
pub async fn daily(conn: &mut PgConnection, days: i64) -> Result<Vec<DailyStats>, sqlx::Error> {
    sqlx::query_as("SELECT day, events, commands FROM daily_stats ORDER BY day DESC LIMIT $1")
        .bind(days)
        .fetch_all(conn)
        .await
}
