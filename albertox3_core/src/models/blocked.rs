use serenity::all::UserId;
use sqlx::PgConnection;

use crate::data::database::CacheWrite;
use crate::data::{Database, Error, Session};

pub async fn is_blocked(
    db: &Database,
    conn: &mut PgConnection,
    user: UserId,
) -> Result<bool, sqlx::Error> {
    if let Some(blocked) = db.blocked.get(&user) {
        return Ok(blocked);
    }

    let blocked: bool =
        sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM blocked_user WHERE "user" = $1)"#)
            .bind(user.get() as i64)
            .fetch_one(conn)
            .await?;

    db.blocked.insert(user, blocked);
    Ok(blocked)
}

/// Returns `false` if the user was already blocked.
pub async fn block(session: &mut Session, user: UserId) -> Result<bool, Error> {
    let changed = sqlx::query(r#"INSERT INTO blocked_user ("user") VALUES ($1) ON CONFLICT DO NOTHING"#)
        .bind(user.get() as i64)
        .execute(session.conn()?)
        .await?
        .rows_affected()
        > 0;

    session.cache_after_commit(CacheWrite::Blocked(user, true));
    if changed {
        tracing::info!("Blocked {user}");
    }
    Ok(changed)
}

/// Returns `false` if the user wasn't blocked.
pub async fn unblock(session: &mut Session, user: UserId) -> Result<bool, Error> {
    let changed = sqlx::query(r#"DELETE FROM blocked_user WHERE "user" = $1"#)
        .bind(user.get() as i64)
        .execute(session.conn()?)
        .await?
        .rows_affected()
        > 0;

    session.cache_after_commit(CacheWrite::Blocked(user, false));
    if changed {
        tracing::info!("Unblocked {user}");
    }
    Ok(changed)
}

pub async fn all(conn: &mut PgConnection) -> Result<Vec<UserId>, sqlx::Error> {
    let users: Vec<i64> = sqlx::query_scalar(r#"SELECT "user" FROM blocked_user ORDER BY "user""#)
        .fetch_all(conn)
        .await?;

    Ok(users.into_iter().map(|u| UserId::new(u as u64)).collect())
}
