use serenity::all::UserId;
use sqlx::PgConnection;

use crate::emojis;

/// Balance of a user, an empty account is created on first access.
pub async fn get(conn: &mut PgConnection, user: UserId) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        r#"INSERT INTO money ("user", amount) VALUES ($1, 0) ON CONFLICT ("user") DO UPDATE SET
           amount = money.amount RETURNING amount"#,
    )
    .bind(user.get() as i64)
    .fetch_one(conn)
    .await
}

/// Sets (or with `relative` adds) the amount, returns the new balance.
pub async fn update(
    conn: &mut PgConnection,
    user: UserId,
    amount: i32,
    relative: bool,
) -> Result<i32, sqlx::Error> {
    let query = if relative {
        r#"INSERT INTO money ("user", amount) VALUES ($1, $2) ON CONFLICT ("user") DO UPDATE SET
           amount = money.amount + EXCLUDED.amount RETURNING amount"#
    } else {
        r#"INSERT INTO money ("user", amount) VALUES ($1, $2) ON CONFLICT ("user") DO UPDATE SET
           amount = EXCLUDED.amount RETURNING amount"#
    };

    sqlx::query_scalar(query)
        .bind(user.get() as i64)
        .bind(amount)
        .fetch_one(conn)
        .await
}

/// Takes `amount` from an existing account if it covers it, returns the new balance or `None`
/// when the money isn't there.
pub async fn debit(
    conn: &mut PgConnection,
    user: UserId,
    amount: i32,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar(
        r#"UPDATE money SET amount = amount - $2 WHERE "user" = $1 AND amount >= $2
           RETURNING amount"#,
    )
    .bind(user.get() as i64)
    .bind(amount)
    .fetch_optional(conn)
    .await
}

/// Sum of every balance.
pub async fn total(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0)::BIGINT FROM money")
        .fetch_one(conn)
        .await
}

/// Picks the money emoji based on the share of the global amount.
#[must_use]
pub fn tier_emoji(amount: i64, total: i64) -> &'static str {
    // compared as amount * n >= total to stay exact
    let amount = i128::from(amount);
    let total = i128::from(total);

    if amount >= total {
        emojis::MONEYBAG
    } else if amount * 2 >= total {
        emojis::YEN
    } else if amount * 4 >= total {
        emojis::POUND
    } else if amount * 8 >= total {
        emojis::EURO
    } else {
        emojis::DOLLAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers() {
        assert_eq!(tier_emoji(100, 100), emojis::MONEYBAG);
        assert_eq!(tier_emoji(50, 100), emojis::YEN);
        assert_eq!(tier_emoji(49, 100), emojis::POUND);
        assert_eq!(tier_emoji(25, 100), emojis::POUND);
        assert_eq!(tier_emoji(13, 100), emojis::EURO);
        assert_eq!(tier_emoji(12, 100), emojis::DOLLAR);
        assert_eq!(tier_emoji(0, 100), emojis::DOLLAR);
    }

    #[test]
    fn empty_economy() {
        // everyone owns everything of nothing
        assert_eq!(tier_emoji(0, 0), emojis::MONEYBAG);
    }
}
