use std::sync::LazyLock;

use poise::serenity_prelude::{Member, User, UserId};
use regex::Regex;

use crate::Context;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<?@?!?([0-9]{15,20})>?$").unwrap());

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberQuery<'a> {
    Id(UserId),
    /// `name#discriminator`, also matched as plain name or nickname.
    Tag {
        name: &'a str,
        discriminator: &'a str,
    },
    /// Plain name or nickname.
    Name(&'a str),
}

impl<'a> MemberQuery<'a> {
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        if let Some(id) = MENTION
            .captures(raw)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .filter(|id| *id != 0)
        {
            return MemberQuery::Id(UserId::new(id));
        }

        if raw.len() > 5 {
            if let Some((name, discriminator)) = raw.rsplit_once('#') {
                if discriminator.len() == 4 && discriminator.bytes().all(|b| b.is_ascii_digit()) {
                    return MemberQuery::Tag {
                        name,
                        discriminator,
                    };
                }
            }
        }

        MemberQuery::Name(raw)
    }

    #[must_use]
    pub fn matches_tag(&self, user: &User) -> bool {
        match self {
            MemberQuery::Tag {
                name,
                discriminator,
            } => {
                user.name == *name
                    && user
                        .discriminator
                        .is_some_and(|d| format!("{:04}", d.get()) == *discriminator)
            }
            _ => false,
        }
    }
}

/// Finds a guild member by mention, id, `name#discriminator`, name or nickname.
pub async fn find_member(ctx: Context<'_>, raw: &str) -> Option<Member> {
    let guild_id = ctx.guild_id()?;
    let query = MemberQuery::parse(raw);

    if let MemberQuery::Id(id) = query {
        return guild_id.member(ctx, id).await.ok();
    }

    let guild = ctx.guild()?;
    let members = || guild.members.values();

    if let Some(member) = members().find(|m| query.matches_tag(&m.user)) {
        return Some(member.clone());
    }

    members()
        .find(|m| m.user.name == raw)
        .or_else(|| members().find(|m| m.nick.as_deref() == Some(raw)))
        .cloned()
}

/// Same as [`find_member`], ids of users outside the guild are resolved as well.
pub async fn find_user(ctx: Context<'_>, raw: &str) -> Option<User> {
    if let MemberQuery::Id(id) = MemberQuery::parse(raw) {
        return id.to_user(ctx).await.ok();
    }

    find_member(ctx, raw).await.map(|m| m.user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_and_mentions() {
        let id = UserId::new(546320163276849162);
        assert_eq!(MemberQuery::parse("546320163276849162"), MemberQuery::Id(id));
        assert_eq!(MemberQuery::parse("<@546320163276849162>"), MemberQuery::Id(id));
        assert_eq!(MemberQuery::parse("<@!546320163276849162>"), MemberQuery::Id(id));
        // too short for a snowflake
        assert_eq!(MemberQuery::parse("1234"), MemberQuery::Name("1234"));
    }

    #[test]
    fn parses_tags_and_names() {
        assert_eq!(MemberQuery::parse("Albert#1234"), MemberQuery::Tag {
            name: "Albert",
            discriminator: "1234"
        });
        assert_eq!(MemberQuery::parse("#1234"), MemberQuery::Name("#1234"));
        assert_eq!(MemberQuery::parse("some name"), MemberQuery::Name("some name"));
        assert_eq!(MemberQuery::parse("c#sharp"), MemberQuery::Name("c#sharp"));
    }
}
