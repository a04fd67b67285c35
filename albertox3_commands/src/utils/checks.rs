use albertox3_core::models::blocked;
use albertox3_core::models::permissions::{self, PermissionLevel};
use poise::serenity_prelude::Permissions;

use crate::{Context, Error};

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("the scale `{0}` is disabled")]
    ScaleDisabled(&'static str),
    #[error("at least the {required} level is required")]
    MissingLevel { required: PermissionLevel },
}

/// Level derived from the guild permissions, contributors are always owners.
pub async fn member_level(ctx: Context<'_>) -> Result<PermissionLevel, Error> {
    let id = ctx.author().id.get();
    let config = &ctx.data().config;
    if config.is_author(id) || config.is_contributor(id) {
        return Ok(PermissionLevel::Owner);
    }

    let Some(member) = ctx.author_member().await else {
        return Ok(PermissionLevel::Public);
    };

    let permissions = {
        let Some(guild) = ctx.guild() else {
            return Ok(PermissionLevel::Public);
        };
        guild.member_permissions(&member)
    };

    Ok(level_from_permissions(permissions))
}

#[must_use]
pub fn level_from_permissions(permissions: Permissions) -> PermissionLevel {
    if permissions.administrator() {
        PermissionLevel::Admin
    } else if permissions.manage_messages() {
        PermissionLevel::Moderator
    } else {
        PermissionLevel::Public
    }
}

/// Checks the level stored for `permission` (or `default`) against the invoking member.
pub async fn require_level(
    ctx: Context<'_>,
    permission: &str,
    default: PermissionLevel,
) -> Result<bool, Error> {
    let data = ctx.data();
    let required = {
        let mut conn = data.database.db.acquire().await?;
        permissions::get(&data.database, &mut conn, permission, default).await?
    };

    if member_level(ctx).await? >= required {
        Ok(true)
    } else {
        Err(CheckError::MissingLevel { required }.into())
    }
}

pub async fn owner(ctx: Context<'_>) -> Result<bool, Error> {
    require_level(ctx, "owner", PermissionLevel::Owner).await
}

pub async fn admin(ctx: Context<'_>) -> Result<bool, Error> {
    require_level(ctx, "admin", PermissionLevel::Admin).await
}

/// Blocked users can't use any command, their invocations fail silently.
pub async fn is_blocked(ctx: Context<'_>) -> Result<bool, Error> {
    let id = ctx.author().id;
    if ctx.data().config.is_author(id.get()) {
        return Ok(false);
    }

    let data = ctx.data();
    let mut conn = data.database.db.acquire().await?;
    Ok(blocked::is_blocked(&data.database, &mut conn, id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_from_permissions() {
        assert_eq!(level_from_permissions(Permissions::empty()), PermissionLevel::Public);
        assert_eq!(
            level_from_permissions(Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES),
            PermissionLevel::Moderator
        );
        assert_eq!(
            level_from_permissions(Permissions::ADMINISTRATOR),
            PermissionLevel::Admin
        );
    }
}
