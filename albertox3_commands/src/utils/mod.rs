pub mod checks;
pub mod members;

pub use checks::*;
pub use members::*;

use albertox3_core::colors;
use albertox3_core::translations::{Args, Translator};
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter};
use poise::CreateReply;

use crate::{Context, Error};

/// Errors caused by the invoking user, they are shown to them instead of being logged.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    Assertion(String),
    #[error("{0}")]
    NotImplemented(String),
}

impl UserError {
    #[must_use]
    pub fn colour(&self) -> u32 {
        match self {
            UserError::Assertion(_) => colors::ASSERTION,
            UserError::NotImplemented(_) => colors::NOT_IMPLEMENTED,
        }
    }
}

/// Fails with an assertion error if `condition` doesn't hold.
pub fn ensure(condition: bool, message: impl FnOnce() -> Result<String, Error>) -> Result<(), Error> {
    if condition {
        Ok(())
    } else {
        Err(UserError::Assertion(message()?).into())
    }
}

/// Locale of the invocation, prefix commands use the guilds preferred locale.
#[must_use]
pub fn locale(ctx: Context<'_>) -> Option<String> {
    if let Some(locale) = ctx.locale() {
        return Some(locale.to_owned());
    }
    ctx.guild().map(|g| g.preferred_locale.clone())
}

#[must_use]
pub fn translator<'a>(ctx: Context<'a>, namespace: &'static str) -> Translator<'a> {
    ctx.data().translator(locale(ctx).as_deref(), namespace)
}

/// "executed by ..." footer of every response.
pub fn footer(ctx: Context<'_>) -> Result<CreateEmbedFooter, Error> {
    let author = ctx.author();
    let text = translator(ctx, "g").format(
        "executed_by",
        &Args::new().with("user", author.tag()).with("id", author.id),
    )?;

    Ok(CreateEmbedFooter::new(text).icon_url(author.face()))
}

/// Base embed with timestamp, footer and colour.
pub fn embed(ctx: Context<'_>, colour: u32) -> Result<CreateEmbed, Error> {
    Ok(CreateEmbed::new()
        .timestamp(serenity::Timestamp::now())
        .footer(footer(ctx)?)
        .colour(colour))
}

pub async fn reply_embed(ctx: Context<'_>, embed: CreateEmbed) -> Result<(), Error> {
    ctx.send(CreateReply::default().embed(embed).reply(true))
        .await?;
    Ok(())
}

/// `!name <required> [optional]`
#[must_use]
pub fn format_usage<'a>(
    prefix: &str,
    name: &str,
    parameters: impl IntoIterator<Item = (&'a str, bool)>,
) -> String {
    let mut usage = format!("{prefix}{name}");
    for (parameter, required) in parameters {
        if required {
            usage.push_str(&format!(" <{parameter}>"));
        } else {
            usage.push_str(&format!(" [{parameter}]"));
        }
    }
    usage
}

/// Usage line of the invoked command.
#[must_use]
pub fn usage(ctx: Context<'_>) -> String {
    let command = ctx.command();
    format_usage(
        ctx.prefix(),
        &command.qualified_name,
        command
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.required)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_marks_optional_parameters() {
        assert_eq!(
            format_usage("!", "buy", [("id", false), ("quantity", false)]),
            "!buy [id] [quantity]"
        );
        assert_eq!(
            format_usage("!", "quiz add-yesno", [("group", true), ("is_true", true), ("question", true)]),
            "!quiz add-yesno <group> <is_true> <question>"
        );
        assert_eq!(format_usage(".", "about", []), ".about");
    }
}
