use albertox3_core::colors;
use albertox3_core::translations::Args;
use poise::serenity_prelude::CreateEmbedAuthor;

use crate::utils::{embed, reply_embed, translator};
use crate::{Context, Error, Scale};

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "information",
        name: "about",
        commands: || vec![about(), help()],
        subscribe: None,
    }
}

/// Shows information about the bot.
#[poise::command(prefix_command, category = "Information")]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let config = &ctx.data().config;
    let t = translator(ctx, "about");

    let mention = |c: &albertox3_core::contributor::Contributor| {
        c.discord_mention().unwrap_or_else(|| c.name.clone())
    };
    let contributors = if config.contributors.is_empty() {
        "/".to_owned()
    } else {
        config
            .contributors
            .iter()
            .map(mention)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let embed = embed(ctx, colors::DEFAULT)?
        .author(CreateEmbedAuthor::new(&config.repo.name).url(&config.repo.link).icon_url(&config.repo.icon))
        .title(t.format("title", &Args::new().with("name", &config.name))?)
        .field(t.text("version")?, &config.version, true)
        .field(t.text("author")?, mention(&config.author), true)
        .field(t.text("contributors")?, contributors, false)
        .field(t.text("repository")?, &config.repo.link, false)
        .field(t.text("support")?, &config.support_discord, false);

    reply_embed(ctx, embed).await
}

/// Shows the available commands.
#[poise::command(prefix_command, category = "Information")]
pub async fn help(ctx: Context<'_>, #[rest] command: Option<String>) -> Result<(), Error> {
    let footer = format!(
        "{} v{} | {}help <command>",
        ctx.data().config.name,
        ctx.data().config.version,
        ctx.data().config.prefix
    );
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: &footer,
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}
