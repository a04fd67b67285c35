use albertox3_commands::utils::{embed, translator, usage, CheckError, UserError};
use albertox3_commands::{commit_session, Context, Data, Error};
use albertox3_core::colors;
use albertox3_core::translations::Args;
use poise::serenity_prelude as serenity;
use poise::CreateReply;

async fn send_embed(ctx: Context<'_>, colour: u32, description: String) {
    let embed = match embed(ctx, colour) {
        Ok(embed) => embed.description(description),
        Err(e) => {
            tracing::warn!("Failed to build the error embed: {e}");
            serenity::CreateEmbed::new().colour(colour).description(description)
        }
    };
    let _ = ctx
        .send(CreateReply::default().embed(embed).reply(true))
        .await;
}

async fn handle_command_error(ctx: Context<'_>, error: Error) {
    if let Err(e) = commit_session(ctx).await {
        tracing::error!("Failed to commit the session of {}: {e}", ctx.command().qualified_name);
    }

    if let Some(user_error) = error.downcast_ref::<UserError>() {
        send_embed(ctx, user_error.colour(), user_error.to_string()).await;
        return;
    }

    tracing::error!("Error in command `{}`: {error:?}", ctx.command().qualified_name);
    send_embed(ctx, colors::ERROR, error.to_string()).await;
}

fn check_message(ctx: Context<'_>, error: &CheckError) -> Result<String, Error> {
    let t = translator(ctx, "g");
    Ok(match error {
        CheckError::ScaleDisabled(scale) => {
            t.format("scale_disabled", &Args::new().with("scale", scale))?
        }
        CheckError::MissingLevel { required } => {
            t.format("no_perms", &Args::new().with("required", required))?
        }
    })
}

async fn handle_command_check_failed(ctx: Context<'_>, error: Option<Error>) {
    // Blocked users fail silently.
    let Some(error) = error else {
        return;
    };

    let Some(check_error) = error.downcast_ref::<CheckError>() else {
        tracing::error!("Error in the checks of `{}`: {error}", ctx.command().qualified_name);
        return;
    };

    match check_message(ctx, check_error) {
        Ok(message) => send_embed(ctx, colors::DEEPORANGE_A400, message).await,
        Err(e) => tracing::error!("Failed to translate a check failure: {e}"),
    }
}

fn argument_message(ctx: Context<'_>, input: Option<&str>, error: &Error) -> Result<String, Error> {
    let t = translator(ctx, "g");
    let problem = match input {
        Some(input) => t.format(
            "argument.invalid",
            &Args::new().with("input", input).with("error", error),
        )?,
        None => t.format("argument.missing", &Args::new().with("error", error))?,
    };
    let line = t.format("argument.usage", &Args::new().with("usage", usage(ctx)))?;
    Ok(format!("{problem}\n{line}"))
}

async fn handle_argument_parse_error(ctx: Context<'_>, input: Option<String>, error: Error) {
    match argument_message(ctx, input.as_deref(), &error) {
        Ok(message) => send_embed(ctx, colors::ASSERTION, message).await,
        Err(e) => tracing::error!("Failed to translate an argument error: {e}"),
    }
}

pub async fn handler(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => handle_command_error(ctx, error).await,
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            handle_command_check_failed(ctx, error).await;
        }
        poise::FrameworkError::ArgumentParse {
            error, input, ctx, ..
        } => handle_argument_parse_error(ctx, input, error).await,
        poise::FrameworkError::EventHandler { error, event, .. } => {
            tracing::error!("Error in event handler for {}: {error}", event.snake_case_name());
        }
        poise::FrameworkError::UnknownCommand { .. } => {}
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!("Error while handling error: {e}");
            }
        }
    }
}
