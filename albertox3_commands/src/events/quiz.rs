use std::fmt::Write;
use std::time::Duration;

use albertox3_core::colors;
use albertox3_core::data::session;
use albertox3_core::models::money;
use albertox3_core::models::permissions::PermissionLevel;
use albertox3_core::models::quiz::{self, Question};
use albertox3_core::models::settings::Setting;
use albertox3_core::translations::Args;
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, CreateActionRow, CreateButton, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use poise::CreateReply;
use rand::seq::SliceRandom;

use crate::utils::{embed, ensure, reply_embed, require_level, translator};
use crate::{commit_session, Context, Error, Scale};

pub const COLOUR: u32 = colors::PETERRIVER;
pub const CORRECT: u32 = colors::EMERLAND;
pub const WRONG: u32 = colors::ALIZARIN;
pub const TIMEOUT: u32 = colors::CONCRETE;

pub const REWARD: Setting<i32> = Setting::new("quiz", "reward", 10);

const ANSWER_TIMEOUT: Duration = Duration::from_secs(30);

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "events",
        name: "quiz",
        commands: || vec![quiz()],
        subscribe: None,
    }
}

async fn can_manage(ctx: Context<'_>) -> Result<bool, Error> {
    require_level(ctx, "quiz:manage", PermissionLevel::Moderator).await
}

/// Answer questions and earn money.
#[poise::command(
    prefix_command,
    category = "Events",
    subcommands("add_yesno", "add_quad", "groups", "ask"),
    subcommand_required
)]
pub async fn quiz(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Adds a question that is either true or false.
#[poise::command(prefix_command, rename = "add-yesno", check = "can_manage")]
pub async fn add_yesno(
    ctx: Context<'_>,
    group: String,
    is_true: bool,
    #[rest] question: String,
) -> Result<(), Error> {
    let t = translator(ctx, "quiz");
    ensure(valid_lengths(&group, &question, &[]), || Ok(t.text("add.too_long")?))?;

    let id = {
        let mut session = session(&ctx).await?;
        quiz::add_yesno(session.conn()?, &group, ctx.author().id, &question, is_true).await?
    };

    let description = t.format("add.added", &Args::new().with("id", id).with("group", &group))?;
    reply_embed(ctx, embed(ctx, COLOUR)?.description(description)).await
}

/// Adds a question with one correct and three wrong answers.
#[poise::command(prefix_command, rename = "add-quad", check = "can_manage")]
pub async fn add_quad(
    ctx: Context<'_>,
    group: String,
    question: String,
    correct: String,
    false1: String,
    false2: String,
    false3: String,
) -> Result<(), Error> {
    let t = translator(ctx, "quiz");
    let answers: [&str; 4] = [&correct, &false1, &false2, &false3];
    ensure(valid_lengths(&group, &question, &answers), || {
        Ok(t.text("add.too_long")?)
    })?;

    let id = {
        let mut session = session(&ctx).await?;
        quiz::add_quad(
            session.conn()?,
            &group,
            ctx.author().id,
            &question,
            &correct,
            [&false1, &false2, &false3],
        )
        .await?
    };

    let description = t.format("add.added", &Args::new().with("id", id).with("group", &group))?;
    reply_embed(ctx, embed(ctx, COLOUR)?.description(description)).await
}

/// Column limits of the quiz tables.
fn valid_lengths(group: &str, question: &str, answers: &[&str]) -> bool {
    let fits = |s: &str, max: usize| !s.trim().is_empty() && s.chars().count() <= max;
    fits(group, 64) && fits(question, 128) && answers.iter().all(|a| fits(a, 64))
}

/// Lists every group of questions.
#[poise::command(prefix_command)]
pub async fn groups(ctx: Context<'_>) -> Result<(), Error> {
    let groups = {
        let mut session = session(&ctx).await?;
        quiz::groups(session.conn()?).await?
    };

    let t = translator(ctx, "quiz");
    let mut description = String::new();
    for (group, count) in &groups {
        writeln!(
            description,
            "{}",
            t.plural("groups.entry", *count, &Args::new().with("group", group))?
        )?;
    }
    if groups.is_empty() {
        description = t.text("groups.none")?;
    }

    let embed = embed(ctx, COLOUR)?
        .title(t.text("groups.title")?)
        .description(description);
    reply_embed(ctx, embed).await
}

/// Shuffles the answers, returns them with the new index of the correct one.
fn shuffled(answers: Vec<String>, correct: usize, rng: &mut impl rand::Rng) -> (Vec<String>, usize) {
    let mut order: Vec<usize> = (0..answers.len()).collect();
    order.shuffle(rng);

    let correct = order.iter().position(|i| *i == correct).unwrap_or(correct);
    let answers = order.into_iter().map(|i| answers[i].clone()).collect();
    (answers, correct)
}

/// Asks a random question of a group.
#[poise::command(prefix_command)]
pub async fn ask(ctx: Context<'_>, #[rest] group: String) -> Result<(), Error> {
    let t = translator(ctx, "quiz");
    let questions = {
        let mut session = session(&ctx).await?;
        quiz::get_group(session.conn()?, &group).await?
    };

    let (question, answers, correct) = {
        let mut rng = rand::thread_rng();
        let question = questions.choose(&mut rng).cloned();
        match question {
            Some(question) => {
                let (answers, correct) =
                    question.answers(&t.text("ask.yes")?, &t.text("ask.no")?);
                let (answers, correct) = match question {
                    Question::YesNo(_) => (answers, correct),
                    Question::Quad(_) => shuffled(answers, correct, &mut rng),
                };
                (question, answers, correct)
            }
            None => {
                let message = t.format("ask.empty_group", &Args::new().with("group", &group))?;
                return Err(crate::utils::UserError::Assertion(message).into());
            }
        }
    };

    let prefix = format!("{}-quiz-", ctx.id());
    let buttons = answers
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            CreateButton::new(format!("{prefix}{i}"))
                .label(answer)
                .style(ButtonStyle::Primary)
        })
        .collect();

    let asked = embed(ctx, COLOUR)?
        .title(question.text())
        .description(t.format("ask.prompt", &Args::new().with("seconds", ANSWER_TIMEOUT.as_secs()))?);
    let reply = ctx
        .send(
            CreateReply::default()
                .embed(asked)
                .components(vec![CreateActionRow::Buttons(buttons)])
                .reply(true),
        )
        .await?;

    // nothing is written while waiting, the pooled connection goes back right away
    commit_session(ctx).await?;

    let filter_prefix = prefix.clone();
    let interaction = serenity::ComponentInteractionCollector::new(ctx)
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(ANSWER_TIMEOUT)
        .filter(move |i| i.data.custom_id.starts_with(&filter_prefix))
        .await;

    let Some(interaction) = interaction else {
        let timeout = embed(ctx, TIMEOUT)?
            .title(question.text())
            .description(t.format("ask.timeout", &Args::new().with("answer", &answers[correct]))?);
        reply
            .edit(ctx, CreateReply::default().embed(timeout).components(vec![]))
            .await?;
        return Ok(());
    };

    let chosen = interaction
        .data
        .custom_id
        .strip_prefix(&prefix)
        .and_then(|i| i.parse::<usize>().ok());

    let result = if chosen == Some(correct) {
        let reward = pay_reward(ctx).await?;
        embed(ctx, CORRECT)?.description(t.format(
            "ask.correct",
            &Args::new().with("reward", reward),
        )?)
    } else {
        embed(ctx, WRONG)?.description(t.format(
            "ask.wrong",
            &Args::new().with("answer", &answers[correct]),
        )?)
    };

    interaction
        .create_response(
            ctx,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embed(result.title(question.text()))
                    .components(vec![]),
            ),
        )
        .await?;

    Ok(())
}

async fn pay_reward(ctx: Context<'_>) -> Result<i32, Error> {
    let db = &ctx.data().database;
    let mut session = db.session().await?;
    let reward = REWARD.get(db, session.conn()?).await?;
    money::update(session.conn()?, ctx.author().id, reward, true).await?;
    session.commit().await?;
    Ok(reward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn shuffle_keeps_the_correct_answer() {
        let answers: Vec<String> = ["trait", "class", "interface", "impl"]
            .into_iter()
            .map(String::from)
            .collect();

        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (shuffled, correct) = shuffled(answers.clone(), 0, &mut rng);
            assert_eq!(shuffled[correct], "trait");
            assert_eq!(shuffled.len(), 4);
        }
    }

    #[test]
    fn length_limits() {
        assert!(valid_lengths("rust", "Is Rust fun?", &["yes"]));
        assert!(!valid_lengths("", "Is Rust fun?", &[]));
        assert!(!valid_lengths("rust", &"?".repeat(129), &[]));
        assert!(!valid_lengths("rust", "q", &[&"a".repeat(65)]));
    }
}
