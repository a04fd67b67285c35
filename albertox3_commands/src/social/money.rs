use albertox3_core::colors;
use albertox3_core::data::session;
use albertox3_core::models::money;
use albertox3_core::translations::Args;

use crate::utils::{embed, reply_embed, translator};
use crate::{Context, Error, Scale};

pub const COLOUR: u32 = colors::SUNFLOWER;

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "social",
        name: "money",
        commands: || vec![money()],
        subscribe: None,
    }
}

/// Shows your money and the money of everyone together.
#[poise::command(prefix_command, category = "Social")]
pub async fn money(ctx: Context<'_>) -> Result<(), Error> {
    let (amount, total) = {
        let mut session = session(&ctx).await?;
        let conn = session.conn()?;
        let amount = money::get(&mut *conn, ctx.author().id).await?;
        (i64::from(amount), money::total(conn).await?)
    };

    let t = translator(ctx, "money");
    let embed = embed(ctx, COLOUR)?
        .field(
            t.text("you.title")?,
            t.plural(
                "you.money",
                amount,
                &Args::new().with("emoji", money::tier_emoji(amount, total)),
            )?,
            false,
        )
        .field(
            t.text("all.title")?,
            t.plural(
                "all.money",
                total,
                &Args::new().with("emoji", money::tier_emoji(total, total)),
            )?,
            false,
        );

    reply_embed(ctx, embed).await
}
