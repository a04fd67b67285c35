use albertox3_core::colors;
use albertox3_core::data::{session, Data};
use albertox3_core::models::inventory::Refusal;
use albertox3_core::models::{inventory, money};
use albertox3_core::translations::{Args, Translator};

use crate::utils::{embed, reply_embed, translator, UserError};
use crate::{Context, Error, Scale};

pub const COLOUR: u32 = colors::AMETHYST;

#[must_use]
pub fn scale() -> Scale {
    Scale {
        category: "social",
        name: "inventory",
        commands: || vec![item(), inventory(), buy()],
        subscribe: None,
    }
}

/// Stores every item of `items.yml` that isn't in the database yet.
pub async fn create_all_items(data: &Data) -> Result<(), Error> {
    let path = data.config.scales_folder.join("inventory").join("items.yml");
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("No item definitions at {}: {e}", path.display());
            return Ok(());
        }
    };
    let items = inventory::parse_items(&text)?;

    let mut session = data.database.session().await?;
    let added = inventory::insert_missing(session.conn()?, &items).await?;
    session.commit().await?;

    tracing::info!("Loaded {} item(s), {added} new", items.len());
    Ok(())
}

fn item_name(t: &Translator<'_>, id: i32) -> Result<String, Error> {
    Ok(t.text(&format!("items.{id}.name"))?)
}

/// Looks up a known item id, anything else fails with "item not found".
async fn known_item(
    ctx: Context<'_>,
    t: &Translator<'_>,
    raw: Option<&str>,
) -> Result<inventory::Item, Error> {
    let raw = raw.unwrap_or_default();
    let id = raw
        .parse::<i32>()
        .ok()
        .filter(|id| t.contains(&format!("items.{id}")));

    let found = match id {
        Some(id) => {
            let mut session = session(&ctx).await?;
            inventory::get_item(session.conn()?, id).await?
        }
        None => None,
    };

    match found {
        Some(item) => Ok(item),
        None => {
            Err(UserError::Assertion(t.format("item.not_found", &Args::new().with("item", raw))?).into())
        }
    }
}

/// Shows the name, description and availability of an item.
#[poise::command(prefix_command, category = "Social")]
pub async fn item(ctx: Context<'_>, id: Option<String>) -> Result<(), Error> {
    let t = translator(ctx, "inventory");
    let item = known_item(ctx, &t, id.as_deref()).await?;

    let mut info = vec![t.format(
        "item.description",
        &Args::new().with("description", t.text(&format!("items.{}.description", item.id))?),
    )?];
    if let Some(price) = item.price.filter(|_| item.buyable) {
        info.push(t.format("item.price", &Args::new().with("price", price))?);
    }
    if let Some(max) = item.max_available {
        info.push(t.plural("item.quantity", i64::from(max), &Args::new())?);
    }

    let embed = embed(ctx, COLOUR)?.field(item_name(&t, item.id)?, info.join("\n\n"), false);
    reply_embed(ctx, embed).await
}

/// Lists everything you own.
#[poise::command(prefix_command, category = "Social")]
pub async fn inventory(ctx: Context<'_>) -> Result<(), Error> {
    let entries = {
        let mut session = session(&ctx).await?;
        inventory::get_inventory(session.conn()?, ctx.author().id).await?
    };

    let t = translator(ctx, "inventory");
    let mut embed = embed(ctx, COLOUR)?.description(t.text("inventory")?);

    for entry in &entries {
        let name = format!(
            "{} | {}",
            t.format("item.id", &Args::new().with("id", entry.item))?,
            t.format("item.name", &Args::new().with("name", item_name(&t, entry.item)?))?
        );
        embed = embed.field(
            name,
            t.plural("item.quantity", i64::from(entry.quantity), &Args::new())?,
            true,
        );
    }

    if entries.is_empty() {
        embed = embed.field(
            format!(
                "{} | {}",
                t.format("item.id", &Args::new().with("id", "/"))?,
                t.format("item.name", &Args::new().with("name", "/"))?
            ),
            t.format("item.description", &Args::new().with("description", "/"))?,
            false,
        );
    }

    reply_embed(ctx, embed).await
}

/// Buys an item with your money.
#[poise::command(prefix_command, category = "Social")]
pub async fn buy(ctx: Context<'_>, id: Option<String>, quantity: Option<i32>) -> Result<(), Error> {
    let t = translator(ctx, "inventory");
    let item = known_item(ctx, &t, id.as_deref()).await?;
    let quantity = quantity.unwrap_or(1);
    let name = item_name(&t, item.id)?;
    let user = ctx.author().id;

    // own transaction, the item row stays locked only for the purchase itself
    let mut purchase = ctx.data().database.session().await?;
    let conn = purchase.conn()?;

    let item = inventory::lock_item(&mut *conn, item.id).await?.unwrap_or(item);
    let claimed = inventory::claimed(&mut *conn, item.id).await?;
    let balance = money::get(&mut *conn, user).await?;
    let cost = inventory::check_purchase(&item, quantity, claimed, balance)
        .map_err(|refusal| refused(&t, &name, refusal))?;

    let Some(balance) = money::debit(&mut *conn, user, cost).await? else {
        let balance = money::get(&mut *conn, user).await?;
        return Err(refused(&t, &name, Refusal::NotEnoughMoney {
            cost: i64::from(cost),
            balance,
        }));
    };
    let owned = inventory::update(conn, user, item.id, quantity, true).await?;
    purchase.commit().await?;

    let embed = embed(ctx, COLOUR)?.description(t.plural(
        "buy.bought",
        i64::from(quantity),
        &Args::new()
            .with("name", &name)
            .with("price", cost)
            .with("money", balance)
            .with("owned", owned),
    )?);
    reply_embed(ctx, embed).await
}

fn refused(t: &Translator<'_>, name: &str, refusal: Refusal) -> Error {
    let message = match refusal {
        Refusal::NotBuyable => t.format("buy.not_buyable", &Args::new().with("name", name)),
        Refusal::InvalidQuantity => t.text("buy.invalid_quantity"),
        Refusal::SoldOut { stock } => {
            t.plural("buy.sold_out", stock, &Args::new().with("name", name))
        }
        Refusal::NotEnoughMoney { cost, balance } => t.format(
            "buy.not_enough_money",
            &Args::new().with("price", cost).with("money", balance),
        ),
    };

    match message {
        Ok(message) => UserError::Assertion(message).into(),
        Err(e) => e.into(),
    }
}
