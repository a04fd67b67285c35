use std::collections::BTreeMap;

use serde::Deserialize;
use serenity::all::UserId;
use sqlx::PgConnection;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, sqlx::FromRow)]
pub struct Item {
    #[serde(skip)]
    pub id: i32,
    #[serde(default)]
    pub buyable: bool,
    #[serde(default)]
    pub price: Option<i32>,
    #[serde(default)]
    pub max_available: Option<i32>,
}

impl Item {
    /// Units that can still be claimed, `None` means unlimited.
    #[must_use]
    pub fn stock(&self, claimed: i64) -> Option<i64> {
        self.max_available
            .map(|max| (i64::from(max) - claimed).max(0))
    }
}

/// Parses the item definitions, a mapping of item id to its properties.
pub fn parse_items(yaml: &str) -> Result<Vec<Item>, serde_yaml::Error> {
    let items: BTreeMap<i32, Option<Item>> = serde_yaml::from_str(yaml)?;

    Ok(items
        .into_iter()
        .map(|(id, item)| {
            let mut item = item.unwrap_or(Item {
                id,
                buyable: false,
                price: None,
                max_available: None,
            });
            item.id = id;
            item
        })
        .collect())
}

/// Inserts every item that doesn't exist yet, returns how many were added.
pub async fn insert_missing(conn: &mut PgConnection, items: &[Item]) -> Result<u64, sqlx::Error> {
    let mut added = 0;
    for item in items {
        added += sqlx::query(
            "INSERT INTO item (id, buyable, price, max_available) VALUES ($1, $2, $3, $4) ON \
             CONFLICT (id) DO NOTHING",
        )
        .bind(item.id)
        .bind(item.buyable)
        .bind(item.price)
        .bind(item.max_available)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }
    Ok(added)
}

pub async fn get_item(conn: &mut PgConnection, id: i32) -> Result<Option<Item>, sqlx::Error> {
    sqlx::query_as("SELECT id, buyable, price, max_available FROM item WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Reads an item and locks its row until the transaction ends, so purchases of the same item
/// run one after another.
pub async fn lock_item(conn: &mut PgConnection, id: i32) -> Result<Option<Item>, sqlx::Error> {
    sqlx::query_as("SELECT id, buyable, price, max_available FROM item WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Why a purchase can't happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refusal {
    NotBuyable,
    InvalidQuantity,
    SoldOut { stock: i64 },
    NotEnoughMoney { cost: i64, balance: i32 },
}

/// Decides whether `quantity` units can be bought, returns the total cost.
pub fn check_purchase(item: &Item, quantity: i32, claimed: i64, balance: i32) -> Result<i32, Refusal> {
    let price = item.price.filter(|_| item.buyable).ok_or(Refusal::NotBuyable)?;
    if quantity <= 0 {
        return Err(Refusal::InvalidQuantity);
    }
    if let Some(stock) = item.stock(claimed) {
        if stock < i64::from(quantity) {
            return Err(Refusal::SoldOut { stock });
        }
    }

    let cost = i64::from(price) * i64::from(quantity);
    if cost > i64::from(balance) {
        return Err(Refusal::NotEnoughMoney { cost, balance });
    }
    i32::try_from(cost).map_err(|_| Refusal::NotEnoughMoney { cost, balance })
}

/// Units of an item owned by all users together.
pub async fn claimed(conn: &mut PgConnection, item: i32) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM inventory WHERE item = $1")
        .bind(item)
        .fetch_one(conn)
        .await
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct InventoryEntry {
    pub item: i32,
    pub quantity: i32,
}

/// Every non-empty inventory slot of a user, sorted by item id.
pub async fn get_inventory(
    conn: &mut PgConnection,
    user: UserId,
) -> Result<Vec<InventoryEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT item, SUM(quantity)::INT AS quantity FROM inventory WHERE "user" = $1
           GROUP BY item HAVING SUM(quantity) <> 0 ORDER BY item"#,
    )
    .bind(user.get() as i64)
    .fetch_all(conn)
    .await
}

/// Sets (or with `relative` adds) the quantity, returns the new one.
pub async fn update(
    conn: &mut PgConnection,
    user: UserId,
    item: i32,
    quantity: i32,
    relative: bool,
) -> Result<i32, sqlx::Error> {
    let user = user.get() as i64;
    let current: Option<(i32, i32)> =
        sqlx::query_as(r#"SELECT id, quantity FROM inventory WHERE "user" = $1 AND item = $2"#)
            .bind(user)
            .bind(item)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        Some((id, old)) => {
            let new = if relative { old + quantity } else { quantity };
            sqlx::query("UPDATE inventory SET quantity = $2 WHERE id = $1")
                .bind(id)
                .bind(new)
                .execute(conn)
                .await?;
            Ok(new)
        }
        None => {
            sqlx::query(r#"INSERT INTO inventory ("user", item, quantity) VALUES ($1, $2, $3)"#)
                .bind(user)
                .bind(item)
                .bind(quantity)
                .execute(conn)
                .await?;
            Ok(quantity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_definitions() {
        let items = parse_items(
            "
1:
  buyable: true
  price: 100
2:
  buyable: false
  max_available: 3
3:
",
        )
        .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Item {
            id: 1,
            buyable: true,
            price: Some(100),
            max_available: None,
        });
        assert_eq!(items[1].max_available, Some(3));
        assert!(!items[2].buyable);
        assert_eq!(items[2].id, 3);
    }

    #[test]
    fn stock() {
        let limited = Item {
            id: 1,
            buyable: true,
            price: Some(5),
            max_available: Some(10),
        };
        assert_eq!(limited.stock(4), Some(6));
        assert_eq!(limited.stock(12), Some(0));

        let unlimited = Item {
            max_available: None,
            ..limited
        };
        assert_eq!(unlimited.stock(1000), None);
    }

    fn cookie() -> Item {
        Item {
            id: 1,
            buyable: true,
            price: Some(30),
            max_available: Some(5),
        }
    }

    #[test]
    fn purchase_costs() {
        assert_eq!(check_purchase(&cookie(), 2, 3, 60), Ok(60));
        assert_eq!(check_purchase(&Item { max_available: None, ..cookie() }, 100, 0, 3000), Ok(3000));
    }

    #[test]
    fn purchase_refusals() {
        let item = cookie();
        assert_eq!(
            check_purchase(&Item { buyable: false, ..item.clone() }, 1, 0, 100),
            Err(Refusal::NotBuyable)
        );
        assert_eq!(
            check_purchase(&Item { price: None, ..item.clone() }, 1, 0, 100),
            Err(Refusal::NotBuyable)
        );
        assert_eq!(check_purchase(&item, 0, 0, 100), Err(Refusal::InvalidQuantity));
        assert_eq!(check_purchase(&item, -3, 0, 100), Err(Refusal::InvalidQuantity));
    }

    #[test]
    fn sold_out() {
        assert_eq!(check_purchase(&cookie(), 3, 3, 1000), Err(Refusal::SoldOut { stock: 2 }));
        assert_eq!(check_purchase(&cookie(), 1, 7, 1000), Err(Refusal::SoldOut { stock: 0 }));
    }

    #[test]
    fn insufficient_funds() {
        assert_eq!(
            check_purchase(&cookie(), 2, 0, 59),
            Err(Refusal::NotEnoughMoney { cost: 60, balance: 59 })
        );
        // a huge order must not wrap around into an affordable price
        let pricey = Item { price: Some(i32::MAX), max_available: None, ..cookie() };
        assert_eq!(
            check_purchase(&pricey, i32::MAX, 0, i32::MAX),
            Err(Refusal::NotEnoughMoney {
                cost: i64::from(i32::MAX) * i64::from(i32::MAX),
                balance: i32::MAX,
            })
        );
    }
}
