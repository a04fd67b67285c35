use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;
use sqlx::PgConnection;

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[^\x{0000}-\x{0040}\x{005B}-\x{0060}\x{007B}-\x{00BF}\x{02B0}-\x{036F}\x{00D7}\x{00F7}\x{2000}-\x{2BFF}]+",
    )
    .unwrap()
});

static RE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[a-z\d](?:[a-z\d\-]{0,61}[a-z\d])?\.)+[a-z\d][a-z\d\-]{0,61}[a-z\d]").unwrap()
});

/// Every word of a text, lower-cased.
#[must_use]
pub fn words(text: &str) -> BTreeSet<String> {
    RE_WORD
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// Every domain-shaped part of a text, lower-cased and without a leading `www.`.
#[must_use]
pub fn links(text: &str) -> BTreeSet<String> {
    RE_LINK
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().trim_start_matches("www.").to_owned())
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    BadWords,
    ScamLinks,
}

impl ListKind {
    fn table(self) -> &'static str {
        match self {
            ListKind::BadWords => "bad_words",
            ListKind::ScamLinks => "scam_links",
        }
    }

    fn column(self) -> &'static str {
        match self {
            ListKind::BadWords => "word",
            ListKind::ScamLinks => "link",
        }
    }

    /// Normalises a list value the same way messages are tokenised.
    #[must_use]
    pub fn normalise(self, value: &str) -> String {
        let value = value.trim().to_lowercase();
        match self {
            ListKind::BadWords => value,
            ListKind::ScamLinks => value.trim_start_matches("www.").to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListEntry {
    pub value: String,
    pub weight: i32,
    pub reason: String,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct StoredEntry {
    pub value: String,
    pub weight: i32,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CsvError {
    #[error("line {line}: expected `value,weight,reason`")]
    MissingColumn { line: usize },
    #[error("line {line}: `{weight}` is not a valid weight")]
    InvalidWeight { line: usize, weight: String },
}

/// Parses `value,weight,reason` lines, blank lines and lines starting with `#` are skipped.
pub fn parse_csv(text: &str, kind: ListKind) -> Result<Vec<ListEntry>, CsvError> {
    let mut entries = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut columns = line.splitn(3, ',');
        let (Some(value), Some(weight), Some(reason)) =
            (columns.next(), columns.next(), columns.next())
        else {
            return Err(CsvError::MissingColumn { line: line_no });
        };

        let weight = weight.trim();
        let weight = weight.parse().map_err(|_| CsvError::InvalidWeight {
            line: line_no,
            weight: weight.to_owned(),
        })?;

        entries.push(ListEntry {
            value: kind.normalise(value),
            weight,
            reason: reason.trim().trim_matches('"').to_owned(),
        });
    }

    Ok(entries)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Score {
    pub words: Vec<(String, i32)>,
    pub links: Vec<(String, i32)>,
}

impl Score {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.words
            .iter()
            .chain(&self.links)
            .map(|(_, weight)| i64::from(*weight))
            .sum()
    }
}

/// In-memory copy of the bad word and scam link lists.
#[derive(Default)]
pub struct AutomodLists {
    words: RwLock<HashMap<String, i32>>,
    links: RwLock<HashMap<String, i32>>,
}

impl AutomodLists {
    fn list(&self, kind: ListKind) -> &RwLock<HashMap<String, i32>> {
        match kind {
            ListKind::BadWords => &self.words,
            ListKind::ScamLinks => &self.links,
        }
    }

    pub fn replace(&self, kind: ListKind, entries: impl IntoIterator<Item = (String, i32)>) {
        *self.list(kind).write() = entries.into_iter().collect();
    }

    pub fn insert(&self, kind: ListKind, value: String, weight: i32) {
        self.list(kind).write().insert(value, weight);
    }

    pub fn remove(&self, kind: ListKind, value: &str) {
        self.list(kind).write().remove(value);
    }

    #[must_use]
    pub fn len(&self, kind: ListKind) -> usize {
        self.list(kind).read().len()
    }

    /// Sums the weights of every listed word and link found in the text, each counted once.
    #[must_use]
    pub fn score(&self, text: &str) -> Score {
        fn matches(found: BTreeSet<String>, list: &HashMap<String, i32>) -> Vec<(String, i32)> {
            found
                .into_iter()
                .filter_map(|value| list.get(&value).map(|weight| (value, *weight)))
                .collect()
        }

        Score {
            words: matches(words(text), &self.words.read()),
            links: matches(links(text), &self.links.read()),
        }
    }
}

pub async fn entries(conn: &mut PgConnection, kind: ListKind) -> Result<Vec<StoredEntry>, sqlx::Error> {
    let query = format!(
        "SELECT {column} AS value, weight, reason, timestamp FROM {table} ORDER BY {column}",
        column = kind.column(),
        table = kind.table()
    );
    sqlx::query_as(&query).fetch_all(conn).await
}

/// Returns `false` if the value was already listed.
pub async fn add(conn: &mut PgConnection, kind: ListKind, entry: &ListEntry) -> Result<bool, sqlx::Error> {
    let query = format!(
        "INSERT INTO {table} ({column}, weight, reason, timestamp) VALUES ($1, $2, $3, $4) ON \
         CONFLICT ({column}) DO NOTHING",
        column = kind.column(),
        table = kind.table()
    );

    let added = sqlx::query(&query)
        .bind(&entry.value)
        .bind(entry.weight)
        .bind(&entry.reason)
        .bind(Utc::now())
        .execute(conn)
        .await?
        .rows_affected();
    Ok(added > 0)
}

/// Returns `false` if the value wasn't listed.
pub async fn remove(conn: &mut PgConnection, kind: ListKind, value: &str) -> Result<bool, sqlx::Error> {
    let query = format!(
        "DELETE FROM {table} WHERE {column} = $1",
        column = kind.column(),
        table = kind.table()
    );

    let removed = sqlx::query(&query)
        .bind(value)
        .execute(conn)
        .await?
        .rows_affected();
    Ok(removed > 0)
}

/// Inserts every entry that isn't stored yet, returns how many were added.
pub async fn sync(conn: &mut PgConnection, kind: ListKind, entries: &[ListEntry]) -> Result<usize, sqlx::Error> {
    let mut added = 0;
    for entry in entries {
        if add(&mut *conn, kind, entry).await? {
            added += 1;
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenises_words() {
        let found = words("Hello, WORLD! it's ärger-frei 42");
        let expected: BTreeSet<String> = ["hello", "world", "it", "s", "ärger", "frei"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn extracts_links() {
        let found = links("Free nitro at https://www.Discord-Gift.com/claim and steam.community.xyz!");
        assert!(found.contains("discord-gift.com"));
        assert!(found.contains("steam.community.xyz"));
        assert!(links("nothing to see here.").is_empty());
    }

    #[test]
    fn scores_each_entry_once() {
        let lists = AutomodLists::default();
        lists.replace(ListKind::BadWords, [("idiot".to_string(), 4), ("dumb".to_string(), 3)]);
        lists.replace(ListKind::ScamLinks, [("discord-gift.com".to_string(), 10)]);

        let score = lists.score("idiot IDIOT, you are dumb");
        assert_eq!(score.total(), 7);
        assert!(score.links.is_empty());

        let score = lists.score("claim at www.discord-gift.com");
        assert_eq!(score.total(), 10);
        assert_eq!(score.links, vec![("discord-gift.com".to_string(), 10)]);

        lists.remove(ListKind::BadWords, "dumb");
        assert_eq!(lists.score("dumb").total(), 0);
        assert_eq!(lists.len(ListKind::BadWords), 1);
    }

    #[test]
    fn parses_csv() {
        let text = "# word,weight,reason\n\nIdiot, 4, insult\nscam,10,\"a, quoted reason\"\n";
        let entries = parse_csv(text, ListKind::BadWords).unwrap();
        assert_eq!(entries, vec![
            ListEntry {
                value: "idiot".into(),
                weight: 4,
                reason: "insult".into(),
            },
            ListEntry {
                value: "scam".into(),
                weight: 10,
                reason: "a, quoted reason".into(),
            },
        ]);

        let links = parse_csv("www.Evil.com,5,phishing", ListKind::ScamLinks).unwrap();
        assert_eq!(links[0].value, "evil.com");
    }

    #[test]
    fn csv_errors() {
        assert_eq!(
            parse_csv("# header\nword,1", ListKind::BadWords),
            Err(CsvError::MissingColumn { line: 2 })
        );
        assert_eq!(
            parse_csv("word,heavy,reason", ListKind::BadWords),
            Err(CsvError::InvalidWeight {
                line: 1,
                weight: "heavy".into()
            })
        );
    }
}
