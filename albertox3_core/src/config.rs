use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::Value;

use crate::contributor::Contributor;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable `{0}`")]
    MissingEnv(&'static str),
    #[error("invalid value `{value}` for environment variable `{key}`")]
    InvalidEnv { key: &'static str, value: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown contributor `{0}`")]
    UnknownContributor(String),
    #[error("language `{0}` is not listed in `language.available`")]
    UnknownLanguage(String),
}

/// Process environment, read once at start.
#[derive(Clone, Debug)]
pub struct Environment {
    pub token: String,
    pub database_url: Option<String>,
    pub db_host: String,
    pub db_port: u16,
    pub db_database: String,
    pub db_username: String,
    pub db_password: String,
    pub db_pool_recycle: Duration,
    pub db_pool_size: u32,
    pub db_pool_max_overflow: u32,
    pub db_show_sql_statements: bool,
    pub cache_ttl: Duration,
    pub config_path: PathBuf,
}

impl Environment {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Environment {
            token: lookup("TOKEN").ok_or(ConfigError::MissingEnv("TOKEN"))?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            db_host: var("DB_HOST", "127.0.0.1"),
            db_port: parse_env(&lookup, "DB_PORT", 5432)?,
            db_database: var("DB_DATABASE", "AlbertoX3"),
            db_username: var("DB_USERNAME", "AlbertoX3"),
            db_password: var("DB_PASSWORD", "AlbertoX3"),
            db_pool_recycle: Duration::from_secs(parse_env(&lookup, "DB_POOL_RECYCLE", 300)?),
            db_pool_size: parse_env(&lookup, "DB_POOL_SIZE", 20)?,
            db_pool_max_overflow: parse_env(&lookup, "DB_POOL_MAX_OVERFLOW", 20)?,
            db_show_sql_statements: lookup("DB_SHOW_SQL_STATEMENTS").is_some_and(|v| get_bool(&v)),
            cache_ttl: Duration::from_secs(parse_env(&lookup, "CACHE_TTL", 300)?),
            config_path: PathBuf::from(var("CONFIG_PATH", "config.yml")),
        })
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        None => Ok(default),
    }
}

/// Interprets the usual spellings of a truthy flag.
#[must_use]
pub fn get_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y" | "on"
    )
}

#[derive(Deserialize)]
struct RawConfig {
    name: String,
    prefix: String,
    repo: RawRepo,
    discord: String,
    author: String,
    #[serde(default)]
    contributors: Vec<String>,
    #[serde(default)]
    contributor: HashMap<String, RawContributor>,
    language: LanguageConfig,
    scale: RawScale,
    #[serde(default)]
    automod: RawAutomod,
    #[serde(default)]
    debug_guild: Option<u64>,
}

#[derive(Deserialize)]
struct RawRepo {
    owner: String,
    name: String,
    icon: String,
}

#[derive(Deserialize)]
struct RawContributor {
    #[serde(default)]
    discord: Value,
    #[serde(default)]
    github_id: Value,
    #[serde(default)]
    github_node_id: Value,
}

#[derive(Deserialize)]
struct RawScale {
    folder: PathBuf,
    #[serde(default)]
    disabled: Vec<String>,
}

#[derive(Deserialize, Default)]
struct RawAutomod {
    bad_words: Option<PathBuf>,
    scam_links: Option<PathBuf>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LanguageConfig {
    pub default: String,
    pub fallback: String,
    pub available: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Repo {
    pub owner: String,
    pub name: String,
    pub link: String,
    pub icon: String,
}

#[derive(Clone, Debug, Default)]
pub struct AutomodConfig {
    pub bad_words: Option<PathBuf>,
    pub scam_links: Option<PathBuf>,
}

/// Global bot configuration, loaded from `config.yml`.
#[derive(Clone, Debug)]
pub struct Config {
    pub name: String,
    pub version: String,
    pub prefix: String,
    pub repo: Repo,
    pub support_discord: String,
    pub author: Contributor,
    pub contributors: Vec<Contributor>,
    pub language: LanguageConfig,
    /// Folder holding one resource folder per scale (translations, item lists, ...).
    pub scales_folder: PathBuf,
    pub disabled_scales: Vec<String>,
    pub automod: AutomodConfig,
    pub debug_guild: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut config = Self::from_yaml(&text, base)?;
        config.version = version_with_git(&config.version);
        Ok(config)
    }

    /// Parses the config, relative paths are resolved against `base`.
    pub fn from_yaml(text: &str, base: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;

        let contributor = |name: &str| {
            raw.contributor
                .get(name)
                .map(|c| {
                    Contributor::from_values(name, &c.discord, &c.github_id, &c.github_node_id)
                })
                .ok_or_else(|| ConfigError::UnknownContributor(name.to_owned()))
        };

        let author = contributor(&raw.author)?;
        let contributors = raw
            .contributors
            .iter()
            .map(|name| contributor(name))
            .collect::<Result<Vec<_>, _>>()?;

        for language in [&raw.language.default, &raw.language.fallback] {
            if !raw.language.available.contains(language) {
                return Err(ConfigError::UnknownLanguage(language.clone()));
            }
        }

        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        };

        Ok(Config {
            name: raw.name,
            version: env!("CARGO_PKG_VERSION").to_owned(),
            prefix: raw.prefix,
            repo: Repo {
                link: format!("https://github.com/{}/{}", raw.repo.owner, raw.repo.name),
                owner: raw.repo.owner,
                name: raw.repo.name,
                icon: raw.repo.icon,
            },
            support_discord: raw.discord,
            author,
            contributors,
            language: raw.language,
            scales_folder: resolve(raw.scale.folder),
            disabled_scales: raw.scale.disabled,
            automod: AutomodConfig {
                bad_words: raw.automod.bad_words.map(resolve),
                scam_links: raw.automod.scam_links.map(resolve),
            },
            debug_guild: raw.debug_guild,
        })
    }

    /// Whether the id belongs to the author of the bot.
    #[must_use]
    pub fn is_author(&self, id: u64) -> bool {
        self.author.discord_id == Some(id)
    }

    #[must_use]
    pub fn is_contributor(&self, id: u64) -> bool {
        self.contributors.iter().any(|c| c.discord_id == Some(id))
    }

    /// Human readable dump of every value.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let contributors = self
            .contributors
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let _ = writeln!(out, "NAME = {}", self.name);
        let _ = writeln!(out, "VERSION = {}", self.version);
        let _ = writeln!(out, "PREFIX = {}", self.prefix);
        let _ = writeln!(out, "REPO_LINK = {}", self.repo.link);
        let _ = writeln!(out, "REPO_ICON = {}", self.repo.icon);
        let _ = writeln!(out, "SUPPORT_DISCORD = {}", self.support_discord);
        let _ = writeln!(out, "AUTHOR = {}", self.author.name);
        let _ = writeln!(out, "CONTRIBUTORS = {contributors}");
        let _ = writeln!(out, "LANGUAGE_DEFAULT = {}", self.language.default);
        let _ = writeln!(out, "LANGUAGE_FALLBACK = {}", self.language.fallback);
        let _ = writeln!(
            out,
            "LANGUAGE_AVAILABLE = {}",
            self.language.available.join(", ")
        );
        let _ = writeln!(out, "SCALES_FOLDER = {}", self.scales_folder.display());
        let _ = writeln!(out, "SCALES_DISABLED = {}", self.disabled_scales.join(", "));
        out
    }
}

/// Appends the commit count and short hash when running from a git checkout.
fn version_with_git(base: &str) -> String {
    let git = |args: &[&str]| -> Result<Option<String>, std::io::Error> {
        let output = std::process::Command::new("git").args(args).output()?;
        let out = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        Ok((output.status.success() && !out.is_empty()).then_some(out))
    };

    let mut version = base.to_owned();
    match (git(&["rev-list", "--count", "HEAD"]), git(&["rev-parse", "--short", "HEAD"])) {
        (Ok(count), Ok(hash)) => {
            if let Some(count) = count {
                version.push_str(&count);
            }
            if let Some(hash) = hash {
                let _ = write!(version, "+g{hash}");
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Unable to append version identifier: {e}");
        }
    }
    version
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
name: AlbertoX3
prefix: "a."
repo:
  owner: Alberto-X3
  name: Alberto-X3-V2
  icon: https://github.com/Alberto-X3.png
discord: https://discord.gg/example
author: AlbertUnruh
contributors:
  - AlbertUnruh
contributor:
  AlbertUnruh:
    discord: 546320163276849162
    github_id: 73029826
    github_node_id: MDQ6VXNlcjczMDI5ODI2
language:
  default: en
  fallback: en
  available: [en, de]
scale:
  folder: resources
  disabled: [profile]
automod:
  bad_words: resources/automod/bad_words.csv
"#;

    #[test]
    fn parses_config() {
        let config = Config::from_yaml(CONFIG, Path::new("/srv/bot")).unwrap();

        assert_eq!(config.prefix, "a.");
        assert_eq!(config.repo.link, "https://github.com/Alberto-X3/Alberto-X3-V2");
        assert_eq!(config.scales_folder, PathBuf::from("/srv/bot/resources"));
        assert_eq!(
            config.automod.bad_words,
            Some(PathBuf::from("/srv/bot/resources/automod/bad_words.csv"))
        );
        assert_eq!(config.automod.scam_links, None);
        assert_eq!(config.disabled_scales, ["profile"]);
        assert!(config.is_author(546320163276849162));
        assert!(config.is_contributor(546320163276849162));
        assert!(!config.is_contributor(1));
        assert!(config.describe().contains("LANGUAGE_AVAILABLE = en, de"));
    }

    #[test]
    fn unknown_contributor_is_rejected() {
        let text = CONFIG.replace("author: AlbertUnruh", "author: Nobody");
        assert!(matches!(
            Config::from_yaml(&text, Path::new(".")),
            Err(ConfigError::UnknownContributor(name)) if name == "Nobody"
        ));
    }

    #[test]
    fn fallback_must_be_available() {
        let text = CONFIG.replace("fallback: en", "fallback: fr");
        assert!(matches!(
            Config::from_yaml(&text, Path::new(".")),
            Err(ConfigError::UnknownLanguage(lang)) if lang == "fr"
        ));
    }

    #[test]
    fn environment_defaults() {
        let env = Environment::from_lookup(|key| (key == "TOKEN").then(|| "abc".to_owned())).unwrap();

        assert_eq!(env.token, "abc");
        assert_eq!(env.db_host, "127.0.0.1");
        assert_eq!(env.db_port, 5432);
        assert_eq!(env.db_pool_size, 20);
        assert_eq!(env.db_pool_recycle, Duration::from_secs(300));
        assert!(!env.db_show_sql_statements);
        assert_eq!(env.database_url, None);
    }

    #[test]
    fn environment_overrides_and_errors() {
        let vars: HashMap<&str, &str> = [
            ("TOKEN", "abc"),
            ("DB_PORT", "6543"),
            ("DB_SHOW_SQL_STATEMENTS", "Yes"),
            ("CACHE_TTL", "5"),
        ]
        .into_iter()
        .collect();
        let env = Environment::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned())).unwrap();
        assert_eq!(env.db_port, 6543);
        assert!(env.db_show_sql_statements);
        assert_eq!(env.cache_ttl, Duration::from_secs(5));

        assert!(matches!(
            Environment::from_lookup(|_| None),
            Err(ConfigError::MissingEnv("TOKEN"))
        ));
        assert!(matches!(
            Environment::from_lookup(|key| match key {
                "TOKEN" => Some("abc".to_owned()),
                "DB_PORT" => Some("port".to_owned()),
                _ => None,
            }),
            Err(ConfigError::InvalidEnv { key: "DB_PORT", .. })
        ));
    }

    #[test]
    fn bool_spellings() {
        for truthy in ["1", "true", "TRUE", " yes ", "on", "y", "t"] {
            assert!(get_bool(truthy), "{truthy}");
        }
        for falsy in ["0", "false", "no", "", "off", "maybe"] {
            assert!(!get_bool(falsy), "{falsy}");
        }
    }
}
