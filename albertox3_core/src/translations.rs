//! YAML translations with per-namespace sources and a fallback language.
//!
//! Every namespace (`g` for global strings, otherwise the scale name) has one or
//! more source folders containing `<language>.yml` files. Languages are loaded
//! lazily and merged in the order the sources were added.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_yaml::{Mapping, Value};

use crate::config::LanguageConfig;

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("unsupported language `{language}`, supported languages are: {available}")]
    Unsupported { language: String, available: String },
    #[error("unknown translation namespace `{0}`")]
    UnknownNamespace(String),
    #[error("missing translation `{namespace}.{key}`")]
    Missing { namespace: String, key: String },
    #[error("translation `{namespace}.{key}` is not a text")]
    NotText { namespace: String, key: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Named format arguments, `{name}` in a translation is replaced by the value.
#[derive(Clone, Debug, Default)]
pub struct Args(Vec<(&'static str, String)>);

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Args::default()
    }

    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl Display) -> Self {
        self.0.push((key, value.to_string()));
        self
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Replaces `{name}` placeholders, `{{` and `}}` are literal braces.
/// Unknown placeholders are kept as they are.
#[must_use]
pub fn format(template: &str, args: &Args) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }

                match args.get(name.trim()) {
                    Some(value) if closed => out.push_str(value),
                    _ => {
                        out.push('{');
                        out.push_str(&name);
                        if closed {
                            out.push('}');
                        }
                    }
                }
            }
            c => out.push(c),
        }
    }

    out
}

/// Merges `src` into `base` recursively, mappings are merged and everything else is replaced.
pub fn merge(base: &mut Mapping, src: Mapping) {
    for (key, value) in src {
        match (base.get_mut(&key), value) {
            (Some(Value::Mapping(inner)), Value::Mapping(value)) => merge(inner, value),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[derive(Default)]
struct Namespace {
    sources: Vec<PathBuf>,
    languages: HashMap<String, Arc<Mapping>>,
}

pub struct Translations {
    default: String,
    fallback: String,
    available: Vec<String>,
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl Translations {
    #[must_use]
    pub fn new(language: &LanguageConfig) -> Self {
        Translations {
            default: language.default.clone(),
            fallback: language.fallback.clone(),
            available: language.available.clone(),
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Registers every `<folder>/<namespace>/translations` directory that contains at least
    /// one file of an available language.
    pub fn load_folder(&self, folder: &Path) -> Result<usize, TranslationError> {
        let io = |source| TranslationError::Io {
            path: folder.to_path_buf(),
            source,
        };

        let mut registered = 0;
        for entry in std::fs::read_dir(folder).map_err(io)? {
            let entry = entry.map_err(io)?;
            let path = entry.path().join("translations");
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('_') || !path.is_dir() {
                continue;
            }

            if self
                .available
                .iter()
                .any(|lang| language_file(&path, lang).is_file())
            {
                self.register(&name, path);
                registered += 1;
            }
        }

        Ok(registered)
    }

    /// Adds a source to a namespace, creating the namespace if needed.
    pub fn register(&self, namespace: &str, source: PathBuf) {
        let mut namespaces = self.namespaces.write();
        if namespaces.contains_key(namespace) {
            tracing::debug!("Extending translation namespace {namespace:?}");
        } else {
            tracing::debug!("Creating translation namespace {namespace:?}");
        }

        let ns = namespaces.entry(namespace.to_owned()).or_default();
        ns.sources.push(source);
        ns.languages.clear();
    }

    #[must_use]
    pub fn default_language(&self) -> &str {
        &self.default
    }

    #[must_use]
    pub fn is_available(&self, language: &str) -> bool {
        self.available.iter().any(|l| l == language)
    }

    /// Maps a Discord locale such as `de` or `en-US` to an available language.
    #[must_use]
    pub fn resolve_locale(&self, locale: Option<&str>) -> &str {
        locale
            .map(|l| l.split('-').next().unwrap_or(l).to_lowercase())
            .and_then(|l| self.available.iter().find(|a| a.eq_ignore_ascii_case(&l)))
            .map_or(self.default.as_str(), String::as_str)
    }

    fn language(&self, namespace: &str, language: &str) -> Result<Arc<Mapping>, TranslationError> {
        if !self.is_available(language) {
            return Err(TranslationError::Unsupported {
                language: language.to_owned(),
                available: self.available.join(", "),
            });
        }

        let sources = {
            let namespaces = self.namespaces.read();
            let ns = namespaces
                .get(namespace)
                .ok_or_else(|| TranslationError::UnknownNamespace(namespace.to_owned()))?;
            if let Some(loaded) = ns.languages.get(language) {
                return Ok(Arc::clone(loaded));
            }
            ns.sources.clone()
        };

        tracing::debug!("Creating translations for {language:?} in {namespace:?}");
        let mut merged = Mapping::new();
        for source in sources {
            let path = language_file(&source, language);
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| TranslationError::Io {
                path: path.clone(),
                source,
            })?;
            match serde_yaml::from_str::<Value>(&text) {
                Ok(Value::Mapping(mapping)) => merge(&mut merged, mapping),
                Ok(_) => {}
                Err(source) => return Err(TranslationError::Yaml { path, source }),
            }
        }

        let merged = Arc::new(merged);
        if let Some(ns) = self.namespaces.write().get_mut(namespace) {
            ns.languages
                .insert(language.to_owned(), Arc::clone(&merged));
        }
        Ok(merged)
    }

    /// Looks up a dotted key, first in the requested language (or the default one) and then in
    /// the fallback language.
    pub fn lookup(
        &self,
        language: Option<&str>,
        namespace: &str,
        key: &str,
    ) -> Result<Value, TranslationError> {
        let language = language.unwrap_or(&self.default);

        let primary = self.language(namespace, language)?;
        if let Some(value) = walk(&primary, key) {
            return Ok(value.clone());
        }

        let fallback = self.language(namespace, &self.fallback)?;
        walk(&fallback, key)
            .cloned()
            .ok_or_else(|| TranslationError::Missing {
                namespace: namespace.to_owned(),
                key: key.to_owned(),
            })
    }

    #[must_use]
    pub fn contains(&self, language: Option<&str>, namespace: &str, key: &str) -> bool {
        self.lookup(language, namespace, key).is_ok()
    }

    pub fn text(
        &self,
        language: Option<&str>,
        namespace: &str,
        key: &str,
    ) -> Result<String, TranslationError> {
        match self.lookup(language, namespace, key)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(TranslationError::NotText {
                namespace: namespace.to_owned(),
                key: key.to_owned(),
            }),
        }
    }

    pub fn format(
        &self,
        language: Option<&str>,
        namespace: &str,
        key: &str,
        args: &Args,
    ) -> Result<String, TranslationError> {
        Ok(format(&self.text(language, namespace, key)?, args))
    }

    /// Picks `one`, `zero` (if present) or `many` below `key` depending on `count`.
    /// The count itself is passed as `{cnt}`.
    pub fn plural(
        &self,
        language: Option<&str>,
        namespace: &str,
        key: &str,
        count: i64,
        args: &Args,
    ) -> Result<String, TranslationError> {
        let form = match count {
            1 => "one",
            0 if self.group_has(language, namespace, key, "zero")? => "zero",
            _ => "many",
        };

        let args = args.clone().with("cnt", count);
        self.format(language, namespace, &format!("{key}.{form}"), &args)
    }

    /// Whether the plural group `key` has `form`, looked up in the language that provides the
    /// group. Forms of the fallback never mix into a group of the requested language.
    fn group_has(
        &self,
        language: Option<&str>,
        namespace: &str,
        key: &str,
        form: &str,
    ) -> Result<bool, TranslationError> {
        let language = language.unwrap_or(&self.default);
        let mut tree = self.language(namespace, language)?;
        if walk(&tree, key).is_none() {
            tree = self.language(namespace, &self.fallback)?;
        }
        Ok(walk(&tree, &format!("{key}.{form}")).is_some())
    }

    /// Keys directly below `key`, in file order.
    pub fn keys(
        &self,
        language: Option<&str>,
        namespace: &str,
        key: &str,
    ) -> Result<Vec<String>, TranslationError> {
        match self.lookup(language, namespace, key)? {
            Value::Mapping(mapping) => Ok(mapping
                .keys()
                .filter_map(|k| match k {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// Binds a language and namespace.
    #[must_use]
    pub fn translator<'a>(&'a self, language: &str, namespace: &'static str) -> Translator<'a> {
        Translator {
            translations: self,
            language: language.to_owned(),
            namespace,
        }
    }
}

fn language_file(source: &Path, language: &str) -> PathBuf {
    source.join(format!("{}.yml", language.to_lowercase()))
}

fn walk<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = mapping.get(segment(parts.next()?))?;
    for part in parts {
        current = match current {
            Value::Mapping(inner) => inner.get(segment(part))?,
            _ => return None,
        };
    }
    Some(current)
}

fn segment(part: &str) -> Value {
    // YAML keys such as `1:` are numbers, not strings.
    match part.parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(part),
    }
}

/// Translations of one namespace in one language.
pub struct Translator<'a> {
    translations: &'a Translations,
    language: String,
    namespace: &'static str,
}

impl Translator<'_> {
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn text(&self, key: &str) -> Result<String, TranslationError> {
        self.translations
            .text(Some(&self.language), self.namespace, key)
    }

    pub fn format(&self, key: &str, args: &Args) -> Result<String, TranslationError> {
        self.translations
            .format(Some(&self.language), self.namespace, key, args)
    }

    pub fn plural(&self, key: &str, count: i64, args: &Args) -> Result<String, TranslationError> {
        self.translations
            .plural(Some(&self.language), self.namespace, key, count, args)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.translations
            .contains(Some(&self.language), self.namespace, key)
    }

    pub fn keys(&self, key: &str) -> Result<Vec<String>, TranslationError> {
        self.translations
            .keys(Some(&self.language), self.namespace, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages() -> LanguageConfig {
        LanguageConfig {
            default: "de".into(),
            fallback: "en".into(),
            available: vec!["en".into(), "de".into()],
        }
    }

    fn write(dir: &Path, namespace: &str, language: &str, text: &str) -> PathBuf {
        let folder = dir.join(namespace).join("translations");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join(format!("{language}.yml")), text).unwrap();
        folder
    }

    fn setup() -> (tempfile::TempDir, Translations) {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "money",
            "en",
            "you:\n  title: Your money\n  money:\n    one: \"{cnt} coin {emoji}\"\n    many: \"{cnt} coins {emoji}\"\n    zero: \"no coins\"\nonly_en: english\n",
        );
        write(
            dir.path(),
            "money",
            "de",
            "you:\n  title: Dein Geld\n  money:\n    one: \"{cnt} Münze\"\n    many: \"{cnt} Münzen\"\n",
        );
        write(dir.path(), "g", "en", "executed_by: \"Executed by {user} ({id})\"\n");

        let translations = Translations::new(&languages());
        assert_eq!(translations.load_folder(dir.path()).unwrap(), 2);
        (dir, translations)
    }

    #[test]
    fn format_placeholders() {
        let args = Args::new().with("user", "Albert").with("id", 42);
        assert_eq!(format("{user} ({id})", &args), "Albert (42)");
        assert_eq!(format("{{user}} {user}", &args), "{user} Albert");
        assert_eq!(format("{missing} {user", &args), "{missing} {user");
        assert_eq!(format("{ user }", &args), "Albert");
    }

    #[test]
    fn merge_is_recursive() {
        let mut base: Mapping = serde_yaml::from_str("a:\n  b: 1\n  c: 2\nd: 3\n").unwrap();
        let src: Mapping = serde_yaml::from_str("a:\n  c: 4\n  e: 5\nd:\n  f: 6\n").unwrap();
        merge(&mut base, src);

        let expected: Mapping =
            serde_yaml::from_str("a:\n  b: 1\n  c: 4\n  e: 5\nd:\n  f: 6\n").unwrap();
        assert_eq!(base, expected);
    }

    #[test]
    fn default_language_with_fallback() {
        let (_dir, t) = setup();

        assert_eq!(t.text(None, "money", "you.title").unwrap(), "Dein Geld");
        assert_eq!(t.text(Some("en"), "money", "you.title").unwrap(), "Your money");
        assert_eq!(t.text(None, "money", "only_en").unwrap(), "english");
        assert_eq!(
            t.format(None, "g", "executed_by", &Args::new().with("user", "A").with("id", 1))
                .unwrap(),
            "Executed by A (1)"
        );
    }

    #[test]
    fn plural_forms() {
        let (_dir, t) = setup();
        let args = Args::new().with("emoji", "💵");

        assert_eq!(t.plural(Some("en"), "money", "you.money", 1, &args).unwrap(), "1 coin 💵");
        assert_eq!(t.plural(Some("en"), "money", "you.money", 5, &args).unwrap(), "5 coins 💵");
        assert_eq!(t.plural(Some("en"), "money", "you.money", 0, &args).unwrap(), "no coins");
        // german has no `zero`, the english one must not leak in
        assert_eq!(t.plural(None, "money", "you.money", 0, &args).unwrap(), "0 Münzen");
        assert_eq!(t.plural(Some("de"), "money", "you.money", 0, &args).unwrap(), "0 Münzen");
        assert_eq!(t.plural(None, "money", "you.money", 2, &args).unwrap(), "2 Münzen");
    }

    #[test]
    fn errors() {
        let (_dir, t) = setup();

        assert!(matches!(
            t.text(Some("fr"), "money", "you.title"),
            Err(TranslationError::Unsupported { .. })
        ));
        assert!(matches!(
            t.text(None, "nope", "x"),
            Err(TranslationError::UnknownNamespace(_))
        ));
        assert!(matches!(
            t.text(None, "money", "you.nothing"),
            Err(TranslationError::Missing { .. })
        ));
        assert!(matches!(
            t.text(None, "money", "you"),
            Err(TranslationError::NotText { .. })
        ));
    }

    #[test]
    fn added_sources_extend_and_invalidate() {
        let (dir, t) = setup();
        assert_eq!(t.text(Some("en"), "money", "you.title").unwrap(), "Your money");

        let extra = write(&dir.path().join("extra"), "money", "en", "you:\n  title: Wallet\n");
        t.register("money", extra);

        assert_eq!(t.text(Some("en"), "money", "you.title").unwrap(), "Wallet");
        assert_eq!(t.text(Some("en"), "money", "only_en").unwrap(), "english");
    }

    #[test]
    fn numeric_keys_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "inventory",
            "en",
            "items:\n  1:\n    name: Cookie\n  2:\n    name: Milk\n",
        );
        let t = Translations::new(&languages());
        t.load_folder(dir.path()).unwrap();

        let tr = t.translator("en", "inventory");
        assert_eq!(tr.text("items.2.name").unwrap(), "Milk");
        assert!(tr.contains("items.1"));
        assert!(!tr.contains("items.3"));
        assert_eq!(tr.keys("items").unwrap(), ["1", "2"]);
    }

    #[test]
    fn locale_resolution() {
        let t = Translations::new(&languages());
        assert_eq!(t.resolve_locale(Some("en-US")), "en");
        assert_eq!(t.resolve_locale(Some("DE")), "de");
        assert_eq!(t.resolve_locale(Some("fr")), "de");
        assert_eq!(t.resolve_locale(None), "de");
    }
}
