//! Layered message lookup
//!
//! A `Translator` is built from an ordered list of locales; for every key the
//! last locale that defines it wins. Strings may contain `%{name}`
//! placeholders and may be plural tables selected by `smart_count`.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Key of the message shown while upload parameters are being fetched
pub const PREPARING_UPLOAD: &str = "preparingUpload";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Picks a plural form index for a count
pub type Pluralize = fn(usize) -> usize;

/// English plural rule: one → form 0, anything else → form 1
pub fn english_plural(count: usize) -> usize {
    if count == 1 {
        0
    } else {
        1
    }
}

/// A single message or its plural forms keyed by form index (`"0"`, `"1"`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocaleString {
    Single(String),
    Plural(BTreeMap<String, String>),
}

impl From<&str> for LocaleString {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

/// A bundle of messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Locale {
    #[serde(default)]
    pub strings: HashMap<String, LocaleString>,
    #[serde(skip)]
    pub pluralize: Option<Pluralize>,
}

impl Locale {
    /// Messages built into the uploader
    pub fn default_strings() -> Self {
        Self::default().with_string(PREPARING_UPLOAD, "Preparing upload...")
    }

    pub fn with_string(mut self, key: &str, value: impl Into<LocaleString>) -> Self {
        self.strings.insert(key.to_string(), value.into());
        self
    }

    pub fn with_pluralize(mut self, pluralize: Pluralize) -> Self {
        self.pluralize = Some(pluralize);
        self
    }
}

/// Values substituted into a message
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    vars: Vec<(String, String)>,
    smart_count: Option<usize>,
}

impl TranslateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars.push((name.to_string(), value.to_string()));
        self
    }

    /// Count used to pick a plural form; also available as `%{smart_count}`
    pub fn smart_count(mut self, count: usize) -> Self {
        self.smart_count = Some(count);
        self
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if name == "smart_count" {
            if let Some(count) = self.smart_count {
                return Some(count.to_string());
            }
        }
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}

/// Message lookup over layered locales
#[derive(Debug, Clone)]
pub struct Translator {
    strings: HashMap<String, LocaleString>,
    pluralize: Pluralize,
}

impl Translator {
    /// Merge locales in order; later entries override earlier ones per key
    pub fn new<I>(locales: I) -> Self
    where
        I: IntoIterator<Item = Locale>,
    {
        let mut strings = HashMap::new();
        let mut pluralize: Pluralize = english_plural;

        for locale in locales {
            strings.extend(locale.strings);
            if let Some(rule) = locale.pluralize {
                pluralize = rule;
            }
        }

        Self { strings, pluralize }
    }

    /// Whether any layer defines `key`
    pub fn has(&self, key: &str) -> bool {
        self.strings.contains_key(key)
    }

    /// Translate `key` without substitutions
    pub fn translate(&self, key: &str) -> String {
        self.translate_with(key, &TranslateOptions::default())
    }

    pub fn translate_with(&self, key: &str, options: &TranslateOptions) -> String {
        self.translate_array(key, options).concat()
    }

    /// Translate `key` and return the literal and substituted pieces in order
    pub fn translate_array(&self, key: &str, options: &TranslateOptions) -> Vec<String> {
        let Some(entry) = self.strings.get(key) else {
            warn!("Missing translation for key '{}'", key);
            return vec![key.to_string()];
        };

        let phrase = match entry {
            LocaleString::Single(s) => s.as_str(),
            LocaleString::Plural(forms) => self.plural_form(key, forms, options.smart_count),
        };

        interpolate(phrase, options)
    }

    fn plural_form<'a>(
        &self,
        key: &str,
        forms: &'a BTreeMap<String, String>,
        count: Option<usize>,
    ) -> &'a str {
        let index = match count {
            Some(n) => (self.pluralize)(n),
            None => {
                warn!("Plural string '{}' used without smart_count", key);
                0
            }
        };
        forms
            .get(&index.to_string())
            .or_else(|| forms.values().next())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new([Locale::default_strings()])
    }
}

fn interpolate(phrase: &str, options: &TranslateOptions) -> Vec<String> {
    let mut parts = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(phrase) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Unknown placeholders stay in the surrounding literal
        let Some(value) = options.lookup(name.as_str()) else {
            continue;
        };
        if whole.start() > last {
            parts.push(phrase[last..whole.start()].to_string());
        }
        parts.push(value);
        last = whole.end();
    }

    if last < phrase.len() || parts.is_empty() {
        parts.push(phrase[last..].to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preparing_upload() {
        let translator = Translator::default();
        assert_eq!(translator.translate(PREPARING_UPLOAD), "Preparing upload...");
    }

    #[test]
    fn test_last_locale_wins() {
        let host = Locale::default().with_string(PREPARING_UPLOAD, "Host preparing");
        let plugin = Locale::default().with_string(PREPARING_UPLOAD, "Plugin preparing");

        let translator = Translator::new([Locale::default_strings(), host.clone()]);
        assert_eq!(translator.translate(PREPARING_UPLOAD), "Host preparing");

        let translator = Translator::new([Locale::default_strings(), host, plugin]);
        assert_eq!(translator.translate(PREPARING_UPLOAD), "Plugin preparing");
    }

    #[test]
    fn test_interpolation_pieces() {
        let translator =
            Translator::new([Locale::default().with_string("greet", "Hello %{name}, bye %{name}!")]);
        let options = TranslateOptions::new().var("name", "Ana");

        assert_eq!(
            translator.translate_array("greet", &options),
            vec!["Hello ", "Ana", ", bye ", "Ana", "!"]
        );
        assert_eq!(translator.translate_with("greet", &options), "Hello Ana, bye Ana!");
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let translator = Translator::new([Locale::default().with_string("k", "a %{missing} b")]);
        assert_eq!(translator.translate("k"), "a %{missing} b");
    }

    #[test]
    fn test_plural_forms() {
        let forms = BTreeMap::from([
            ("0".to_string(), "%{smart_count} file".to_string()),
            ("1".to_string(), "%{smart_count} files".to_string()),
        ]);
        let translator =
            Translator::new([Locale::default().with_string("files", LocaleString::Plural(forms))]);

        let one = TranslateOptions::new().smart_count(1);
        let many = TranslateOptions::new().smart_count(3);
        assert_eq!(translator.translate_with("files", &one), "1 file");
        assert_eq!(translator.translate_with("files", &many), "3 files");
    }

    #[test]
    fn test_custom_pluralize_overrides_default() {
        let forms = BTreeMap::from([
            ("0".to_string(), "one".to_string()),
            ("1".to_string(), "other".to_string()),
        ]);
        let locale = Locale::default()
            .with_string("n", LocaleString::Plural(forms))
            .with_pluralize(|_| 0);
        let translator = Translator::new([locale]);
        assert_eq!(
            translator.translate_with("n", &TranslateOptions::new().smart_count(5)),
            "one"
        );
    }

    #[test]
    fn test_missing_key_returns_key() {
        let translator = Translator::default();
        assert!(!translator.has("nope"));
        assert_eq!(translator.translate("nope"), "nope");
    }

    #[test]
    fn test_locale_from_json() {
        let locale: Locale = serde_json::from_str(
            r#"{"strings": {"preparingUpload": "Preparando...", "files": {"0": "uno", "1": "varios"}}}"#,
        )
        .unwrap();
        let translator = Translator::new([Locale::default_strings(), locale]);
        assert_eq!(translator.translate(PREPARING_UPLOAD), "Preparando...");
        assert_eq!(
            translator.translate_with("files", &TranslateOptions::new().smart_count(2)),
            "varios"
        );
    }
}
