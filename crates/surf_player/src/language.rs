//! Message templating keyed by language tag
//!
//! The real localization store lives host-side; this is the consuming
//! surface the HUD renders through. Templates use positional `{N}`
//! placeholders. An unknown key resolves to the empty string so callers
//! can lean on the newline-trimming rule instead of error paths.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::RwLock;

pub const DEFAULT_LANGUAGE: &str = "en";

static DEFAULT_PHRASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("HUD - Key Text", "Keys: {1}{2}{3}{4}{5}{6}"),
        ("HUD - Speed Text", "Speed: {1}"),
        ("HUD - Speed Text (Takeoff)", "Speed: {1} ({2})"),
        ("HUD - Stage Text", "Stage: {1}"),
        ("HUD - Timer Text", "Time: {1}{2}{3}"),
        ("HUD - Paused Text", " (paused)"),
        ("HUD - Center Text", "{2}\n{3}\n{4}"),
        ("HUD - Alert Text", "{1}"),
        ("HUD - Html Center Text", "{1}\n{2}\n{3}\n{4}"),
        ("HUD Option - Info Panel - Enable", "Info panel enabled."),
        ("HUD Option - Info Panel - Disable", "Info panel disabled."),
    ])
});

pub struct PhraseStore {
    phrases: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl PhraseStore {
    pub fn new() -> Self {
        Self {
            phrases: RwLock::new(HashMap::new()),
        }
    }

    /// The built-in phrase set for the default language.
    pub fn with_defaults() -> Self {
        let store = Self::new();
        for (key, template) in DEFAULT_PHRASES.iter() {
            store.insert(DEFAULT_LANGUAGE, key, template);
        }
        store
    }

    pub fn insert(&self, language: &str, key: &str, template: &str) {
        self.phrases
            .write()
            .unwrap()
            .entry(language.to_string())
            .or_default()
            .insert(key.to_string(), template.to_string());
    }

    /// Resolves `key` for `language` (falling back to the default
    /// language) and substitutes the positional arguments.
    pub fn prepare(&self, language: &str, key: &str, args: &[&str]) -> String {
        let phrases = self.phrases.read().unwrap();
        let template = phrases
            .get(language)
            .and_then(|set| set.get(key))
            .or_else(|| phrases.get(DEFAULT_LANGUAGE).and_then(|set| set.get(key)));
        match template {
            Some(template) => substitute(template, args),
            None => String::new(),
        }
    }
}

impl Default for PhraseStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn substitute(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (index, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", index + 1), arg);
    }
    result
}
