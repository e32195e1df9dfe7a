//! Configuration Sub-Store
//!
//! A small string-to-string settings store backing the `CONFIG` command,
//! independent of the main storage engine: one reader/writer lock over a
//! plain map. Lookup takes an anchored glob pattern where `*` matches any
//! run of bytes and `?` matches exactly one byte; every other byte is a
//! literal, including characters that would be special in a regex.

use std::collections::HashMap;
use std::sync::RwLock;

/// The mutex-guarded settings map.
///
/// Constructed once at startup and threaded into the `CONFIG` handler.
///
/// # Example
///
/// ```
/// use flintkv::config::ConfigStore;
///
/// let config = ConfigStore::new();
/// config.set("maxmemory", "100mb");
/// config.set("maxmemory-policy", "noeviction");
///
/// let matches = config.get("maxmemory*");
/// assert_eq!(matches.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ConfigStore {
    settings: RwLock<HashMap<String, String>>,
}

impl ConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a configuration value, replacing any previous one.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut settings = self.settings.write().unwrap();
        settings.insert(name.into(), value.into());
    }

    /// Returns every entry whose name matches the glob pattern.
    pub fn get(&self, pattern: &str) -> HashMap<String, String> {
        let settings = self.settings.read().unwrap();
        settings
            .iter()
            .filter(|(name, _)| glob_match(pattern.as_bytes(), name.as_bytes()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Returns the number of stored settings.
    pub fn len(&self) -> usize {
        self.settings.read().unwrap().len()
    }

    /// Returns true if no settings are stored.
    pub fn is_empty(&self) -> bool {
        self.settings.read().unwrap().is_empty()
    }
}

/// Matches `text` against an anchored glob pattern.
///
/// `*` matches any run of bytes (including none), `?` matches exactly one
/// byte, anything else matches itself.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some(b'*') => (0..=text.len()).any(|i| glob_match(&pattern[1..], &text[i..])),
        Some(b'?') => !text.is_empty() && glob_match(&pattern[1..], &text[1..]),
        Some(&literal) => {
            text.first() == Some(&literal) && glob_match(&pattern[1..], &text[1..])
        }
    }
}
