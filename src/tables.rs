//! Key/value tables loaded from JSON files: on-screen messages and emotion label translations.

use crate::{constants::NO_EMOTION_LABEL, Error, Result};
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load a flat string-to-string JSON object, keeping the file's entry order
///
/// # Errors
///
/// Returns [`Error::TableLoad`] if the file cannot be read, is not valid JSON, is not
/// an object, or contains a non-string value.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Vec<(String, String)>> {
    let path = path.as_ref();
    let table_error = |reason: String| Error::TableLoad {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| table_error(e.to_string()))?;
    let value: Value = serde_json::from_str(&content).map_err(|e| table_error(e.to_string()))?;

    let Value::Object(map) = value else {
        return Err(table_error("top-level value is not an object".to_string()));
    };

    let mut entries = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::String(text) => entries.push((key, text)),
            other => {
                return Err(table_error(format!("value for key '{key}' is not a string: {other}")));
            }
        }
    }

    debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Ordered help/status messages shown by the message overlay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTable {
    entries: Vec<(String, String)>,
}

impl MessageTable {
    /// Build a table from ordered entries
    #[must_use]
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Load the table from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableLoad`] if the file is missing or malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_table(path).map(Self::new)
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Message texts in table order
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, text)| text.as_str())
    }

    /// Look up a message by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, text)| text.as_str())
    }
}

/// Mapping from canonical emotion labels to display labels
#[derive(Debug, Clone, Default)]
pub struct EmotionTranslationTable {
    labels: HashMap<String, String>,
}

impl EmotionTranslationTable {
    /// Build a table from entries
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            labels: entries.into_iter().collect(),
        }
    }

    /// Load the table from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableLoad`] if the file is missing or malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_table(path).map(Self::new)
    }

    /// Translate a canonical label into its capitalised display form
    ///
    /// Unknown labels become the `"None"` sentinel.
    #[must_use]
    pub fn translate(&self, label: &str) -> String {
        self.labels
            .get(label)
            .map_or_else(|| NO_EMOTION_LABEL.to_string(), |text| capitalize(text))
    }
}

/// Upper-case the first character and lower-case the rest
#[must_use]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
