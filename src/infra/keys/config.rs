use anyhow::{Context, Result};
use std::collections::HashMap;

/// Maps secret names to vault references (SSM parameter paths or env vars).
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "feed_api_key": "/bus-tracker/bods-api-key"
/// }
/// ```
#[derive(Debug, Default)]
pub struct SecretRefs {
    entries: HashMap<String, String>,
}

impl SecretRefs {
    /// Loads the mapping from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading secret refs '{path}'"))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    /// Returns the reference for `name`, falling back to `default`.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(default)
    }
}
