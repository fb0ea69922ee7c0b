use std::fmt;

use ab_core::{Error, Result};

pub const KEYS_ENV: &str = "GEMINI_API_KEYS";
pub const KEY_ENV: &str = "GEMINI_API_KEY";

/// Ordered API credentials plus the index of the one in use.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyRing {
    keys: Vec<String>,
    current: usize,
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &format!("<{} redacted>", self.keys.len()))
            .field("current", &self.current)
            .finish()
    }
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(Error::MissingCredentials(format!(
                "set {} (JSON array) or {}",
                KEYS_ENV, KEY_ENV
            )));
        }
        Ok(Self { keys, current: 0 })
    }

    /// Reads `GEMINI_API_KEYS` first, then `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_sources(
            std::env::var(KEYS_ENV).ok().as_deref(),
            std::env::var(KEY_ENV).ok().as_deref(),
        )
    }

    /// A JSON array of keys wins over a single key; a malformed or empty
    /// array falls through to the single key.
    pub fn from_sources(keys_json: Option<&str>, single: Option<&str>) -> Result<Self> {
        if let Some(raw) = keys_json.filter(|s| !s.trim().is_empty()) {
            match serde_json::from_str::<Vec<String>>(raw) {
                Ok(keys) if !keys.is_empty() => return Self::new(keys),
                Ok(_) => tracing::warn!("{} is an empty array, ignoring", KEYS_ENV),
                Err(e) => tracing::warn!("{} is not a JSON array of strings: {}", KEYS_ENV, e),
            }
        }
        Self::new(single.map(|k| vec![k.to_string()]).unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &str {
        &self.keys[self.current]
    }

    /// Move to the next credential, wrapping around.
    pub fn rotate(&mut self) -> usize {
        self.current = (self.current + 1) % self.keys.len();
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ring_requires_a_key() {
        let result = KeyRing::from_sources(None, None);
        assert!(matches!(result, Err(Error::MissingCredentials(_))));

        let result = KeyRing::from_sources(Some("[]"), Some("  "));
        assert!(matches!(result, Err(Error::MissingCredentials(_))));
    }

    #[test]
    fn test_key_ring_prefers_json_array() {
        let ring = KeyRing::from_sources(Some(r#"["a", "b", "c"]"#), Some("single")).unwrap();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.current(), "a");

        let ring = KeyRing::from_sources(Some("not json"), Some("single")).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.current(), "single");
    }

    #[test]
    fn test_rotate_wraps() {
        let mut ring = KeyRing::new(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(ring.rotate(), 1);
        assert_eq!(ring.current(), "b");
        assert_eq!(ring.rotate(), 0);
        assert_eq!(ring.current(), "a");
    }

    #[test]
    fn test_debug_redacts_keys() {
        let ring = KeyRing::new(vec!["secret-key".into()]).unwrap();
        assert!(!format!("{:?}", ring).contains("secret-key"));
    }
}
