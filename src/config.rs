//! Schema-driven validation for the string-keyed configuration each payment
//! handler variant carries, plus the allow-list filter for the optional
//! gateway passthrough fields.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use url::Url;

use crate::errors::ConfigurationError;
use crate::types::TransactionType;

/// Config keys whose values never appear in Debug output or diagnostics.
const SENSITIVE_KEYS: &[&str] = &["Password"];

/// Declarative validation rules for one handler variant's configuration.
///
/// Invariant: `required` is a subset of `allowed`.
#[derive(Debug, Clone, Copy)]
pub struct ConfigSchema {
    pub required: &'static [&'static str],
    pub allowed: &'static [&'static str],
    /// Keys that, when present, must parse as absolute URLs.
    pub url_keys: &'static [&'static str],
    /// Key that, when present, must be a valid [`TransactionType`].
    pub type_key: Option<&'static str>,
}

impl ConfigSchema {
    pub fn validate(&self, config: &HashMap<String, String>) -> Vec<ConfigurationError> {
        let mut errors = Vec::new();

        for key in self.required {
            if !config.contains_key(*key) {
                errors.push(ConfigurationError::MissingKey {
                    key: (*key).to_string(),
                });
            }
        }

        for key in config.keys() {
            if !self.allowed.contains(&key.as_str()) {
                errors.push(ConfigurationError::UnknownKey { key: key.clone() });
            }
        }

        if let Some(type_key) = self.type_key {
            if let Some(value) = config.get(type_key) {
                if let Err(error) = TransactionType::parse(value) {
                    errors.push(error);
                }
            }
        }

        for key in self.url_keys {
            if let Some(value) = config.get(*key) {
                if !is_absolute_url(value) {
                    errors.push(ConfigurationError::InvalidUrl {
                        key: (*key).to_string(),
                    });
                }
            }
        }

        errors
    }
}

pub(crate) fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).map(|url| url.has_host()).unwrap_or(false)
}

/// Validated configuration store. Writes are all-or-nothing: a mapping that
/// produces any validation error leaves the stored values untouched.
#[derive(Clone)]
pub struct PaymentConfig {
    schema: ConfigSchema,
    values: HashMap<String, String>,
}

impl PaymentConfig {
    pub fn new(schema: ConfigSchema) -> Self {
        Self {
            schema,
            values: HashMap::new(),
        }
    }

    /// Validates `config` against the schema. On zero errors the stored
    /// configuration is replaced wholesale; otherwise it is left unchanged
    /// and the errors are returned, one per violation.
    pub fn set_config(&mut self, config: HashMap<String, String>) -> Vec<ConfigurationError> {
        let errors = self.schema.validate(&config);
        if errors.is_empty() {
            self.values = config;
        }
        errors
    }

    /// Inserts a single key, revalidating the merged mapping with the same
    /// all-or-nothing contract.
    pub fn set_value(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Vec<ConfigurationError> {
        let mut candidate = self.values.clone();
        candidate.insert(key.into(), value.into());
        self.set_config(candidate)
    }

    /// The last successfully stored configuration; empty if never set.
    pub fn get_config(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigurationError> {
        self.get(key).ok_or_else(|| ConfigurationError::MissingKey {
            key: key.to_string(),
        })
    }
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.values {
            if SENSITIVE_KEYS.contains(&key.as_str()) {
                map.entry(key, &"*** redacted ***");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// Optional gateway passthrough fields, filtered to a per-variant allow-list.
/// Keys outside the list are silently dropped.
#[derive(Debug, Clone)]
pub struct AdditionalConfig {
    allowed: &'static [&'static str],
    values: BTreeMap<String, String>,
}

impl AdditionalConfig {
    pub fn new(allowed: &'static [&'static str]) -> Self {
        Self {
            allowed,
            values: BTreeMap::new(),
        }
    }

    /// Replaces the stored fields with the allow-listed subset of `entries`
    /// and returns the retained set.
    pub fn set<K, V, I>(&mut self, entries: I) -> &BTreeMap<String, String>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.values = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .filter(|(key, _)| self.allowed.contains(&key.as_str()))
            .collect();
        &self.values
    }

    /// Sets one field; returns false when the key is not allow-listed (the
    /// value is dropped).
    pub fn set_by_key(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if !self.allowed.contains(&key.as_str()) {
            return false;
        }
        self.values.insert(key, value.into());
        true
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
