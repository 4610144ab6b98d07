//! Synchronizer configuration.
//!
//! # Responsibility
//! - Name the collection and ordering the synchronizer reads and writes.
//! - Validate collection and field names before any store call.
//!
//! # Invariants
//! - Collection names match `^[A-Za-z0-9_-]{1,64}$`.
//! - Field names match `^[A-Za-z_][A-Za-z0-9_]{0,63}$`.

use crate::store::OrderDirection;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "notes";
/// Field holding the server-assigned creation time.
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const TITLE_FIELD: &str = "title";
pub const CONTENT_FIELD: &str = "content";

static COLLECTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid collection regex"));
static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("valid field regex"));

/// Returns whether `value` is an acceptable collection name.
pub fn is_valid_collection_name(value: &str) -> bool {
    COLLECTION_NAME_RE.is_match(value)
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidCollection(String),
    InvalidOrderField(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCollection(value) => write!(f, "invalid collection name: `{value}`"),
            Self::InvalidOrderField(value) => write!(f, "invalid order field: `{value}`"),
        }
    }
}

impl Error for ConfigError {}

/// Where notes live and how they are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub collection: String,
    pub order_by: String,
    pub direction: OrderDirection,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            order_by: CREATED_AT_FIELD.to_string(),
            direction: OrderDirection::Descending,
        }
    }
}

impl SyncConfig {
    /// Default ordering over a custom collection.
    pub fn for_collection(collection: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            collection: collection.into().trim().to_string(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_collection_name(&self.collection) {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }
        if !FIELD_NAME_RE.is_match(&self.order_by) {
            return Err(ConfigError::InvalidOrderField(self.order_by.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_collection_name, ConfigError, SyncConfig};
    use crate::store::OrderDirection;

    #[test]
    fn default_lists_notes_newest_first() {
        let config = SyncConfig::default();
        assert_eq!(config.collection, "notes");
        assert_eq!(config.order_by, "createdAt");
        assert_eq!(config.direction, OrderDirection::Descending);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn collection_names_are_restricted() {
        assert!(is_valid_collection_name("notes_2024-q1"));
        assert!(!is_valid_collection_name(""));
        assert!(!is_valid_collection_name("a/b"));
        assert!(!is_valid_collection_name(&"x".repeat(65)));
    }

    #[test]
    fn for_collection_trims_and_validates() {
        let config = SyncConfig::for_collection(" journal ").unwrap();
        assert_eq!(config.collection, "journal");

        let err = SyncConfig::for_collection("bad name").unwrap_err();
        assert_eq!(err, ConfigError::InvalidCollection("bad name".to_string()));
    }

    #[test]
    fn invalid_order_field_is_rejected() {
        let config = SyncConfig {
            order_by: "created at".to_string(),
            ..SyncConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOrderField(_))
        ));
    }
}
