//! Graph-building configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::TypeDefinition;

/// How the factory builds entities and handles inconsistent requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Fail a `create_objects` call on the first inconsistency instead of
    /// logging it and continuing with the remaining links.
    pub strict: bool,
    /// Sample rate given to tracks created implicitly by `create_objects`.
    pub default_sample_rate: u32,
    /// Bit depth given to tracks created implicitly by `create_objects`.
    pub default_bit_depth: u16,
    /// Type definition for format entities when the caller names none.
    pub default_type: TypeDefinition,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            strict: false,
            default_sample_rate: 48_000,
            default_bit_depth: 24,
            default_type: TypeDefinition::Objects,
        }
    }
}

impl FactoryConfig {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.default_sample_rate = sample_rate;
        self
    }

    pub fn with_bit_depth(mut self, bit_depth: u16) -> Self {
        self.default_bit_depth = bit_depth;
        self
    }

    pub fn with_type(mut self, type_def: TypeDefinition) -> Self {
        self.default_type = type_def;
        self
    }

    /// Load from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FactoryConfig::default();
        assert!(!config.strict);
        assert_eq!(config.default_sample_rate, 48_000);
        assert_eq!(config.default_bit_depth, 24);
        assert_eq!(config.default_type, TypeDefinition::Objects);
    }

    #[test]
    fn test_from_json_partial() {
        let config = FactoryConfig::from_json(r#"{"strict": true, "default_type": "HOA"}"#).unwrap();
        assert!(config.strict);
        assert_eq!(config.default_type, TypeDefinition::Hoa);
        assert_eq!(config.default_sample_rate, 48_000);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(FactoryConfig::from_json("{strict").is_err());
    }

    #[test]
    fn test_builders() {
        let config = FactoryConfig::strict().with_sample_rate(96_000).with_bit_depth(32);
        assert!(config.strict);
        assert_eq!(config.default_sample_rate, 96_000);
        assert_eq!(config.default_bit_depth, 32);
    }
}
