//! Codec configuration.

use adm_model::FactoryConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Tree backend to use; `None` selects the registry default.
    pub backend: Option<String>,
    /// Spaces per nesting level in written `axml`; 0 writes a single line.
    pub indent: usize,
    /// Graph settings for decoded graphs. Track sample rate and bit depth
    /// fall back to these when the tree omits them.
    pub factory: FactoryConfig,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            backend: None,
            indent: 2,
            factory: FactoryConfig::default(),
        }
    }
}

impl CodecConfig {
    pub fn with_backend(mut self, name: impl Into<String>) -> Self {
        self.backend = Some(name.into());
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_factory(mut self, factory: FactoryConfig) -> Self {
        self.factory = factory;
        self
    }

    /// Load from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
