use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::context::{ContextMachine, KeyMatcher};
use crate::error::ConfigError;
use crate::translate::{KeyTranslator, Translater};

pub const DEFAULT_CREATION_KEY: &str = "creation";
pub const DEFAULT_MODIFICATION_KEY: &str = "modification";

/// A creation or modification marker as written in config: a plain string, or a
/// pattern plus the value transitions write.
///
/// ```yaml
/// creation_key: nouveau
/// modification_key:
///   pattern: "^(changement|edition)$"
///   value: changement
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeyMatcherConfig {
    Literal(String),
    Pattern { pattern: String, value: String },
}

impl KeyMatcherConfig {
    fn build(&self, name: &'static str) -> Result<KeyMatcher, ConfigError> {
        match self {
            KeyMatcherConfig::Literal(value) if value.is_empty() => {
                Err(ConfigError::EmptyKey(name))
            }
            KeyMatcherConfig::Literal(value) => Ok(KeyMatcher::literal(value.clone())),
            KeyMatcherConfig::Pattern { value, .. } if value.is_empty() => {
                Err(ConfigError::EmptyKey(name))
            }
            KeyMatcherConfig::Pattern { pattern, value } => {
                KeyMatcher::pattern(name, pattern, value.clone())
            }
        }
    }
}

fn default_creation_key() -> KeyMatcherConfig {
    KeyMatcherConfig::Literal(DEFAULT_CREATION_KEY.to_string())
}

fn default_modification_key() -> KeyMatcherConfig {
    KeyMatcherConfig::Literal(DEFAULT_MODIFICATION_KEY.to_string())
}

/// Router configuration. Built once per integration point and not changed after.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Url key -> view key renaming table
    #[serde(default)]
    pub mapper: Option<BTreeMap<String, String>>,
    #[serde(default = "default_creation_key")]
    pub creation_key: KeyMatcherConfig,
    #[serde(default = "default_modification_key")]
    pub modification_key: KeyMatcherConfig,
    /// Custom translation; only settable in code
    #[serde(skip)]
    pub translater: Option<Arc<dyn Translater>>,
}

impl fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterConfig")
            .field("mapper", &self.mapper)
            .field("creation_key", &self.creation_key)
            .field("modification_key", &self.modification_key)
            .field("translater", &self.translater.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mapper: None,
            creation_key: default_creation_key(),
            modification_key: default_modification_key(),
            translater: None,
        }
    }
}

impl RouterConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        info!("Loaded router config from {}", path.display());
        Ok(config)
    }

    pub fn with_mapper<K: Into<String>, V: Into<String>>(
        mut self,
        mapper: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.mapper = Some(
            mapper
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_translater(mut self, translater: Arc<dyn Translater>) -> Self {
        self.translater = Some(translater);
        self
    }

    pub fn with_creation_key(mut self, key: KeyMatcherConfig) -> Self {
        self.creation_key = key;
        self
    }

    pub fn with_modification_key(mut self, key: KeyMatcherConfig) -> Self {
        self.modification_key = key;
        self
    }

    /// The translation strategy. Mapper and translater are mutually exclusive.
    pub fn translator(&self) -> Result<KeyTranslator, ConfigError> {
        match (&self.mapper, &self.translater) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingTranslation),
            (Some(mapper), None) => KeyTranslator::mapper(mapper.clone()),
            (None, Some(translater)) => Ok(KeyTranslator::custom(Arc::clone(translater))),
            (None, None) => Ok(KeyTranslator::Identity),
        }
    }

    pub fn context_machine(&self) -> Result<ContextMachine, ConfigError> {
        Ok(ContextMachine::new(
            self.creation_key.build("creation_key")?,
            self.modification_key.build("modification_key")?,
        ))
    }
}
