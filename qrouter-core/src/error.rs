use thiserror::Error;

/// Errors raised while building a router from its configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid pattern for {name}: {source}")]
    InvalidPattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("Pattern for {name} does not match its own value {value:?}")]
    PatternMismatch { name: &'static str, value: String },
    #[error("{0} must not be empty")]
    EmptyKey(&'static str),
    #[error("Mapper is not one-to-one: {0:?} is the target of several keys")]
    DuplicateMapping(String),
    #[error("Configure either a mapper or a translater, not both")]
    ConflictingTranslation,
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a context transition cannot be planned.
///
/// These never escape the acting router methods; they are logged and the
/// transition is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Leaving creation on {pathname} needs the id of the created entity")]
    MissingCreatedId { pathname: String },
    #[error("No creation or modification context found on {pathname}")]
    NoPathnameContext { pathname: String },
}
