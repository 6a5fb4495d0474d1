use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qrouter_core::{ContextConfig, HistoryMethod, ParamChange, ParamUpdate};

/// qrouter: run one query router operation against a location and print the result.
#[derive(Parser)]
#[command(name = "qrouter")]
pub struct Args {
    /// Path to a router config YAML file (mapper, creation_key, modification_key).
    #[arg(long, env = "QROUTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Starting location, e.g. `/tests/AE?modification`.
    #[arg(long, default_value = "/", env = "QROUTER_LOCATION")]
    pub location: String,

    /// Replace the current history entry instead of pushing a new one.
    #[arg(long)]
    pub replace: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn history_method(&self) -> HistoryMethod {
        if self.replace {
            HistoryMethod::Replace
        } else {
            HistoryMethod::Push
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the decoded params.
    Parse,
    /// Print the params under their view names.
    Translate,
    /// Apply changes: `key=value` sets, `key` alone flags, `-key` or `key=` deletes.
    Change {
        /// Navigate to this pathname instead of the current one.
        #[arg(long)]
        pathname: Option<String>,
        #[arg(value_parser = parse_change, allow_hyphen_values = true)]
        changes: Vec<(String, ParamChange)>,
    },
    /// Add a value to a comma-joined list param.
    Add { key: String, value: String },
    /// Remove a value from a comma-joined list param.
    Remove { key: String, value: String },
    /// Drop the whole search.
    Clear,
    /// Print the entity context.
    Context {
        #[command(flatten)]
        target: Target,
    },
    /// Move to a creation context.
    Create {
        #[command(flatten)]
        target: Target,
        #[arg(value_parser = parse_change, allow_hyphen_values = true)]
        extra: Vec<(String, ParamChange)>,
    },
    /// Move to a modification context.
    Modify {
        #[command(flatten)]
        target: Target,
        #[arg(value_parser = parse_change, allow_hyphen_values = true)]
        extra: Vec<(String, ParamChange)>,
    },
    /// Leave the current context.
    ReadOnly {
        #[command(flatten)]
        target: Target,
        #[arg(value_parser = parse_change, allow_hyphen_values = true)]
        extra: Vec<(String, ParamChange)>,
    },
}

/// Which entity a context command is about. No key means the pathname.
#[derive(clap::Args)]
pub struct Target {
    /// Entity key in the search.
    #[arg(long)]
    pub key: Option<String>,

    /// Entity id.
    #[arg(long)]
    pub id: Option<String>,
}

impl Target {
    pub fn context_config(&self, method: HistoryMethod) -> ContextConfig {
        ContextConfig {
            key: self.key.clone(),
            id: self.id.clone(),
            history_method: method,
        }
    }
}

/// Parse one `key=value`, `key`, `key=` or `-key` argument.
pub fn parse_change(arg: &str) -> Result<(String, ParamChange), String> {
    if let Some(key) = arg.strip_prefix('-') {
        if key.is_empty() {
            return Err("missing key after '-'".to_string());
        }
        return Ok((key.to_string(), ParamChange::Delete));
    }

    let (key, change) = match arg.split_once('=') {
        Some((key, value)) => (key, ParamChange::from(value)),
        None => (arg, ParamChange::Flag),
    };
    if key.is_empty() {
        return Err(format!("missing key in {arg:?}"));
    }
    Ok((key.to_string(), change))
}

pub fn to_update(changes: &[(String, ParamChange)]) -> ParamUpdate {
    changes.iter().cloned().collect()
}
