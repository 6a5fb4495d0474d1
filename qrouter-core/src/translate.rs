//! Key translation between url param names and the names a view works with.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::params::ParamMap;
use crate::update::{ParamChange, ParamUpdate};

/// Caller-defined translation in both directions.
///
/// Free to rewrite values as well as keys. `to_view(to_url(..))` does not have to
/// give back its input.
pub trait Translater: Send + Sync {
    /// Url params as the view wants to read them.
    fn to_view(&self, params: &ParamMap) -> ParamMap;

    /// A view-level update as it must be written to the url.
    fn to_url(&self, update: &ParamUpdate) -> ParamUpdate;
}

/// [`Translater`] built from two closures.
pub struct FnTranslater<V, U> {
    to_view: V,
    to_url: U,
}

impl<V, U> FnTranslater<V, U>
where
    V: Fn(&ParamMap) -> ParamMap + Send + Sync,
    U: Fn(&ParamUpdate) -> ParamUpdate + Send + Sync,
{
    pub fn new(to_view: V, to_url: U) -> Self {
        Self { to_view, to_url }
    }
}

impl<V, U> Translater for FnTranslater<V, U>
where
    V: Fn(&ParamMap) -> ParamMap + Send + Sync,
    U: Fn(&ParamUpdate) -> ParamUpdate + Send + Sync,
{
    fn to_view(&self, params: &ParamMap) -> ParamMap {
        (self.to_view)(params)
    }

    fn to_url(&self, update: &ParamUpdate) -> ParamUpdate {
        (self.to_url)(update)
    }
}

/// Exactly one translation strategy, chosen when the router is built.
#[derive(Clone, Default)]
pub enum KeyTranslator {
    #[default]
    Identity,
    /// Fixed renaming table, with its inverse computed once up front.
    Mapper {
        to_view: BTreeMap<String, String>,
        to_url: BTreeMap<String, String>,
    },
    Custom(Arc<dyn Translater>),
}

impl fmt::Debug for KeyTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyTranslator::Identity => f.write_str("Identity"),
            KeyTranslator::Mapper { to_view, .. } => {
                f.debug_struct("Mapper").field("to_view", to_view).finish()
            }
            KeyTranslator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl KeyTranslator {
    /// Build a renaming translator from a `url key -> view key` table.
    ///
    /// Fails when two url keys map to the same view key, since the table could not
    /// be inverted for writes.
    pub fn mapper(table: BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut to_url = BTreeMap::new();
        for (url_key, view_key) in &table {
            if to_url.insert(view_key.clone(), url_key.clone()).is_some() {
                return Err(ConfigError::DuplicateMapping(view_key.clone()));
            }
        }
        Ok(KeyTranslator::Mapper {
            to_view: table,
            to_url,
        })
    }

    pub fn custom(translater: Arc<dyn Translater>) -> Self {
        KeyTranslator::Custom(translater)
    }

    /// Url params to view params. Keys missing from a mapper pass through.
    pub fn params_to_view(&self, params: &ParamMap) -> ParamMap {
        match self {
            KeyTranslator::Identity => params.clone(),
            KeyTranslator::Mapper { to_view, .. } => rename_keys(params, to_view),
            KeyTranslator::Custom(translater) => translater.to_view(params),
        }
    }

    /// View-level update to the url-level update.
    pub fn update_to_url(&self, update: ParamUpdate) -> ParamUpdate {
        match self {
            KeyTranslator::Identity => update,
            KeyTranslator::Mapper { to_url, .. } => update
                .into_iter()
                .map(|(key, change)| (renamed(&key, to_url).to_string(), change))
                .collect(),
            KeyTranslator::Custom(translater) => translater.to_url(&update),
        }
    }

    /// Url name of a single view key. A custom translater is asked with a one-key
    /// update; when it does not answer with exactly one key the name passes through.
    pub fn key_to_url(&self, key: &str) -> String {
        match self {
            KeyTranslator::Identity => key.to_string(),
            KeyTranslator::Mapper { to_url, .. } => renamed(key, to_url).to_string(),
            KeyTranslator::Custom(translater) => {
                let single = ParamUpdate::new().with(key, ParamChange::Keep);
                let translated = translater.to_url(&single);
                let mut keys = translated.keys();
                match (keys.next(), keys.next()) {
                    (Some(url_key), None) => url_key.clone(),
                    _ => key.to_string(),
                }
            }
        }
    }
}

fn renamed<'a>(key: &'a str, table: &'a BTreeMap<String, String>) -> &'a str {
    table.get(key).map(String::as_str).unwrap_or(key)
}

fn rename_keys(params: &ParamMap, table: &BTreeMap<String, String>) -> ParamMap {
    params
        .iter()
        .map(|(key, value)| (renamed(key, table).to_string(), value.clone()))
        .collect()
}
