//! Entity contexts: whether the route is creating, modifying or only showing an
//! entity, read from the url and written back by transitions.
//!
//! A context lives in one of two places:
//!
//! - **pathname**: `/tests/creation` is a creation, `/tests/AE?modification` a
//!   modification, anything else is read-only.
//! - **search**, under a key: `?test=creation` creates the `test` entity and
//!   `?testAE=modification` modifies the `test` entity with id `AE`. Several entities
//!   can share one route as long as their keys differ.

use regex::Regex;
use serde::Serialize;

use crate::error::{ConfigError, TransitionError};
use crate::location::{HistoryMethod, Location};
use crate::params::{entries_with_prefix, ParamMap};
use crate::update::{merge, ParamChange, ParamUpdate};

/// Marker recognised as "creation" or "modification": either a literal, or a
/// pattern together with the literal transitions write.
#[derive(Debug, Clone)]
pub enum KeyMatcher {
    Literal(String),
    Pattern { regex: Regex, value: String },
}

impl KeyMatcher {
    pub fn literal(value: impl Into<String>) -> Self {
        KeyMatcher::Literal(value.into())
    }

    /// `value` must itself match `pattern`, otherwise a context written by a
    /// transition would not be recognised afterwards.
    pub fn pattern(
        name: &'static str,
        pattern: &str,
        value: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let value = value.into();
        let regex =
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern { name, source })?;
        if !regex.is_match(&value) {
            return Err(ConfigError::PatternMismatch { name, value });
        }
        Ok(KeyMatcher::Pattern { regex, value })
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            KeyMatcher::Literal(value) => value == candidate,
            KeyMatcher::Pattern { regex, .. } => regex.is_match(candidate),
        }
    }

    /// The literal written to the url by transitions.
    pub fn value(&self) -> &str {
        match self {
            KeyMatcher::Literal(value) => value,
            KeyMatcher::Pattern { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PATCH")]
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextState {
    Creating,
    Modifying { id: Option<String> },
    ReadOnly,
}

/// The inferred lifecycle of an entity on the current location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityContext {
    pub state: ContextState,
    /// Entity slot for search contexts; `None` for pathname contexts.
    pub key: Option<String>,
    /// Where the entity goes back to when the context ends. Read-only contexts
    /// have nowhere to go back to.
    pub origin_location: Option<String>,
}

impl EntityContext {
    fn read_only(key: Option<&str>) -> Self {
        Self {
            state: ContextState::ReadOnly,
            key: key.map(str::to_string),
            origin_location: None,
        }
    }

    pub fn is_created_entity(&self) -> bool {
        self.state == ContextState::Creating
    }

    pub fn is_modified_entity(&self) -> bool {
        matches!(self.state, ContextState::Modifying { .. })
    }

    pub fn is_read_only(&self) -> bool {
        self.state == ContextState::ReadOnly
    }

    pub fn method(&self) -> Option<HttpMethod> {
        match self.state {
            ContextState::Creating => Some(HttpMethod::Post),
            ContextState::Modifying { .. } => Some(HttpMethod::Patch),
            ContextState::ReadOnly => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match &self.state {
            ContextState::Modifying { id } => id.as_deref(),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            is_created_entity: self.is_created_entity(),
            is_modified_entity: self.is_modified_entity(),
            method: self.method(),
            read_only: self.is_read_only(),
            key: self.key.clone(),
            id: self.id().map(str::to_string),
            origin_location: self.origin_location.clone(),
        }
    }
}

/// Flat, serializable view of an [`EntityContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub is_created_entity: bool,
    pub is_modified_entity: bool,
    pub method: Option<HttpMethod>,
    pub read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "originLocationString",
        skip_serializing_if = "Option::is_none"
    )]
    pub origin_location: Option<String>,
}

/// Which entity a context call is about, and how its transition navigates.
///
/// No key means the pathname context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextConfig {
    pub key: Option<String>,
    pub id: Option<String>,
    pub history_method: HistoryMethod,
}

impl ContextConfig {
    pub fn pathname() -> Self {
        Self::default()
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_history_method(mut self, method: HistoryMethod) -> Self {
        self.history_method = method;
        self
    }

    /// The search key this config points at. An empty key counts as none.
    pub fn entity_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|key| !key.is_empty())
    }
}

impl From<&str> for ContextConfig {
    fn from(key: &str) -> Self {
        ContextConfig::key(key)
    }
}

/// What a transition writes: a new pathname when it changes, and a url-level
/// param update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub pathname: Option<String>,
    pub update: ParamUpdate,
}

/// Infers contexts and plans transitions between them. Pure: nothing here
/// navigates.
#[derive(Debug, Clone)]
pub struct ContextMachine {
    creation: KeyMatcher,
    modification: KeyMatcher,
}

impl Default for ContextMachine {
    fn default() -> Self {
        Self::new(
            KeyMatcher::literal(crate::config::DEFAULT_CREATION_KEY),
            KeyMatcher::literal(crate::config::DEFAULT_MODIFICATION_KEY),
        )
    }
}

impl ContextMachine {
    pub fn new(creation: KeyMatcher, modification: KeyMatcher) -> Self {
        Self {
            creation,
            modification,
        }
    }

    pub fn creation(&self) -> &KeyMatcher {
        &self.creation
    }

    pub fn modification(&self) -> &KeyMatcher {
        &self.modification
    }

    pub fn infer(
        &self,
        location: &Location,
        params: &ParamMap,
        config: &ContextConfig,
    ) -> EntityContext {
        match config.entity_key() {
            Some(key) => self.infer_in_search(location, params, key, config.id.as_deref()),
            None => self.infer_in_pathname(location, params),
        }
    }

    fn infer_in_pathname(&self, location: &Location, params: &ParamMap) -> EntityContext {
        if let Some(parent) = self.creation_parent(&location.pathname) {
            let origin = Location::from_params(parent, params);
            return EntityContext {
                state: ContextState::Creating,
                key: None,
                origin_location: Some(origin.path()),
            };
        }

        if params.keys().any(|key| self.modification.matches(key)) {
            let remaining: ParamMap = params
                .iter()
                .filter(|(key, _)| !self.modification.matches(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let origin = Location::from_params(location.pathname.as_str(), &remaining);
            return EntityContext {
                state: ContextState::Modifying { id: None },
                key: None,
                origin_location: Some(origin.path()),
            };
        }

        EntityContext::read_only(None)
    }

    fn infer_in_search(
        &self,
        location: &Location,
        params: &ParamMap,
        key: &str,
        id: Option<&str>,
    ) -> EntityContext {
        let origin_without = |param_key: &str| {
            let mut remaining = params.clone();
            remaining.remove(param_key);
            Location::from_params(location.pathname.as_str(), &remaining).path()
        };

        if id.is_none() {
            if let Some(value) = params.get(key) {
                if self.creation.matches(value) {
                    return EntityContext {
                        state: ContextState::Creating,
                        key: Some(key.to_string()),
                        origin_location: Some(origin_without(key)),
                    };
                }
            }
        }

        let Some((param_key, value, resolved_id)) = resolve_entity_param(params, key, id) else {
            return EntityContext::read_only(Some(key));
        };

        if self.modification.matches(value) {
            return EntityContext {
                state: ContextState::Modifying { id: resolved_id },
                key: Some(key.to_string()),
                origin_location: Some(origin_without(param_key)),
            };
        }

        EntityContext::read_only(Some(key))
    }

    /// Parent path when the last pathname segment is the creation marker.
    fn creation_parent<'a>(&self, pathname: &'a str) -> Option<&'a str> {
        let trimmed = pathname.trim_end_matches('/');
        let (parent, segment) = trimmed.rsplit_once('/')?;
        if !self.creation.matches(segment) {
            return None;
        }
        Some(if parent.is_empty() { "/" } else { parent })
    }

    pub fn to_creation(&self, location: &Location, config: &ContextConfig) -> Transition {
        match config.entity_key() {
            Some(key) => Transition {
                pathname: None,
                update: ParamUpdate::new().set(key, self.creation.value()),
            },
            None => {
                let pathname = if self.creation_parent(&location.pathname).is_some() {
                    location.pathname.clone()
                } else {
                    format!(
                        "{}/{}",
                        location.pathname.trim_end_matches('/'),
                        self.creation.value()
                    )
                };
                Transition {
                    pathname: Some(pathname),
                    update: ParamUpdate::new(),
                }
            }
        }
    }

    pub fn to_modification(&self, params: &ParamMap, config: &ContextConfig) -> Transition {
        let Some(key) = config.entity_key() else {
            return Transition {
                pathname: None,
                update: ParamUpdate::new().flag(self.modification.value()),
            };
        };

        let mut update = clear_entity_params(params, key);
        let param_key = format!("{key}{}", config.id.as_deref().unwrap_or(""));
        update.insert(param_key, ParamChange::Set(self.modification.value().to_string()));
        Transition {
            pathname: None,
            update,
        }
    }

    pub fn to_read_only(
        &self,
        location: &Location,
        params: &ParamMap,
        config: &ContextConfig,
    ) -> Result<Transition, TransitionError> {
        if let Some(key) = config.entity_key() {
            return Ok(Transition {
                pathname: None,
                update: clear_entity_params(params, key),
            });
        }

        if let Some(parent) = self.creation_parent(&location.pathname) {
            let Some(id) = config.id.as_deref() else {
                return Err(TransitionError::MissingCreatedId {
                    pathname: location.pathname.clone(),
                });
            };
            return Ok(Transition {
                pathname: Some(format!("{}/{id}", parent.trim_end_matches('/'))),
                update: ParamUpdate::new(),
            });
        }

        let modification_keys: Vec<&String> = params
            .keys()
            .filter(|key| self.modification.matches(key))
            .collect();
        if !modification_keys.is_empty() {
            return Ok(Transition {
                pathname: None,
                update: modification_keys
                    .into_iter()
                    .map(|key| (key.clone(), ParamChange::Delete))
                    .collect(),
            });
        }

        Err(TransitionError::NoPathnameContext {
            pathname: location.pathname.clone(),
        })
    }

    /// Apply a transition to a location directly, without extra params.
    pub fn apply(
        &self,
        location: &Location,
        params: &ParamMap,
        transition: &Transition,
    ) -> Location {
        let pathname = transition
            .pathname
            .clone()
            .unwrap_or_else(|| location.pathname.clone());
        Location::from_params(pathname, &merge(params, &transition.update))
    }
}

/// The param holding `key`'s entity, with the entity id when it can be told.
///
/// With an id only `key + id` is looked at. Without one, `key` itself is tried, then
/// the first param (in key order) whose name starts with `key`; its suffix is the id.
fn resolve_entity_param<'a>(
    params: &'a ParamMap,
    key: &'a str,
    id: Option<&str>,
) -> Option<(&'a str, &'a str, Option<String>)> {
    if let Some(id) = id {
        let param_key = format!("{key}{id}");
        return params
            .get_key_value(param_key.as_str())
            .map(|(k, v)| (k.as_str(), v.as_str(), Some(id.to_string())));
    }

    if let Some((k, v)) = params.get_key_value(key) {
        if !v.is_empty() {
            return Some((k.as_str(), v.as_str(), None));
        }
    }

    entries_with_prefix(params, key)
        .find(|(k, v)| k.len() > key.len() && !v.is_empty())
        .map(|(k, v)| (k.as_str(), v.as_str(), Some(k[key.len()..].to_string())))
}

fn clear_entity_params(params: &ParamMap, key: &str) -> ParamUpdate {
    entries_with_prefix(params, key)
        .map(|(k, _)| (k.clone(), ParamChange::Delete))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_query;

    fn machine() -> ContextMachine {
        ContextMachine::default()
    }

    fn french_machine() -> ContextMachine {
        ContextMachine::new(
            KeyMatcher::pattern("creation_key", "^(nouveau|nouvelle)$", "nouveau").unwrap(),
            KeyMatcher::literal("changement"),
        )
    }

    fn infer(machine: &ContextMachine, path: &str, config: &ContextConfig) -> EntityContext {
        let location = Location::parse(path);
        let params = parse_query(&location.search);
        machine.infer(&location, &params, config)
    }

    fn transition_to(
        machine: &ContextMachine,
        path: &str,
        plan: impl Fn(&ContextMachine, &Location, &ParamMap) -> Transition,
    ) -> String {
        let location = Location::parse(path);
        let params = parse_query(&location.search);
        let transition = plan(machine, &location, &params);
        machine.apply(&location, &params, &transition).path()
    }

    #[test]
    fn test_pathname_creation() {
        let context = infer(&machine(), "/tests/creation", &ContextConfig::pathname());
        assert!(context.is_created_entity());
        assert!(!context.is_modified_entity());
        assert_eq!(context.method(), Some(HttpMethod::Post));
        assert!(!context.is_read_only());
        assert_eq!(context.origin_location.as_deref(), Some("/tests"));
    }

    #[test]
    fn test_pathname_creation_needs_whole_segment() {
        let context = infer(&machine(), "/procreation", &ContextConfig::pathname());
        assert!(context.is_read_only());
    }

    #[test]
    fn test_pathname_modification() {
        let context = infer(&machine(), "/tests/AE?modification", &ContextConfig::pathname());
        assert!(context.is_modified_entity());
        assert_eq!(context.method(), Some(HttpMethod::Patch));
        assert_eq!(context.origin_location.as_deref(), Some("/tests/AE"));
    }

    #[test]
    fn test_pathname_modification_origin_keeps_other_params() {
        let context = infer(
            &machine(),
            "/tests/AE?modification&tab=infos",
            &ContextConfig::pathname(),
        );
        assert_eq!(context.origin_location.as_deref(), Some("/tests/AE?tab=infos"));
    }

    #[test]
    fn test_pathname_read_only() {
        let context = infer(&machine(), "/tests/AE", &ContextConfig::pathname());
        assert_eq!(context, EntityContext::read_only(None));
        assert_eq!(context.method(), None);
    }

    #[test]
    fn test_search_creation() {
        let context = infer(&machine(), "/foo?test=creation", &ContextConfig::key("test"));
        assert!(context.is_created_entity());
        assert_eq!(context.key.as_deref(), Some("test"));
        assert_eq!(context.origin_location.as_deref(), Some("/foo"));
    }

    #[test]
    fn test_search_creation_ignored_with_id() {
        let context = infer(
            &machine(),
            "/foo?test=creation",
            &ContextConfig::key("test").with_id("AE"),
        );
        assert!(context.is_read_only());
    }

    #[test]
    fn test_search_modification_with_id() {
        let context = infer(
            &machine(),
            "/foo?testAE=modification",
            &ContextConfig::key("test").with_id("AE"),
        );
        assert!(context.is_modified_entity());
        assert_eq!(context.id(), Some("AE"));
        assert_eq!(context.method(), Some(HttpMethod::Patch));
    }

    #[test]
    fn test_search_modification_other_id_is_read_only() {
        let context = infer(
            &machine(),
            "/foo?testBF=modification",
            &ContextConfig::key("test").with_id("AE"),
        );
        assert!(context.is_read_only());
    }

    #[test]
    fn test_search_modification_recovers_id_from_prefix() {
        let context = infer(
            &machine(),
            "/foo?page=2&testAE=modification",
            &ContextConfig::key("test"),
        );
        assert_eq!(context.state, ContextState::Modifying { id: Some("AE".into()) });
        assert_eq!(context.origin_location.as_deref(), Some("/foo?page=2"));
    }

    #[test]
    fn test_search_prefix_tie_break_is_key_order() {
        let context = infer(
            &machine(),
            "/foo?testBF=modification&testAE=modification",
            &ContextConfig::key("test"),
        );
        assert_eq!(context.id(), Some("AE"));
    }

    #[test]
    fn test_search_read_only() {
        let context = infer(&machine(), "/foo", &ContextConfig::key("test"));
        assert_eq!(context, EntityContext::read_only(Some("test")));
    }

    #[test]
    fn test_french_pathname_pattern() {
        let french = french_machine();
        let pathname = ContextConfig::pathname();
        assert!(infer(&french, "/beaujolais/nouveau", &pathname).is_created_entity());
        assert!(infer(&french, "/beaujolais/nouvelle", &pathname).is_created_entity());
        assert!(infer(&french, "/beaujolais/AE?changement", &pathname).is_modified_entity());
        assert!(infer(&french, "/beaujolais", &pathname).is_read_only());
    }

    #[test]
    fn test_french_search_pattern() {
        let french = french_machine();
        let key = ContextConfig::key("beaujolais");
        assert!(infer(&french, "/foo?beaujolais=nouveau", &key).is_created_entity());
        assert!(infer(&french, "/foo?beaujolaisAE=changement", &key).is_modified_entity());
        assert!(infer(&french, "/foo", &key).is_read_only());
    }

    #[test]
    fn test_pattern_must_match_its_value() {
        let err = KeyMatcher::pattern("creation_key", "^new$", "nouveau").unwrap_err();
        assert!(matches!(err, ConfigError::PatternMismatch { .. }));
        let err = KeyMatcher::pattern("creation_key", "(", "nouveau").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_to_creation_pathname() {
        let path = transition_to(&machine(), "/tests", |m, loc, _| {
            m.to_creation(loc, &ContextConfig::pathname())
        });
        assert_eq!(path, "/tests/creation");

        let path = transition_to(&machine(), "/tests/", |m, loc, _| {
            m.to_creation(loc, &ContextConfig::pathname())
        });
        assert_eq!(path, "/tests/creation");
    }

    #[test]
    fn test_to_creation_pathname_already_creating() {
        let path = transition_to(&machine(), "/tests/creation", |m, loc, _| {
            m.to_creation(loc, &ContextConfig::pathname())
        });
        assert_eq!(path, "/tests/creation");
    }

    #[test]
    fn test_to_creation_search() {
        let path = transition_to(&machine(), "/foo?page=1", |m, loc, _| {
            m.to_creation(loc, &ContextConfig::key("test"))
        });
        assert_eq!(path, "/foo?page=1&test=creation");
    }

    #[test]
    fn test_to_modification_pathname() {
        let path = transition_to(&machine(), "/tests/AE", |m, _, params| {
            m.to_modification(params, &ContextConfig::pathname())
        });
        assert_eq!(path, "/tests/AE?modification");
    }

    #[test]
    fn test_to_modification_search_clears_other_entities() {
        let path = transition_to(
            &machine(),
            "/foo?test=creation&testBF=modification&page=1",
            |m, _, params| m.to_modification(params, &ContextConfig::key("test").with_id("AE")),
        );
        assert_eq!(path, "/foo?page=1&testAE=modification");
    }

    #[test]
    fn test_to_read_only_from_pathname_creation() {
        let location = Location::parse("/tests/creation");
        let params = ParamMap::new();
        let transition = machine()
            .to_read_only(&location, &params, &ContextConfig::pathname().with_id("AE"))
            .unwrap();
        assert_eq!(transition.pathname.as_deref(), Some("/tests/AE"));
    }

    #[test]
    fn test_to_read_only_from_creation_needs_id() {
        let location = Location::parse("/tests/creation");
        let err = machine()
            .to_read_only(&location, &ParamMap::new(), &ContextConfig::pathname())
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::MissingCreatedId {
                pathname: "/tests/creation".into()
            }
        );
    }

    #[test]
    fn test_to_read_only_from_pathname_modification() {
        let path = transition_to(&machine(), "/tests/AE?modification&tab=2", |m, loc, params| {
            m.to_read_only(loc, params, &ContextConfig::pathname()).unwrap()
        });
        assert_eq!(path, "/tests/AE?tab=2");
    }

    #[test]
    fn test_to_read_only_without_context_fails() {
        let location = Location::parse("/tests/AE");
        let err = machine()
            .to_read_only(&location, &ParamMap::new(), &ContextConfig::pathname())
            .unwrap_err();
        assert!(matches!(err, TransitionError::NoPathnameContext { .. }));
    }

    #[test]
    fn test_to_read_only_search_clears_prefix() {
        let path = transition_to(
            &machine(),
            "/foo?testAE=modification&test=creation&page=1",
            |m, loc, params| m.to_read_only(loc, params, &ContextConfig::key("test")).unwrap(),
        );
        assert_eq!(path, "/foo?page=1");
    }

    #[test]
    fn test_empty_key_is_pathname_context() {
        let config = ContextConfig::key("");
        assert_eq!(config.entity_key(), None);

        let context = infer(&machine(), "/tests/AE?modification&page=2&keywords=x", &config);
        assert!(context.is_modified_entity());
        assert_eq!(context.key, None);

        let path = transition_to(
            &machine(),
            "/tests/AE?modification&page=2&keywords=x",
            |m, loc, params| m.to_read_only(loc, params, &ContextConfig::key("")).unwrap(),
        );
        assert_eq!(path, "/tests/AE?keywords=x&page=2");
    }

    #[test]
    fn test_empty_key_transitions_use_pathname() {
        let path = transition_to(&machine(), "/foo?page=2&keywords=x", |m, _, params| {
            m.to_modification(params, &ContextConfig::key("").with_id("AE"))
        });
        assert_eq!(path, "/foo?keywords=x&modification&page=2");

        let path = transition_to(&machine(), "/foo?page=2", |m, loc, _| {
            m.to_creation(loc, &ContextConfig::key(""))
        });
        assert_eq!(path, "/foo/creation?page=2");
    }

    #[test]
    fn test_snapshot_shape() {
        let context = infer(&machine(), "/foo?testAE=modification", &ContextConfig::key("test"));
        let snapshot = context.snapshot();
        assert_eq!(
            snapshot,
            ContextSnapshot {
                is_created_entity: false,
                is_modified_entity: true,
                method: Some(HttpMethod::Patch),
                read_only: false,
                key: Some("test".into()),
                id: Some("AE".into()),
                origin_location: Some("/foo".into()),
            }
        );
    }
}
