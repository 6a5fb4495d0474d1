//! The surface a host view consumes.
//!
//! Every acting method has a `plan_*` twin that computes the [`Navigation`] from the
//! current location without touching the history. The acting method hands that
//! navigation to the [`Navigator`] and returns it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::QueryCodec;
use crate::config::RouterConfig;
use crate::context::{ContextConfig, ContextMachine, EntityContext, Transition};
use crate::error::{ConfigError, TransitionError};
use crate::location::{HistoryMethod, Location, Navigation};
use crate::navigator::Navigator;
use crate::params::ParamMap;
use crate::translate::KeyTranslator;
use crate::update::{added_change, merge, removed_change, ParamChange, ParamUpdate};

/// Options for [`QueryRouter::change`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeOptions {
    /// Navigate to this pathname instead of the current one
    pub pathname: Option<String>,
    pub history_method: HistoryMethod,
}

impl ChangeOptions {
    pub fn replace() -> Self {
        Self {
            history_method: HistoryMethod::Replace,
            ..Self::default()
        }
    }

    pub fn with_pathname(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = Some(pathname.into());
        self
    }
}

/// Keeps view state in the url of the location its [`Navigator`] reports.
pub struct QueryRouter<N> {
    navigator: N,
    codec: QueryCodec,
    translator: KeyTranslator,
    machine: ContextMachine,
}

impl<N: Navigator> QueryRouter<N> {
    pub fn new(config: RouterConfig, navigator: N) -> Result<Self, ConfigError> {
        Ok(Self {
            navigator,
            codec: QueryCodec::new(),
            translator: config.translator()?,
            machine: config.context_machine()?,
        })
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn location(&self) -> Location {
        self.navigator.current_location()
    }

    /// Url params of the current location. Repeated calls on an unchanged search
    /// return the same map.
    pub fn parse(&self) -> Arc<ParamMap> {
        self.codec.decode(&self.location().search)
    }

    /// Current params as the view names them.
    pub fn translate(&self) -> ParamMap {
        self.translator.params_to_view(&self.parse())
    }

    /// Plan a change from a view-level update.
    pub fn plan_change(&self, update: ParamUpdate, options: &ChangeOptions) -> Navigation {
        let url_update = self.translator.update_to_url(update);
        self.plan_url_change(&url_update, options.pathname.clone(), options.history_method)
    }

    pub fn change(&self, update: ParamUpdate, options: &ChangeOptions) -> Navigation {
        let navigation = self.plan_change(update, options);
        self.dispatch(navigation)
    }

    /// Plan adding `value` to the comma-joined list at `key`. `None` when the
    /// params would not change.
    pub fn plan_add(&self, key: &str, value: &str) -> Option<Navigation> {
        let location = self.location();
        let params = self.codec.decode(&location.search);
        let change = added_change(&params, &self.translator.key_to_url(key), value)?;
        self.plan_list_change(location.pathname, &params, key, change)
    }

    pub fn add(&self, key: &str, value: &str) -> Option<Navigation> {
        let navigation = self.plan_add(key, value)?;
        Some(self.dispatch(navigation))
    }

    /// Plan removing `value` from the list at `key`. `None` when the location has
    /// no such param or the list does not hold `value`.
    pub fn plan_remove(&self, key: &str, value: &str) -> Option<Navigation> {
        let location = self.location();
        let params = self.codec.decode(&location.search);
        let change = removed_change(&params, &self.translator.key_to_url(key), value)?;
        self.plan_list_change(location.pathname, &params, key, change)
    }

    pub fn remove(&self, key: &str, value: &str) -> Option<Navigation> {
        let navigation = self.plan_remove(key, value)?;
        Some(self.dispatch(navigation))
    }

    /// Plan dropping the whole search, keeping the pathname.
    pub fn plan_clear(&self) -> Navigation {
        Navigation::push(Location::new(self.location().pathname, ""))
    }

    pub fn clear(&self) -> Navigation {
        let navigation = self.plan_clear();
        self.dispatch(navigation)
    }

    /// Context of the entity described by `config`; the pathname context when it
    /// has no key.
    pub fn context(&self, config: &ContextConfig) -> EntityContext {
        let location = self.location();
        let params = self.codec.decode(&location.search);
        self.machine.infer(&location, &params, config)
    }

    pub fn plan_creation(&self, extra: ParamUpdate, config: &ContextConfig) -> Navigation {
        let transition = self.machine.to_creation(&self.location(), config);
        self.plan_transition(extra, transition, config.history_method)
    }

    pub fn change_to_creation(&self, extra: ParamUpdate, config: &ContextConfig) -> Navigation {
        let navigation = self.plan_creation(extra, config);
        self.dispatch(navigation)
    }

    pub fn plan_modification(&self, extra: ParamUpdate, config: &ContextConfig) -> Navigation {
        let transition = self.machine.to_modification(&self.parse(), config);
        self.plan_transition(extra, transition, config.history_method)
    }

    pub fn change_to_modification(
        &self,
        extra: ParamUpdate,
        config: &ContextConfig,
    ) -> Navigation {
        let navigation = self.plan_modification(extra, config);
        self.dispatch(navigation)
    }

    pub fn plan_read_only(
        &self,
        extra: ParamUpdate,
        config: &ContextConfig,
    ) -> Result<Navigation, TransitionError> {
        let location = self.location();
        let params = self.codec.decode(&location.search);
        let transition = self.machine.to_read_only(&location, &params, config)?;
        Ok(self.plan_transition(extra, transition, config.history_method))
    }

    /// Leave the current context. Logs and does nothing when there is no context
    /// to leave, or when leaving a creation without the created id.
    pub fn change_to_read_only(
        &self,
        extra: ParamUpdate,
        config: &ContextConfig,
    ) -> Option<Navigation> {
        match self.plan_read_only(extra, config) {
            Ok(navigation) => Some(self.dispatch(navigation)),
            Err(e) => {
                warn!("Skipping read-only transition: {e}");
                None
            }
        }
    }

    /// Extra params are view-level and get translated; the transition's own
    /// params are url-level already and win on shared keys.
    fn plan_transition(
        &self,
        extra: ParamUpdate,
        transition: Transition,
        method: HistoryMethod,
    ) -> Navigation {
        let mut update = self.translator.update_to_url(extra);
        update.extend(transition.update);
        self.plan_url_change(&update, transition.pathname, method)
    }

    /// The list value was computed under the url key; the write still goes through
    /// the translator like any other view-level change.
    fn plan_list_change(
        &self,
        pathname: String,
        params: &ParamMap,
        key: &str,
        change: ParamChange,
    ) -> Option<Navigation> {
        let update = self.translator.update_to_url(ParamUpdate::new().with(key, change));
        let next = merge(params, &update);
        if next == *params {
            debug!("Query param {key} unchanged, not navigating");
            return None;
        }
        Some(Navigation::push(Location::from_params(pathname, &next)))
    }

    fn plan_url_change(
        &self,
        update: &ParamUpdate,
        pathname: Option<String>,
        method: HistoryMethod,
    ) -> Navigation {
        let location = self.location();
        let params = self.codec.decode(&location.search);
        let next = merge(&params, update);
        let pathname = pathname.unwrap_or(location.pathname);
        Navigation::new(Location::from_params(pathname, &next), method)
    }

    fn dispatch(&self, navigation: Navigation) -> Navigation {
        debug!(
            "Navigating ({}) to {}",
            navigation.method.as_str(),
            navigation.location
        );
        self.navigator.navigate(&navigation.path(), navigation.method);
        navigation
    }
}
