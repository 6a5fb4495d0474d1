//! Keeps view state in a url's query string and path.
//!
//! The pieces, leaves first:
//!
//! - [`codec`]: raw search string <-> [`ParamMap`], with a single-slot memo.
//! - [`translate`]: optional renaming between url keys and view keys.
//! - [`update`]: merge rules for partial updates, plus multi-value add/remove.
//! - [`context`]: creation / modification / read-only contexts inferred from the
//!   pathname or a keyed param, and the transitions between them.
//! - [`router`]: [`QueryRouter`], which reads the location from a [`Navigator`]
//!   and navigates through it.

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod location;
pub mod navigator;
pub mod params;
pub mod router;
pub mod translate;
pub mod update;

pub use codec::{parse_query, stringify_query, QueryCodec};
pub use config::{KeyMatcherConfig, RouterConfig};
pub use context::{
    ContextConfig, ContextMachine, ContextSnapshot, ContextState, EntityContext, HttpMethod,
    KeyMatcher, Transition,
};
pub use error::{ConfigError, TransitionError};
pub use location::{HistoryMethod, Location, Navigation};
pub use navigator::{MemoryHistory, Navigator};
pub use params::ParamMap;
pub use router::{ChangeOptions, QueryRouter};
pub use translate::{FnTranslater, KeyTranslator, Translater};
pub use update::{
    add_value, added_change, merge, remove_value, removed_change, ParamChange, ParamUpdate,
};
