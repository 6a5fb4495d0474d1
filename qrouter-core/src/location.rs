use std::fmt;

use serde::Serialize;

use crate::codec::stringify_query;
use crate::params::ParamMap;

/// A pathname plus search string, as the history collaborator reports it.
///
/// `search` is either empty or starts with `?`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub pathname: String,
    pub search: String,
}

impl Location {
    pub fn new(pathname: impl Into<String>, search: impl Into<String>) -> Self {
        let search: String = search.into();
        let search = if search.is_empty() || search == "?" {
            String::new()
        } else if search.starts_with('?') {
            search
        } else {
            format!("?{search}")
        };
        Self {
            pathname: pathname.into(),
            search,
        }
    }

    /// Split a path such as `/tests/AE?modification` into pathname and search.
    /// A `#fragment` is dropped.
    pub fn parse(path: &str) -> Self {
        let path = path.split_once('#').map_or(path, |(before, _)| before);
        match path.split_once('?') {
            Some((pathname, query)) => Self::new(pathname, query),
            None => Self::new(path, ""),
        }
    }

    /// Location at `pathname` whose search encodes `params`.
    pub fn from_params(pathname: impl Into<String>, params: &ParamMap) -> Self {
        Self::new(pathname, stringify_query(params))
    }

    /// Pathname and search joined, ready to hand to the history.
    pub fn path(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pathname, self.search)
    }
}

/// How a navigation lands in the history stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMethod {
    #[default]
    Push,
    Replace,
}

impl HistoryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryMethod::Push => "push",
            HistoryMethod::Replace => "replace",
        }
    }
}

/// A planned navigation: where to go and how. Computing one has no side effects;
/// the router hands it to the [`Navigator`](crate::navigator::Navigator) separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub location: Location,
    pub method: HistoryMethod,
}

impl Navigation {
    pub fn new(location: Location, method: HistoryMethod) -> Self {
        Self { location, method }
    }

    pub fn push(location: Location) -> Self {
        Self::new(location, HistoryMethod::Push)
    }

    pub fn path(&self) -> String {
        self.location.path()
    }
}
