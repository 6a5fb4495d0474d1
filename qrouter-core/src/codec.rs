//! Query string codec.
//!
//! Decoding follows the form convention (`+` is a space); encoding percent-encodes
//! everything outside the RFC 3986 unreserved set, spaces included, and never emits `+`.

use std::collections::btree_map::Entry;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::params::ParamMap;

/// Parse a raw search string into params.
///
/// A leading `?` is stripped. Each `&`-separated segment is split on its first `=`;
/// a segment without `=` is a key with an empty value. Repeated keys are joined with
/// `,` in order of appearance. Never fails: undecodable escapes are kept as written.
pub fn parse_query(raw: &str) -> ParamMap {
    let query = raw.strip_prefix('?').unwrap_or(raw);
    let mut params = ParamMap::new();

    for segment in query.split('&') {
        if segment.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = segment.split_once('=').unwrap_or((segment, ""));
        let key = decode_component(raw_key);
        if key.is_empty() {
            continue;
        }
        let value = decode_component(raw_value);

        match params.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.is_empty() {
                    *existing = value;
                } else if !value.is_empty() {
                    existing.push(',');
                    existing.push_str(&value);
                }
            }
        }
    }

    params
}

/// Serialize params to a search string without the leading `?`.
///
/// Keys come out in map order. An empty value is written as a bare key, so
/// presence-only params such as `modification` survive a round trip.
pub fn stringify_query(params: &ParamMap) -> String {
    params
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                urlencoding::encode(key).into_owned()
            } else {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| spaced.clone())
}

struct CachedQuery {
    raw: String,
    params: Arc<ParamMap>,
}

/// Memoizing decoder with a single slot.
///
/// Decoding the same raw string as the previous call hands back the cached map
/// without parsing again; any other input replaces the slot. Each router owns its
/// own codec, so independent routers never share a cache.
pub struct QueryCodec {
    last: Mutex<Option<CachedQuery>>,
}

impl Default for QueryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCodec {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    /// Decode `raw`, reusing the cached map when `raw` matches the previous input.
    pub fn decode(&self, raw: &str) -> Arc<ParamMap> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = last.as_ref() {
            if cached.raw == raw {
                debug!("Query cache hit for {raw:?}");
                return Arc::clone(&cached.params);
            }
        }

        let params = Arc::new(parse_query(raw));
        *last = Some(CachedQuery {
            raw: raw.to_string(),
            params: Arc::clone(&params),
        });
        params
    }

    /// Serialize params; encoding has nothing worth caching.
    pub fn encode(&self, params: &ParamMap) -> String {
        stringify_query(params)
    }
}
