//! Param update engine: computes the next params from the current ones and a
//! partial update.

use std::collections::btree_map;
use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::params::{split_list, ParamMap};

/// What an update does to one param.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamChange {
    /// Write this value. An empty value clears the param.
    Set(String),
    /// Write the key with no value (`?modification`).
    Flag,
    /// Remove the param.
    Delete,
    /// Leave the current value alone, same as not mentioning the key.
    Keep,
}

impl From<&str> for ParamChange {
    /// An empty string clears the param, matching how text inputs report "nothing".
    fn from(value: &str) -> Self {
        if value.is_empty() {
            debug!("Empty string value converted to a param delete");
            ParamChange::Delete
        } else {
            ParamChange::Set(value.to_string())
        }
    }
}

impl From<String> for ParamChange {
    fn from(value: String) -> Self {
        if value.is_empty() {
            debug!("Empty string value converted to a param delete");
            ParamChange::Delete
        } else {
            ParamChange::Set(value)
        }
    }
}

impl From<&String> for ParamChange {
    fn from(value: &String) -> Self {
        ParamChange::from(value.as_str())
    }
}

impl<T: Into<ParamChange>> From<Option<T>> for ParamChange {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => ParamChange::Delete,
        }
    }
}

macro_rules! impl_display_change {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParamChange {
                fn from(value: $ty) -> Self {
                    ParamChange::Set(value.to_string())
                }
            }
        )*
    };
}

// Numbers and booleans are written verbatim, `0` and `false` included.
impl_display_change!(i32, i64, u32, u64, usize, bool);

/// A partial update: only the keys it mentions are touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamUpdate {
    changes: BTreeMap<String, ParamChange>,
}

impl ParamUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ParamUpdate::insert`].
    pub fn with(mut self, key: impl Into<String>, change: impl Into<ParamChange>) -> Self {
        self.insert(key, change);
        self
    }

    pub fn set(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(key, ParamChange::Set(value.into()))
    }

    pub fn flag(self, key: impl Into<String>) -> Self {
        self.with(key, ParamChange::Flag)
    }

    pub fn delete(self, key: impl Into<String>) -> Self {
        self.with(key, ParamChange::Delete)
    }

    /// Record a change for `key`, replacing any earlier change for it.
    pub fn insert(&mut self, key: impl Into<String>, change: impl Into<ParamChange>) {
        self.changes.insert(key.into(), change.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamChange> {
        self.changes.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamChange> {
        self.changes.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.changes.keys()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply `other` on top of this update; its changes win on shared keys.
    pub fn extend(&mut self, other: ParamUpdate) {
        self.changes.extend(other.changes);
    }
}

impl<K: Into<String>, V: Into<ParamChange>> FromIterator<(K, V)> for ParamUpdate {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut update = ParamUpdate::new();
        for (key, change) in iter {
            update.insert(key, change);
        }
        update
    }
}

impl IntoIterator for ParamUpdate {
    type Item = (String, ParamChange);
    type IntoIter = btree_map::IntoIter<String, ParamChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParamUpdate {
    type Item = (&'a String, &'a ParamChange);
    type IntoIter = btree_map::Iter<'a, String, ParamChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Compute the next params from `current` and `update`.
///
/// For every key in either map:
///
/// | change            | result                          |
/// |-------------------|---------------------------------|
/// | `Set(v)`, v != "" | `v`                             |
/// | `Set("")`         | removed                         |
/// | `Flag`            | key kept with an empty value    |
/// | `Delete`          | removed                         |
/// | `Keep` or absent  | current value, if there is one  |
pub fn merge(current: &ParamMap, update: &ParamUpdate) -> ParamMap {
    let mut next: ParamMap = current
        .iter()
        .filter(|(key, _)| !update.contains_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for (key, change) in update {
        match change {
            ParamChange::Set(value) if !value.is_empty() => {
                next.insert(key.clone(), value.clone());
            }
            ParamChange::Set(_) => {
                debug!("Empty value for query param {key} clears it");
            }
            ParamChange::Flag => {
                next.insert(key.clone(), String::new());
            }
            ParamChange::Delete => {}
            ParamChange::Keep => {
                if let Some(value) = current.get(key) {
                    next.insert(key.clone(), value.clone());
                }
            }
        }
    }

    next
}

/// The change that adds `value` to the comma-joined list at `key`, keeping the
/// tokens sorted. `None` for an empty value.
///
/// A missing key is logged and set to `value` alone.
pub fn added_change(current: &ParamMap, key: &str, value: &str) -> Option<ParamChange> {
    if value.is_empty() {
        debug!("Ignoring empty value added to query param {key}");
        return None;
    }

    let next_value = match current.get(key) {
        Some(previous) if !previous.is_empty() => {
            let mut tokens = split_list(previous);
            tokens.push(value);
            tokens.sort_unstable();
            tokens.join(",")
        }
        Some(_) => value.to_string(),
        None => {
            warn!("Adding to query param {key} which is not in the current location");
            value.to_string()
        }
    };
    Some(ParamChange::Set(next_value))
}

/// The change that removes the first token equal to `value` from the list at `key`.
/// `None` when there is nothing to remove.
///
/// Matching is by whole token, so removing `1` from `10,1` leaves `10`. Emptying the
/// list removes the param. A missing key is logged.
pub fn removed_change(current: &ParamMap, key: &str, value: &str) -> Option<ParamChange> {
    let Some(previous) = current.get(key) else {
        warn!("Removing from query param {key} which is not in the current location");
        return None;
    };

    let mut tokens = split_list(previous);
    let position = tokens.iter().position(|token| *token == value)?;
    tokens.remove(position);

    if tokens.is_empty() {
        Some(ParamChange::Delete)
    } else {
        Some(ParamChange::Set(tokens.join(",")))
    }
}

/// Params after adding `value` to the list at `key`.
pub fn add_value(current: &ParamMap, key: &str, value: &str) -> ParamMap {
    match added_change(current, key, value) {
        Some(change) => merge(current, &ParamUpdate::new().with(key, change)),
        None => current.clone(),
    }
}

/// Params after removing `value` from the list at `key`.
pub fn remove_value(current: &ParamMap, key: &str, value: &str) -> ParamMap {
    match removed_change(current, key, value) {
        Some(change) => merge(current, &ParamUpdate::new().with(key, change)),
        None => current.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_merge_sets_and_deletes() {
        let current = params(&[("page", "1"), ("keywords", "test")]);
        let update = ParamUpdate::new().delete("keywords").with("page", 2u32);
        assert_eq!(merge(&current, &update), params(&[("page", "2")]));
    }

    #[test]
    fn test_merge_delete_keeps_others() {
        let current = params(&[("a", "1"), ("b", "2")]);
        let update = ParamUpdate::new().with("a", None::<&str>);
        assert_eq!(merge(&current, &update), params(&[("b", "2")]));
    }

    #[test]
    fn test_merge_absent_key_preserved() {
        let current = params(&[("a", "1"), ("b", "2")]);
        let update = ParamUpdate::new().set("c", "3");
        assert_eq!(
            merge(&current, &update),
            params(&[("a", "1"), ("b", "2"), ("c", "3")])
        );
    }

    #[test]
    fn test_merge_keep_is_same_as_absent() {
        let current = params(&[("a", "1")]);
        let update = ParamUpdate::new().with("a", ParamChange::Keep).with("z", ParamChange::Keep);
        assert_eq!(merge(&current, &update), current);
    }

    #[test]
    fn test_merge_empty_string_deletes() {
        let current = params(&[("keywords", "test"), ("page", "1")]);
        let update = ParamUpdate::new().with("keywords", "");
        assert_eq!(merge(&current, &update), params(&[("page", "1")]));

        let explicit = ParamUpdate::new().with("keywords", ParamChange::Set(String::new()));
        assert_eq!(merge(&current, &explicit), params(&[("page", "1")]));
    }

    #[test]
    fn test_merge_flag_keeps_bare_key() {
        let current = params(&[("page", "1")]);
        let update = ParamUpdate::new().flag("modification");
        assert_eq!(
            merge(&current, &update),
            params(&[("modification", ""), ("page", "1")])
        );
    }

    #[test]
    fn test_merge_zero_and_false_are_settable() {
        let current = ParamMap::new();
        let update = ParamUpdate::new().with("count", 0u32).with("enabled", false);
        assert_eq!(
            merge(&current, &update),
            params(&[("count", "0"), ("enabled", "false")])
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let current = params(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let update = ParamUpdate::new()
            .set("a", "9")
            .delete("b")
            .flag("d")
            .with("c", ParamChange::Keep)
            .with("e", "");
        let once = merge(&current, &update);
        let twice = merge(&once, &update);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_update_later_change_wins() {
        let mut update = ParamUpdate::new().delete("testAE");
        update.extend(ParamUpdate::new().set("testAE", "modification"));
        assert_eq!(
            update.get("testAE"),
            Some(&ParamChange::Set("modification".into()))
        );
        assert_eq!(update.len(), 1);
    }

    #[test]
    fn test_update_from_iter() {
        let update: ParamUpdate = vec![("page", "2"), ("keywords", "")].into_iter().collect();
        assert_eq!(update.get("page"), Some(&ParamChange::Set("2".into())));
        assert_eq!(update.get("keywords"), Some(&ParamChange::Delete));
    }

    #[test]
    fn test_add_value_sorts_tokens() {
        let current = params(&[("jours", "0,1"), ("keywords", "test")]);
        assert_eq!(
            add_value(&current, "jours", "2"),
            params(&[("jours", "0,1,2"), ("keywords", "test")])
        );
        assert_eq!(
            add_value(&params(&[("jours", "1,3")]), "jours", "2"),
            params(&[("jours", "1,2,3")])
        );
    }

    #[test]
    fn test_add_value_to_missing_key_sets_singleton() {
        let current = params(&[("keywords", "test")]);
        assert_eq!(
            add_value(&current, "jours", "2"),
            params(&[("jours", "2"), ("keywords", "test")])
        );
    }

    #[test]
    fn test_add_value_to_flag_sets_singleton() {
        let current = params(&[("jours", "")]);
        assert_eq!(add_value(&current, "jours", "4"), params(&[("jours", "4")]));
    }

    #[test]
    fn test_remove_value() {
        let current = params(&[("jours", "0,1"), ("keywords", "test")]);
        assert_eq!(
            remove_value(&current, "jours", "1"),
            params(&[("jours", "0"), ("keywords", "test")])
        );
        assert_eq!(
            remove_value(&current, "jours", "0"),
            params(&[("jours", "1"), ("keywords", "test")])
        );
    }

    #[test]
    fn test_remove_value_matches_whole_tokens() {
        let current = params(&[("jours", "10,11")]);
        assert_eq!(remove_value(&current, "jours", "1"), current);

        let current = params(&[("jours", "1,10")]);
        assert_eq!(remove_value(&current, "jours", "1"), params(&[("jours", "10")]));
    }

    #[test]
    fn test_remove_last_token_deletes_key() {
        let current = params(&[("jours", "3"), ("page", "1")]);
        assert_eq!(remove_value(&current, "jours", "3"), params(&[("page", "1")]));
    }

    #[test]
    fn test_remove_from_missing_key_is_noop() {
        let current = params(&[("page", "1")]);
        assert_eq!(remove_value(&current, "jours", "1"), current);
    }

    #[test]
    fn test_add_then_remove_restores_list() {
        let current = params(&[("jours", "0,1,5"), ("page", "1")]);
        let added = add_value(&current, "jours", "3");
        assert_eq!(added.get("jours").map(String::as_str), Some("0,1,3,5"));
        assert_eq!(remove_value(&added, "jours", "3"), current);

        // Duplicates are kept, so the inverse holds for values already present.
        let added = add_value(&current, "jours", "1");
        assert_eq!(added.get("jours").map(String::as_str), Some("0,1,1,5"));
        assert_eq!(remove_value(&added, "jours", "1"), current);
    }

    #[test]
    fn test_no_change_for_empty_add_or_absent_token() {
        let current = params(&[("jours", "0,1")]);
        assert_eq!(added_change(&current, "jours", ""), None);
        assert_eq!(removed_change(&current, "jours", "5"), None);
        assert_eq!(removed_change(&current, "page", "1"), None);
        assert_eq!(
            added_change(&current, "jours", "2"),
            Some(ParamChange::Set("0,1,2".into()))
        );
        assert_eq!(
            removed_change(&params(&[("jours", "1")]), "jours", "1"),
            Some(ParamChange::Delete)
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, logs.contents())
    }

    #[test]
    fn test_empty_string_delete_is_logged() {
        let (change, logs) = with_captured_logs(|| ParamChange::from(""));
        assert_eq!(change, ParamChange::Delete);
        assert!(logs.contains("Empty string value converted to a param delete"));

        let (change, logs) = with_captured_logs(|| ParamChange::from(String::new()));
        assert_eq!(change, ParamChange::Delete);
        assert!(logs.contains("Empty string value converted to a param delete"));
    }

    #[test]
    fn test_none_delete_is_not_logged() {
        let (change, logs) = with_captured_logs(|| ParamChange::from(None::<&str>));
        assert_eq!(change, ParamChange::Delete);
        assert!(!logs.contains("Empty string value"));
    }
}
