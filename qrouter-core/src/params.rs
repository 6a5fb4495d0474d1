use std::collections::BTreeMap;
use std::ops::Bound;

/// Decoded query params, keyed by param name.
///
/// Ordered by key: serialization order and prefix scans follow lexicographic key
/// order, so the first entry found for a prefix is always the same one.
pub type ParamMap = BTreeMap<String, String>;

/// Entries whose key starts with `prefix`, in key order.
///
/// Uses the map's ordering as the prefix index: a range seek to `prefix` followed by
/// a scan that stops at the first key leaving the prefix.
pub fn entries_with_prefix<'a>(
    params: &'a ParamMap,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
    params
        .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(key, _)| key.starts_with(prefix))
}

/// Split a comma-joined multi-value param into its non-empty tokens.
pub fn split_list(value: &str) -> Vec<&str> {
    value.split(',').filter(|token| !token.is_empty()).collect()
}
