//! PropertyMap — the key-value store on nodes and edges.

use indexmap::IndexMap;
use super::Value;

/// A map of property names to values.
///
/// Backed by an order-preserving map so that iteration (and therefore any
/// derived caching or serialization) is deterministic across runs given the
/// same sequence of insertions — see `MatcherOptions` and the label/type
/// caches in `matcher`, which rely on this.
pub type PropertyMap = IndexMap<String, Value>;

/// Build a `PropertyMap` from an iterator of (key, value) pairs.
pub fn property_map<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> PropertyMap
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
