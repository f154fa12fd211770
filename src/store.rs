//! The prefix-partitioned resource store.
//!
//! One store instance is the shared addressable state of a single
//! workflow execution. Buckets are keyed by prefix; each prefix is bound
//! to exactly one registered resource kind. Query resolution is linear in
//! bucket size and deliberately uncached: pipelines here are author-scale,
//! not query-scale.

use crate::error::{Error, Result};
use crate::property::Configurable;
use crate::resource::{Container, Pattern, Resource};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;

/// The outcome of a store query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<'a> {
    /// Resources matched by id, in bucket insertion order.
    Matches(Vec<&'a Resource>),
    /// A scalar read off a located resource (dotted query).
    Value(Value),
}

impl<'a> QueryResult<'a> {
    pub fn is_empty(&self) -> bool {
        match self {
            QueryResult::Matches(items) => items.is_empty(),
            QueryResult::Value(_) => false,
        }
    }

    /// The matched resources, or empty for a scalar result.
    pub fn resources(&self) -> &[&'a Resource] {
        match self {
            QueryResult::Matches(items) => items,
            QueryResult::Value(_) => &[],
        }
    }

    /// Render the result the way interpolated templates expect: strings
    /// verbatim, other values in compact JSON, several matches joined
    /// with `", "`.
    pub fn display_string(&self) -> String {
        fn value_text(v: &Value) -> String {
            match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        }
        match self {
            QueryResult::Value(v) => value_text(v),
            QueryResult::Matches(items) => items
                .iter()
                .map(|r| value_text(r.value()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// A parsed `prefix:key` query.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Query {
    /// Bare `*`: every resource in every bucket.
    All,
    Bucket { prefix: String, key: String },
}

impl Query {
    fn parse(text: &str) -> Result<Query> {
        if text == "*" {
            return Ok(Query::All);
        }
        let (prefix, key) = text
            .split_once(':')
            .ok_or_else(|| Error::MalformedQuery(text.to_string()))?;
        if prefix.is_empty() || key.is_empty() {
            return Err(Error::MalformedQuery(text.to_string()));
        }
        Ok(Query::Bucket {
            prefix: prefix.to_string(),
            key: key.to_string(),
        })
    }
}

/// Prefix-partitioned map of [`Container`]s.
///
/// All state is per-instance; `Clone` produces the deep value copy that
/// branch snapshots rely on.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    buckets: IndexMap<String, Container>,
    kinds: HashMap<String, String>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a prefix to a resource kind. The first caller for a prefix
    /// wins; re-registering the same kind is a no-op, a different kind is
    /// a collision.
    pub fn register(&mut self, prefix: &str, kind: &str) -> Result<()> {
        if let Some(existing) = self.kinds.get(prefix) {
            if existing != kind {
                return Err(Error::PrefixConflict {
                    prefix: prefix.to_string(),
                    existing: existing.clone(),
                    requested: kind.to_string(),
                });
            }
            return Ok(());
        }
        self.kinds.insert(prefix.to_string(), kind.to_string());
        self.buckets.entry(prefix.to_string()).or_default();
        Ok(())
    }

    /// The kind registered under a prefix, if any.
    pub fn kind_of(&self, prefix: &str) -> Option<&str> {
        self.kinds.get(prefix).map(String::as_str)
    }

    /// Append a resource into its prefix bucket, creating the bucket if
    /// absent.
    pub fn add(&mut self, resource: Resource) {
        self.buckets
            .entry(resource.prefix().to_string())
            .or_default()
            .add(resource);
    }

    /// Remove every resource in a bucket whose id matches the pattern.
    /// Returns the removed resources. Removal is only ever explicit.
    pub fn remove(&mut self, prefix: &str, pattern: &str) -> Vec<Resource> {
        let Some(bucket) = self.buckets.get_mut(prefix) else {
            return Vec::new();
        };
        let pattern = Pattern::parse(pattern);
        let mut kept = Container::new();
        let mut removed = Vec::new();
        for resource in bucket.iter().cloned() {
            if pattern.matches(resource.id()) {
                removed.push(resource);
            } else {
                kept.add(resource);
            }
        }
        *bucket = kept;
        removed
    }

    /// The container registered under a prefix, if any.
    pub fn bucket(&self, prefix: &str) -> Option<&Container> {
        self.buckets.get(prefix)
    }

    /// Resolve a query string.
    ///
    /// Grammar: `Prefix:Name`, `Prefix:*`, `Prefix:prefix*`,
    /// `Prefix:*suffix`, `Prefix:Name.property`, bare `*`. An exact
    /// whole-key match is attempted before dotted addressing, so resource
    /// ids may themselves contain dots. Unknown prefixes and unmatched
    /// keys resolve to empty matches, not errors.
    pub fn query(&self, text: &str) -> Result<QueryResult<'_>> {
        match Query::parse(text)? {
            Query::All => {
                let all = self
                    .buckets
                    .values()
                    .flat_map(Container::iter)
                    .collect::<Vec<_>>();
                Ok(QueryResult::Matches(all))
            }
            Query::Bucket { prefix, key } => {
                let Some(bucket) = self.buckets.get(&prefix) else {
                    return Ok(QueryResult::Matches(Vec::new()));
                };
                let matches = bucket.find(&key);
                if !matches.is_empty() {
                    return Ok(QueryResult::Matches(matches));
                }
                if let Some((name, prop)) = key.rsplit_once('.') {
                    if let Some(resource) = bucket.find(name).into_iter().next() {
                        let value = resource
                            .property(prop)?
                            .value()
                            .cloned()
                            .unwrap_or(Value::Null);
                        return Ok(QueryResult::Value(value));
                    }
                }
                Ok(QueryResult::Matches(Vec::new()))
            }
        }
    }

    /// Total resource count across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Container::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ResourceStore {
        let mut store = ResourceStore::new();
        store.register("X", "TextResource").unwrap();
        store.add(Resource::new("X", "alpha_1", json!("a1")));
        store.add(Resource::new("X", "alpha_2", json!("a2")));
        store.add(Resource::new("X", "beta_1", json!("b1")));
        store
    }

    #[test]
    fn test_register_same_kind_is_noop() {
        let mut store = store();
        store.register("X", "TextResource").unwrap();
    }

    #[test]
    fn test_register_conflicting_kind_fails() {
        let mut store = store();
        let err = store.register("X", "FileResource").unwrap_err();
        assert!(matches!(err, Error::PrefixConflict { .. }));
    }

    #[test]
    fn test_query_whole_bucket_is_stable() {
        let store = store();
        let first: Vec<String> = store
            .query("X:*")
            .unwrap()
            .resources()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        let second: Vec<String> = store
            .query("X:*")
            .unwrap()
            .resources()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["alpha_1", "alpha_2", "beta_1"]);
    }

    #[test]
    fn test_query_wildcards() {
        let store = store();
        let prefix: Vec<&str> = store
            .query("X:alpha*")
            .unwrap()
            .resources()
            .iter()
            .map(|r| r.id())
            .collect();
        assert_eq!(prefix, vec!["alpha_1", "alpha_2"]);
        let suffix: Vec<&str> = store
            .query("X:*_1")
            .unwrap()
            .resources()
            .iter()
            .map(|r| r.id())
            .collect();
        assert_eq!(suffix, vec!["alpha_1", "beta_1"]);
    }

    #[test]
    fn test_query_bare_star_spans_buckets() {
        let mut store = store();
        store.register("Y", "OtherResource").unwrap();
        store.add(Resource::new("Y", "gamma", json!("g")));
        let all = store.query("*").unwrap();
        assert_eq!(all.resources().len(), 4);
        assert_eq!(all.resources()[3].id(), "gamma");
    }

    #[test]
    fn test_query_dotted_property() {
        let mut store = store();
        store.add(
            Resource::new("X", "report", json!("/tmp/report"))
                .with_property("size", json!(17)),
        );
        let result = store.query("X:report.size").unwrap();
        assert_eq!(result, QueryResult::Value(json!(17)));
    }

    #[test]
    fn test_exact_match_wins_over_dotted_split() {
        let mut store = store();
        store.add(Resource::new("X", "file.txt", json!("contents")));
        let result = store.query("X:file.txt").unwrap();
        assert_eq!(result.resources().len(), 1);
        assert_eq!(result.resources()[0].id(), "file.txt");
    }

    #[test]
    fn test_malformed_query() {
        let store = store();
        assert!(matches!(
            store.query("no-colon").unwrap_err(),
            Error::MalformedQuery(_)
        ));
        assert!(matches!(
            store.query(":key").unwrap_err(),
            Error::MalformedQuery(_)
        ));
        assert!(matches!(
            store.query("X:").unwrap_err(),
            Error::MalformedQuery(_)
        ));
    }

    #[test]
    fn test_unknown_prefix_is_empty_not_error() {
        let store = store();
        assert!(store.query("Nope:*").unwrap().is_empty());
    }

    #[test]
    fn test_remove_is_explicit() {
        let mut store = store();
        let removed = store.remove("X", "alpha*");
        assert_eq!(removed.len(), 2);
        assert_eq!(store.query("X:*").unwrap().resources().len(), 1);
    }
}
