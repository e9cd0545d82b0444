//! Attaching related rows to already loaded entities.
//!
//! A [`RelationPath`] names the navigations to follow. Each entity type has a node struct
//! (see `nodes.rs`) whose navigation fields start out [`Nav::NotLoaded`] and are filled in by
//! [`fetch_related`]. Navigations that are already loaded are never queried again; the walk
//! simply continues into them. Exam result lists remember the filters they were loaded with,
//! and a filtered hop onto a list loaded under other filters is rejected.
//!
//! Two strategies produce the same tree:
//!
//! * [`FetchStrategy::Eager`] issues one query per hop for all owners at once.
//! * [`FetchStrategy::OnDemand`] issues one query per owner, keyed by its id.

mod nodes;
mod path;

pub use nodes::{
    CourseAssignmentNode, CourseNode, DepartmentNode, EnrollmentNode, ExamNode, ExamResultNode,
    InstructorNode, Node, RootNode, StudentNode,
};
pub use path::{Hop, HopFilter, Relation, RelationPath};

use crate::error::Result;
use diesel::QueryResult;
use diesel::sqlite::SqliteConnection;
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

/// Most ids bound into a single `IN (...)` list.
const BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    #[default]
    Eager,
    OnDemand,
}

/// A navigation that has either been fetched or not.
///
/// `NotLoaded` is different from an empty collection or a missing optional row: it means
/// nobody has asked for the data yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Nav<T> {
    #[default]
    NotLoaded,
    Loaded(T),
}

impl<T> Nav<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Nav::Loaded(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Nav::Loaded(value) => Some(value),
            Nav::NotLoaded => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Nav::Loaded(value) => Some(value),
            Nav::NotLoaded => None,
        }
    }
}

impl<T: Serialize> Serialize for Nav<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Nav::Loaded(value) => value.serialize(serializer),
            Nav::NotLoaded => serializer.serialize_none(),
        }
    }
}

/// Attaches the data named by `path` to every node in `nodes`.
///
/// The path is checked against the relationship graph before any query runs.
pub fn fetch_related<N: Node>(
    connection: &mut SqliteConnection,
    nodes: &mut [N],
    path: &RelationPath,
    strategy: FetchStrategy,
) -> Result<()> {
    let root = N::KIND;
    path.resolve(root)?;

    tracing::debug!(%root, %path, ?strategy, owners = nodes.len(), "fetching related");
    N::attach(connection, nodes.iter_mut().collect(), path.hops(), strategy)
}

/// Runs `query` over `keys` according to `strategy` and groups the rows by `key_of`.
///
/// `query` must order its rows the same way regardless of how many keys it is given, so
/// both strategies see groups in the same order.
fn load_grouped<R, Q, K>(
    connection: &mut SqliteConnection,
    strategy: FetchStrategy,
    keys: &BTreeSet<i32>,
    mut query: Q,
    key_of: K,
) -> QueryResult<HashMap<i32, Vec<R>>>
where
    Q: FnMut(&mut SqliteConnection, Vec<i32>) -> QueryResult<Vec<R>>,
    K: Fn(&R) -> Option<i32>,
{
    let keys: Vec<i32> = keys.iter().copied().collect();

    let batches: Vec<Vec<i32>> = match strategy {
        FetchStrategy::Eager => keys.chunks(BATCH_SIZE).map(<[i32]>::to_vec).collect(),
        FetchStrategy::OnDemand => keys.iter().map(|&key| vec![key]).collect(),
    };

    let mut grouped: HashMap<i32, Vec<R>> = HashMap::new();

    for batch in batches {
        for row in query(connection, batch)? {
            if let Some(key) = key_of(&row) {
                grouped.entry(key).or_default().push(row);
            }
        }
    }

    Ok(grouped)
}

/// The keys of every node whose navigation still needs fetching.
fn pending<N>(nodes: &[&mut N], key: impl Fn(&N) -> Option<i32>) -> BTreeSet<i32> {
    nodes.iter().filter_map(|node| key(node)).collect()
}

/// Fills a collection navigation from grouped rows, leaving loaded ones untouched.
fn fill_many<R: Clone, N>(
    nav: &mut Nav<Vec<N>>,
    found: &HashMap<i32, Vec<R>>,
    key: i32,
    wrap: impl Fn(R) -> N,
) {
    if nav.is_loaded() {
        return;
    }

    let rows = found.get(&key).cloned().unwrap_or_default();
    *nav = Nav::Loaded(rows.into_iter().map(wrap).collect());
}

/// Fills a required reference. It stays unloaded if the referenced row was not returned.
fn fill_one<R: Clone, N>(
    nav: &mut Nav<N>,
    found: &HashMap<i32, Vec<R>>,
    key: i32,
    wrap: impl Fn(R) -> N,
) {
    if nav.is_loaded() {
        return;
    }

    if let Some(row) = found.get(&key).and_then(|rows| rows.first()) {
        *nav = Nav::Loaded(wrap(row.clone()));
    }
}

/// Fills an optional reference; a `None` key loads as `None` without a query.
fn fill_optional<R: Clone, N>(
    nav: &mut Nav<Option<N>>,
    found: &HashMap<i32, Vec<R>>,
    key: Option<i32>,
    wrap: impl Fn(R) -> N,
) {
    if nav.is_loaded() {
        return;
    }

    let row = key
        .and_then(|key| found.get(&key))
        .and_then(|rows| rows.first())
        .cloned();
    *nav = Nav::Loaded(row.map(wrap));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_loaded_serializes_as_null() {
        let nav: Nav<Vec<i32>> = Nav::NotLoaded;
        assert_eq!(serde_json::to_string(&nav).unwrap(), "null");

        let nav = Nav::Loaded(vec![1, 2]);
        assert_eq!(serde_json::to_string(&nav).unwrap(), "[1,2]");
    }

    #[test]
    fn fill_skips_loaded_collections() {
        let found = HashMap::from([(1, vec![10, 11])]);

        let mut fresh: Nav<Vec<i32>> = Nav::NotLoaded;
        fill_many(&mut fresh, &found, 1, |x| x);
        assert_eq!(fresh, Nav::Loaded(vec![10, 11]));

        let mut loaded = Nav::Loaded(vec![99]);
        fill_many(&mut loaded, &found, 1, |x| x);
        assert_eq!(loaded, Nav::Loaded(vec![99]));

        let mut empty: Nav<Vec<i32>> = Nav::NotLoaded;
        fill_many(&mut empty, &found, 2, |x| x);
        assert_eq!(empty, Nav::Loaded(vec![]));
    }

    #[test]
    fn optional_reference_without_key_loads_none() {
        let found: HashMap<i32, Vec<i32>> = HashMap::new();
        let mut nav: Nav<Option<i32>> = Nav::NotLoaded;

        fill_optional(&mut nav, &found, None, |x| x);
        assert_eq!(nav, Nav::Loaded(None));
    }
}
