//! Depth-first search for message-shaped objects in a page snapshot.
//!
//! A node is message-shaped when it has a non-empty identifier, a
//! sequence-valued content field and a sender. The check goes through the
//! capability traits below rather than a fixed schema, so any tree type can
//! be searched by implementing them; [`serde_json::Value`] is supported out
//! of the box.
//!
//! Matched nodes are not descended into. Matches are keyed by identifier
//! (a later sighting replaces an earlier one but keeps its position) and
//! handed back ordered by creation time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::normalize::parse_instant;

#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("property `{0}` is not accessible")]
    Inaccessible(String),
    #[error("traversal failed: {0}")]
    Other(String),
}

pub trait HasIdentifier {
    fn identifier(&self) -> Option<&str>;
}

pub trait HasContentSequence {
    fn has_content_sequence(&self) -> bool;
}

pub trait HasSender {
    fn sender(&self) -> Option<&str>;
}

pub trait HasCreationTime {
    fn creation_time(&self) -> Option<DateTime<Utc>>;
}

/// A node of the snapshot tree.
pub trait RawNode: HasIdentifier + HasContentSequence + HasSender + HasCreationTime {
    /// Object-valued properties and child nodes, in order.
    fn child_nodes(&self) -> Result<Vec<&Self>, TraversalError>;
}

pub fn is_message_shaped<N: RawNode + ?Sized>(node: &N) -> bool {
    node.identifier().is_some_and(|id| !id.is_empty())
        && node.has_content_sequence()
        && node.sender().is_some_and(|sender| !sender.is_empty())
}

/// Message-shaped nodes found by [`search`], oldest first.
///
/// Single pass: once drained the search has to be run again.
pub struct Discovered<'a, N> {
    inner: std::vec::IntoIter<&'a N>,
}

impl<'a, N> Iterator for Discovered<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<N> ExactSizeIterator for Discovered<'_, N> {}

struct Matches<'a, N> {
    nodes: Vec<&'a N>,
    positions: HashMap<String, usize>,
}

impl<'a, N> Matches<'a, N> {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn insert(&mut self, id: &str, node: &'a N) {
        match self.positions.get(id) {
            Some(&pos) => {
                debug!(id, "Duplicate message id, keeping latest sighting");
                self.nodes[pos] = node;
            }
            None => {
                self.positions.insert(id.to_owned(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }
}

/// Walk `root` up to `max_depth` levels deep and return every message-shaped
/// node, deduplicated by identifier and sorted by ascending creation time.
/// Nodes without a readable creation time sort first.
pub fn search<N: RawNode>(root: &N, max_depth: usize) -> Discovered<'_, N> {
    let mut found = Matches::new();
    walk(root, 0, max_depth, &mut found);

    let mut nodes = found.nodes;
    nodes.sort_by_cached_key(|node| node.creation_time());
    info!(count = nodes.len(), max_depth, "Tree search complete");

    Discovered {
        inner: nodes.into_iter(),
    }
}

fn walk<'a, N: RawNode>(node: &'a N, depth: usize, max_depth: usize, found: &mut Matches<'a, N>) {
    if depth > max_depth {
        return;
    }

    if is_message_shaped(node) {
        if let Some(id) = node.identifier() {
            found.insert(id, node);
        }
        return;
    }

    let children = match node.child_nodes() {
        Ok(children) => children,
        Err(e) => {
            debug!(error = %e, depth, "Skipping node that could not be traversed");
            return;
        }
    };
    for child in children {
        walk(child, depth + 1, max_depth, found);
    }
}

impl HasIdentifier for Value {
    fn identifier(&self) -> Option<&str> {
        self.get("uuid").and_then(Value::as_str)
    }
}

impl HasContentSequence for Value {
    fn has_content_sequence(&self) -> bool {
        self.get("content").is_some_and(Value::is_array)
    }
}

impl HasSender for Value {
    fn sender(&self) -> Option<&str> {
        self.get("sender").and_then(Value::as_str)
    }
}

impl HasCreationTime for Value {
    fn creation_time(&self) -> Option<DateTime<Utc>> {
        self.get("created_at").and_then(parse_instant)
    }
}

impl RawNode for Value {
    fn child_nodes(&self) -> Result<Vec<&Self>, TraversalError> {
        let nested = |v: &&Value| v.is_object() || v.is_array();
        Ok(match self {
            Value::Object(map) => map.values().filter(nested).collect(),
            Value::Array(items) => items.iter().filter(nested).collect(),
            _ => Vec::new(),
        })
    }
}
