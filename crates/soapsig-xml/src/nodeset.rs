#![forbid(unsafe_code)]

//! NodeSet type for canonicalization and reference processing.
//!
//! A `NodeSet` is the document subset a `Reference` selects.  For the
//! same-document `#id` references used by WS-Security that subset is always
//! an element subtree, optionally without comment nodes.

use std::collections::HashSet;
use uppsala::{Document, NodeId, NodeKind};

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: HashSet<usize>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node set for a subtree rooted at the given node (without comments).
    pub fn tree_without_comments(root_id: NodeId, doc: &Document<'_>) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(root_id, doc, &mut nodes, false);
        Self { nodes }
    }

    /// Create a node set for a subtree rooted at the given node (with comments).
    pub fn tree_with_comments(root_id: NodeId, doc: &Document<'_>) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(root_id, doc, &mut nodes, true);
        Self { nodes }
    }

    /// Check if a node is in this set.
    pub fn contains_id(&self, id: NodeId) -> bool {
        self.nodes.contains(&id.index())
    }

    /// Add a node to this set.
    pub fn insert_id(&mut self, id: NodeId) {
        self.nodes.insert(id.index());
    }

    /// Check if this set is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the set.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn collect_subtree(
    id: NodeId,
    doc: &Document<'_>,
    set: &mut HashSet<usize>,
    include_comments: bool,
) {
    if !include_comments && matches!(doc.node_kind(id), Some(NodeKind::Comment(_))) {
        return;
    }
    set.insert(id.index());
    for child in doc.children(id) {
        collect_subtree(child, doc, set, include_comments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document;

    #[test]
    fn test_tree_excludes_comments() {
        let doc = crate::parse("<r><a>t<!--c--><b/></a><z/></r>").unwrap();
        let a = document::find_element(&doc, "", "a").unwrap();
        let without = NodeSet::tree_without_comments(a, &doc);
        let with = NodeSet::tree_with_comments(a, &doc);
        assert_eq!(without.len(), 3);
        assert_eq!(with.len(), 4);

        let z = document::find_element(&doc, "", "z").unwrap();
        assert!(!without.contains_id(z));
        assert!(without.contains_id(a));

        let mut set = NodeSet::new();
        assert!(set.is_empty());
        set.insert_id(z);
        assert!(set.contains_id(z));
    }
}
