//! The error hierarchy: a forest of registered identities.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Ownership runs from
//! roots to children; `parent` links are back-references used for reporting.
//!
//! A child's identity always wraps its parent's identity, and every node hangs
//! below the most specific registered identity it wraps. Lookup relies on this:
//! when a node does not match an error, none of its descendants can.

use std::error::Error;
use std::fmt;
use std::iter;

use serde::Serialize;
use tracing::{debug, trace};

use crate::errors::RegisterError;
use crate::handler::Handler;
use crate::identity::{ErrorId, matches};

/// Stable index of a node in an [`ErrorHierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One registered identity.
#[derive(Debug)]
pub struct Node<C> {
    identity: ErrorId,
    handler: Handler<C>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<C> Node<C> {
    pub fn identity(&self) -> &ErrorId {
        &self.identity
    }

    pub fn handler(&self) -> &Handler<C> {
        &self.handler
    }

    /// Parent node, `None` for roots.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Forest of registered error identities.
///
/// Built through `&mut self` registration during startup, then only read.
#[derive(Debug)]
pub struct ErrorHierarchy<C> {
    nodes: Vec<Node<C>>,
    roots: Vec<NodeId>,
}

impl<C> Default for ErrorHierarchy<C> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<C: 'static> ErrorHierarchy<C> {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node<C>> {
        self.nodes.get(id.0)
    }

    /// Register `handler` for `identity`.
    ///
    /// The new node is placed below the most specific registered identity that
    /// `identity` wraps. Registered identities that wrap `identity` and sat at
    /// that same level are moved below the new node.
    pub fn register(
        &mut self,
        identity: ErrorId,
        handler: Handler<C>,
    ) -> Result<NodeId, RegisterError> {
        let ancestor = self.deepest_match(&identity);

        if let Some(existing) = ancestor
            && self.nodes[existing.0].identity.matches(&identity)
        {
            debug!(identity = %identity, "error identity already registered");
            return Err(RegisterError::DuplicateRegistration {
                identity: identity.to_string(),
            });
        }

        let id = NodeId(self.nodes.len());
        let level = match ancestor {
            Some(parent) => std::mem::take(&mut self.nodes[parent.0].children),
            None => std::mem::take(&mut self.roots),
        };
        let (adopted, mut kept): (Vec<NodeId>, Vec<NodeId>) = level
            .into_iter()
            .partition(|sibling| self.nodes[sibling.0].identity.matches(&identity));

        for child in &adopted {
            self.nodes[child.0].parent = Some(id);
        }

        debug!(
            identity = %identity,
            parent = ?ancestor.map(|p| self.nodes[p.0].identity.to_string()),
            adopted = adopted.len(),
            "registered error identity"
        );

        self.nodes.push(Node {
            identity,
            handler,
            parent: ancestor,
            children: adopted,
        });
        kept.push(id);
        match ancestor {
            Some(parent) => self.nodes[parent.0].children = kept,
            None => self.roots = kept,
        }

        Ok(id)
    }

    /// Register one handler for several identities, in order.
    ///
    /// Stops at the first failure. Identities registered before the failing
    /// one stay registered.
    pub fn register_all(
        &mut self,
        identities: impl IntoIterator<Item = ErrorId>,
        handler: Handler<C>,
    ) -> Result<Vec<NodeId>, RegisterError> {
        let mut ids = Vec::new();
        for identity in identities {
            ids.push(self.register(identity, handler.clone())?);
        }
        if ids.is_empty() {
            return Err(RegisterError::InvalidArgument(
                "no error identities supplied".to_string(),
            ));
        }
        Ok(ids)
    }

    /// Handler of the most specific node matching `err`.
    pub fn resolve(&self, err: &(dyn Error + 'static)) -> Option<&Handler<C>> {
        let found = self.resolve_node(err);
        trace!(error = %err, matched = found.is_some(), "resolved error handler");
        found.map(|id| &self.nodes[id.0].handler)
    }

    /// Most specific node matching `err`.
    pub fn resolve_node(&self, err: &(dyn Error + 'static)) -> Option<NodeId> {
        self.deepest_match(err)
    }

    /// Node registered for exactly `identity`.
    pub fn find(&self, identity: &ErrorId) -> Option<NodeId> {
        self.deepest_match(identity)
            .filter(|id| self.nodes[id.0].identity == *identity)
    }

    /// Parent links from `id` up to its root, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(self.node(id).and_then(Node::parent), move |p| {
            self.nodes[p.0].parent
        })
    }

    /// Distance from the root; roots have depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Serializable view of the forest.
    pub fn snapshot(&self) -> HierarchySnapshot {
        HierarchySnapshot {
            roots: self.roots.iter().map(|&id| self.snapshot_node(id)).collect(),
        }
    }

    fn snapshot_node(&self, id: NodeId) -> NodeSnapshot {
        let node = &self.nodes[id.0];
        NodeSnapshot {
            identity: node.identity.to_string(),
            children: node
                .children
                .iter()
                .map(|&child| self.snapshot_node(child))
                .collect(),
        }
    }

    /// Walk down from the roots, following matching nodes.
    ///
    /// At most one node per level can match, since identities along one wrap
    /// chain always sit on one root-to-leaf path.
    fn deepest_match(&self, err: &(dyn Error + 'static)) -> Option<NodeId> {
        let mut best = None;
        let mut level = self.roots.as_slice();
        while let Some(&hit) = level
            .iter()
            .find(|id| matches(err, &self.nodes[id.0].identity))
        {
            best = Some(hit);
            level = self.nodes[hit.0].children.as_slice();
        }
        best
    }
}

/// Serializable snapshot of an [`ErrorHierarchy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchySnapshot {
    pub roots: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub identity: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl fmt::Display for HierarchySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(
            f: &mut fmt::Formatter<'_>,
            node: &NodeSnapshot,
            depth: usize,
        ) -> fmt::Result {
            writeln!(f, "{:indent$}{}", "", node.identity, indent = depth * 2)?;
            for child in &node.children {
                write_node(f, child, depth + 1)?;
            }
            Ok(())
        }

        for root in &self.roots {
            write_node(f, root, 0)?;
        }
        Ok(())
    }
}
