//! Prefetch trees
//!
//! A prefetch tree names the relationships whose targets are fetched along
//! with the main query. The root is an unnamed phantom node. Intermediate
//! nodes created implicitly by a multi-segment path are phantoms too: they
//! only exist to hold their children and are not fetched themselves.
//!
//! Nodes own their children, so `Clone` is a structural deep copy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a prefetched relationship is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefetchSemantics {
    #[default]
    Undefined,
    /// Joined into the main query.
    Joint,
    /// A separate query qualified by the main query's qualifier.
    Disjoint,
    /// A separate query qualified by the ids of the fetched objects.
    DisjointById,
}

impl fmt::Display for PrefetchSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrefetchSemantics::Undefined => "undefined",
            PrefetchSemantics::Joint => "joint",
            PrefetchSemantics::Disjoint => "disjoint",
            PrefetchSemantics::DisjointById => "disjoint_by_id",
        };
        f.write_str(name)
    }
}

/// Callbacks for [`PrefetchTreeNode::traverse`]. A `start_*` returning
/// false skips the node's children; `finish` is called either way.
pub trait PrefetchProcessor {
    fn start_phantom(&mut self, _node: &PrefetchTreeNode) -> bool {
        true
    }

    fn start_disjoint(&mut self, _node: &PrefetchTreeNode) -> bool {
        true
    }

    fn start_disjoint_by_id(&mut self, _node: &PrefetchTreeNode) -> bool {
        true
    }

    fn start_joint(&mut self, _node: &PrefetchTreeNode) -> bool {
        true
    }

    fn start_unknown(&mut self, _node: &PrefetchTreeNode) -> bool {
        true
    }

    fn finish(&mut self, _node: &PrefetchTreeNode) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchTreeNode {
    name: Option<String>,
    /// Dotted path from the root. Empty for the root.
    path: String,
    pub semantics: PrefetchSemantics,
    pub phantom: bool,
    /// Target entity, filled in by query planning when known.
    pub entity_name: Option<String>,
    children: Vec<PrefetchTreeNode>,
}

impl Default for PrefetchTreeNode {
    fn default() -> Self {
        Self::new_root()
    }
}

impl PrefetchTreeNode {
    pub fn new_root() -> Self {
        Self {
            name: None,
            path: String::new(),
            semantics: PrefetchSemantics::Undefined,
            phantom: true,
            entity_name: None,
            children: Vec::new(),
        }
    }

    fn new_child(parent_path: &str, name: &str) -> Self {
        let path = if parent_path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", parent_path, name)
        };
        Self {
            name: Some(name.to_string()),
            path,
            semantics: PrefetchSemantics::Undefined,
            phantom: true,
            entity_name: None,
            children: Vec::new(),
        }
    }

    /// A new tree holding a single non-phantom path.
    pub fn with_path(path: &str, semantics: PrefetchSemantics) -> Self {
        let mut root = Self::new_root();
        let node = root.add_path(path);
        node.phantom = false;
        node.semantics = semantics;
        root
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn children(&self) -> &[PrefetchTreeNode] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_joint(&self) -> bool {
        self.semantics == PrefetchSemantics::Joint
    }

    pub fn is_disjoint(&self) -> bool {
        self.semantics == PrefetchSemantics::Disjoint
    }

    pub fn is_disjoint_by_id(&self) -> bool {
        self.semantics == PrefetchSemantics::DisjointById
    }

    fn child_index(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.name.as_deref() == Some(name))
    }

    fn segments(path: &str) -> impl Iterator<Item = &str> {
        path.split('.').filter(|segment| !segment.is_empty())
    }

    /// Add `path` below this node and return its last node. Nodes that did
    /// not exist yet are created as phantoms; existing nodes are unchanged.
    pub fn add_path(&mut self, path: &str) -> &mut PrefetchTreeNode {
        let mut node = self;
        for segment in Self::segments(path) {
            let index = match node.child_index(segment) {
                Some(index) => index,
                None => {
                    let child = Self::new_child(&node.path, segment);
                    node.children.push(child);
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node
    }

    pub fn get_node(&self, path: &str) -> Option<&PrefetchTreeNode> {
        let mut node = self;
        for segment in Self::segments(path) {
            node = &node.children[node.child_index(segment)?];
        }
        Some(node)
    }

    pub fn get_node_mut(&mut self, path: &str) -> Option<&mut PrefetchTreeNode> {
        let mut node = self;
        for segment in Self::segments(path) {
            let index = node.child_index(segment)?;
            node = &mut node.children[index];
        }
        Some(node)
    }

    /// Merge `other` into this tree. `other` is placed at its own name, or
    /// at this node when it is a root. Defined semantics and non-phantom
    /// status of merged nodes win.
    pub fn merge(&mut self, other: &PrefetchTreeNode) {
        let start = match other.name.as_deref() {
            Some(name) => self.add_path(name),
            None => self,
        };
        Self::merge_into(start, other);
    }

    fn merge_into(target: &mut PrefetchTreeNode, source: &PrefetchTreeNode) {
        if source.semantics != PrefetchSemantics::Undefined {
            target.semantics = source.semantics;
        }
        if !source.phantom {
            target.phantom = false;
        }
        if source.entity_name.is_some() {
            target.entity_name = source.entity_name.clone();
        }
        for child in &source.children {
            let Some(name) = child.name.as_deref() else {
                continue;
            };
            let next = target.add_path(name);
            Self::merge_into(next, child);
        }
    }

    /// Remove the node at `path`. A node that still has children becomes a
    /// phantom instead. Phantom ancestors left without children are removed
    /// as well. Returns false if there was no such node.
    pub fn remove_path(&mut self, path: &str) -> bool {
        let segments: Vec<&str> = Self::segments(path).collect();
        if segments.is_empty() {
            return false;
        }
        Self::remove_segments(self, &segments).is_some()
    }

    /// `Some(prune)` when the path was found; `prune` tells the parent to
    /// drop this node.
    fn remove_segments(node: &mut PrefetchTreeNode, segments: &[&str]) -> Option<bool> {
        let (first, rest) = segments.split_first()?;
        let index = node.child_index(first)?;
        let child = &mut node.children[index];

        let drop_child = if rest.is_empty() {
            if child.has_children() {
                child.phantom = true;
                child.semantics = PrefetchSemantics::Undefined;
                false
            } else {
                true
            }
        } else {
            let dropped_below = Self::remove_segments(child, rest)?;
            dropped_below && child.phantom && !child.has_children()
        };

        if drop_child {
            node.children.remove(index);
        }
        Some(drop_child)
    }

    /// Depth-first walk starting at this node.
    pub fn traverse<P: PrefetchProcessor + ?Sized>(&self, processor: &mut P) {
        let descend = if self.phantom {
            processor.start_phantom(self)
        } else {
            match self.semantics {
                PrefetchSemantics::Disjoint => processor.start_disjoint(self),
                PrefetchSemantics::DisjointById => processor.start_disjoint_by_id(self),
                PrefetchSemantics::Joint => processor.start_joint(self),
                PrefetchSemantics::Undefined => processor.start_unknown(self),
            }
        };

        if descend {
            for child in &self.children {
                child.traverse(processor);
            }
        }
        processor.finish(self);
    }

    fn collect<F>(&self, mut keep: F) -> Vec<&PrefetchTreeNode>
    where
        F: FnMut(&PrefetchTreeNode) -> bool,
    {
        let mut out = Vec::new();
        self.collect_into(&mut keep, &mut out);
        out
    }

    fn collect_into<'a, F>(&'a self, keep: &mut F, out: &mut Vec<&'a PrefetchTreeNode>)
    where
        F: FnMut(&PrefetchTreeNode) -> bool,
    {
        if !self.phantom && keep(self) {
            out.push(self);
        }
        for child in &self.children {
            child.collect_into(keep, out);
        }
    }

    pub fn non_phantom_nodes(&self) -> Vec<&PrefetchTreeNode> {
        self.collect(|_| true)
    }

    pub fn joint_nodes(&self) -> Vec<&PrefetchTreeNode> {
        self.collect(|node| node.is_joint())
    }

    pub fn disjoint_nodes(&self) -> Vec<&PrefetchTreeNode> {
        self.collect(|node| node.is_disjoint())
    }

    pub fn disjoint_by_id_nodes(&self) -> Vec<&PrefetchTreeNode> {
        self.collect(|node| node.is_disjoint_by_id())
    }

    /// Joint nodes reachable from this node without passing through a
    /// disjoint or unknown node. This node itself is not included.
    pub fn adjacent_joint_nodes(&self) -> Vec<&PrefetchTreeNode> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_adjacent_joints(&mut out);
        }
        out
    }

    fn collect_adjacent_joints<'a>(&'a self, out: &mut Vec<&'a PrefetchTreeNode>) {
        if !self.phantom {
            if !self.is_joint() {
                return;
            }
            out.push(self);
        }
        for child in &self.children {
            child.collect_adjacent_joints(out);
        }
    }

    /// Copy of this node and its joint descendants, stopping at the first
    /// non-joint node on each branch. The copy is a root; paths below it
    /// are relative to it.
    pub fn clone_joint_subtree(&self) -> PrefetchTreeNode {
        let mut root = Self::new_root();
        root.name = self.name.clone();
        root.entity_name = self.entity_name.clone();
        self.copy_joint_children(&mut root);
        root
    }

    fn copy_joint_children(&self, target: &mut PrefetchTreeNode) {
        for child in self.children.iter().filter(|child| child.is_joint()) {
            let Some(name) = child.name.as_deref() else {
                continue;
            };
            let mut copy = Self::new_child(&target.path, name);
            copy.semantics = child.semantics;
            copy.phantom = child.phantom;
            copy.entity_name = child.entity_name.clone();
            child.copy_joint_children(&mut copy);
            target.children.push(copy);
        }
    }
}

impl fmt::Display for PrefetchTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self
            .non_phantom_nodes()
            .into_iter()
            .map(|node| format!("{}:{}", node.path, node.semantics))
            .collect::<Vec<_>>();
        write!(f, "[{}]", nodes.join(", "))
    }
}
