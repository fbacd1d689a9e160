//! Arena-backed tree of logical plan nodes.

use crate::expr::SelectorName;
use crate::ArborError;
pub use plan_node::*;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::default::Default;
use std::fmt;
mod plan_node;

/// Tree of plan nodes where data flows from the leaves to the root.
///
/// Nodes live in an arena and refer to their parent and children by index. Removed nodes
/// leave an empty slot so that the indices of the remaining nodes stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTree {
    nodes: Vec<Option<PlanNode>>,
    /// The root represents the final output operation.
    root: Option<NodeIndex>,
}

impl Default for PlanTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanTree {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Adds a detached node and returns its index. The first node added becomes the root.
    ///
    /// # Arguments
    ///
    /// * `node_type` - Operation of the new node.
    pub fn add_node(&mut self, node_type: NodeType) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        self.nodes.push(Some(PlanNode::new(node_type)));
        if self.root.is_none() {
            self.root = Some(index);
        }
        index
    }

    /// Gets the index of the root node, if such a node is present.
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    /// Makes `index` the root. The node must not have a parent.
    pub fn set_root(&mut self, index: NodeIndex) {
        debug_assert!(self.node(index).parent.is_none());
        self.root = Some(index);
    }

    /// Returns the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the node was removed or never existed.
    pub fn node(&self, index: NodeIndex) -> &PlanNode {
        match self.nodes.get(index.0) {
            Some(Some(node)) => node,
            _ => panic!("plan node {} does not exist", index),
        }
    }

    /// Returns the node at `index` for mutation.
    ///
    /// # Panics
    ///
    /// Panics if the node was removed or never existed.
    pub fn node_mut(&mut self, index: NodeIndex) -> &mut PlanNode {
        match self.nodes.get_mut(index.0) {
            Some(Some(node)) => node,
            _ => panic!("plan node {} does not exist", index),
        }
    }

    /// Returns true if `index` refers to a live node.
    pub fn contains(&self, index: NodeIndex) -> bool {
        matches!(self.nodes.get(index.0), Some(Some(_)))
    }

    pub fn node_type(&self, index: NodeIndex) -> NodeType {
        self.node(index).node_type
    }

    pub fn children(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.node(index).children
    }

    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.node(index).parent
    }

    /// Returns the only child of a node, or its first child.
    pub fn first_child(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.node(index).children.first().copied()
    }

    /// Returns the total number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Appends `child` to the children of `parent`, detaching it from any previous parent.
    pub fn add_last_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.remove_from_parent(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        if self.root == Some(child) {
            self.root = self.top_of(parent);
        }
    }

    /// Prepends `child` to the children of `parent`, detaching it from any previous parent.
    pub fn add_first_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.remove_from_parent(child);
        self.node_mut(parent).children.insert(0, child);
        self.node_mut(child).parent = Some(parent);
        if self.root == Some(child) {
            self.root = self.top_of(parent);
        }
    }

    fn top_of(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.ancestors(index).last().or(Some(index))
    }

    /// Places `new_parent` where `node` is and makes `node` its last child.
    pub fn insert_as_parent(&mut self, node: NodeIndex, new_parent: NodeIndex) {
        self.remove_from_parent(new_parent);
        match self.node(node).parent {
            Some(parent) => {
                let position = self.position_in_parent(parent, node);
                self.node_mut(parent).children[position] = new_parent;
                self.node_mut(new_parent).parent = Some(parent);
            }
            None => {
                if self.root == Some(node) {
                    self.root = Some(new_parent);
                }
            }
        }
        self.node_mut(node).parent = None;
        self.node_mut(new_parent).children.push(node);
        self.node_mut(node).parent = Some(new_parent);
    }

    fn position_in_parent(&self, parent: NodeIndex, child: NodeIndex) -> usize {
        self.node(parent)
            .children
            .iter()
            .position(|c| *c == child)
            .unwrap_or_else(|| panic!("node {} is not a child of {}", child, parent))
    }

    /// Detaches `node` from its parent, keeping its own subtree. Returns the former parent.
    pub fn remove_from_parent(&mut self, node: NodeIndex) -> Option<NodeIndex> {
        let parent = self.node(node).parent?;
        let position = self.position_in_parent(parent, node);
        self.node_mut(parent).children.remove(position);
        self.node_mut(node).parent = None;
        Some(parent)
    }

    /// Replaces `old` in its parent (or as root) with `new`. `old` is left detached.
    pub fn replace_child(&mut self, old: NodeIndex, new: NodeIndex) {
        self.remove_from_parent(new);
        match self.node(old).parent {
            Some(parent) => {
                let position = self.position_in_parent(parent, old);
                self.node_mut(parent).children[position] = new;
                self.node_mut(new).parent = Some(parent);
                self.node_mut(old).parent = None;
            }
            None => {
                if self.root == Some(old) {
                    self.root = Some(new);
                }
            }
        }
    }

    /// Removes `node` from the tree, putting its children in its place.
    ///
    /// If `node` is the root, its first child becomes the root.
    pub fn extract_from_parent(&mut self, node: NodeIndex) {
        let children = std::mem::take(&mut self.node_mut(node).children);
        let parent = self.node(node).parent;
        match parent {
            Some(parent) => {
                let position = self.position_in_parent(parent, node);
                let siblings = &mut self.node_mut(parent).children;
                siblings.splice(position..=position, children.iter().copied());
                for child in &children {
                    self.node_mut(*child).parent = Some(parent);
                }
            }
            None => {
                for child in &children {
                    self.node_mut(*child).parent = None;
                }
                if self.root == Some(node) {
                    self.root = children.first().copied();
                }
            }
        }
        self.nodes[node.0] = None;
    }

    /// Removes `node` and everything below it.
    pub fn remove_subtree(&mut self, node: NodeIndex) {
        self.remove_from_parent(node);
        for index in self.find_all_at_or_below(node, None) {
            self.nodes[index.0] = None;
        }
        if self.root == Some(node) {
            self.root = None;
        }
    }

    /// Copies the whole of `other` into this arena and returns the index of the copied root.
    ///
    /// The copy is detached; use [`add_last_child`](Self::add_last_child) or similar to place it.
    pub fn graft(&mut self, other: &PlanTree) -> Option<NodeIndex> {
        let root = other.root?;
        Some(self.graft_node(other, root, None))
    }

    fn graft_node(&mut self, other: &PlanTree, index: NodeIndex, parent: Option<NodeIndex>) -> NodeIndex {
        let source = other.node(index);
        let copy = NodeIndex(self.nodes.len());
        let mut node = source.clone();
        node.parent = parent;
        node.children = Vec::new();
        self.nodes.push(Some(node));
        for child in &source.children {
            let child_copy = self.graft_node(other, *child, Some(copy));
            self.node_mut(copy).children.push(child_copy);
        }
        copy
    }

    /// Returns the nodes at or below `index` in pre-order, optionally only those of some types.
    ///
    /// # Arguments
    ///
    /// * `index` - Node to start from.
    /// * `types` - Types to keep, or `None` for every node.
    pub fn find_all_at_or_below(&self, index: NodeIndex, types: Option<&[NodeType]>) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            let node = self.node(current);
            if types.map_or(true, |types| types.contains(&node.node_type)) {
                result.push(current);
            }
            stack.extend(node.children.iter().rev());
        }
        result
    }

    /// Returns every node of one type at or below the root.
    pub fn find_all(&self, node_type: NodeType) -> Vec<NodeIndex> {
        match self.root {
            Some(root) => self.find_all_at_or_below(root, Some(&[node_type])),
            None => Vec::new(),
        }
    }

    /// Returns the first node of a type at or below `index`, in pre-order.
    pub fn find_at_or_below(&self, index: NodeIndex, node_type: NodeType) -> Option<NodeIndex> {
        self.find_all_at_or_below(index, Some(&[node_type]))
            .into_iter()
            .next()
    }

    /// Iterates over the ancestors of `index`, nearest first.
    pub fn ancestors(&self, index: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.node(index).parent,
        }
    }

    /// True if `ancestor` is a proper ancestor of `node`.
    pub fn is_below(&self, node: NodeIndex, ancestor: NodeIndex) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Returns the union of the selectors of the SOURCE nodes at or below `index`.
    pub fn source_selectors(&self, index: NodeIndex) -> BTreeSet<SelectorName> {
        self.find_all_at_or_below(index, Some(&[NodeType::Source]))
            .into_iter()
            .flat_map(|s| self.node(s).selectors.iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Recomputes the selectors of every node at or below `index`.
    ///
    /// A childless SOURCE sees its own selector; every other node sees the union of what
    /// its children see.
    pub fn recompute_selectors(&mut self, index: NodeIndex) -> BTreeSet<SelectorName> {
        let children = self.node(index).children.clone();
        let selectors = if children.is_empty() {
            let node = self.node(index);
            match (node.node_type, node.selector_name()) {
                (NodeType::Source, Some(name)) => {
                    let mut own = BTreeSet::new();
                    own.insert(name.clone());
                    own
                }
                _ => node.selectors.clone(),
            }
        } else {
            let mut union = BTreeSet::new();
            for child in children {
                union.extend(self.recompute_selectors(child));
            }
            union
        };
        self.node_mut(index).selectors = selectors.clone();
        selectors
    }

    /// Renders the subtree at `index`, one node per line, indented by depth.
    pub fn render(&self, index: NodeIndex) -> String {
        let mut out = String::new();
        self.render_node(index, 0, &mut out);
        out
    }

    fn render_node(&self, index: NodeIndex, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.node(index).to_string());
        out.push('\n');
        for child in &self.node(index).children {
            self.render_node(*child, depth + 1, out);
        }
    }

    /// Serializes the plan as json.
    pub fn to_json(&self) -> serde_json::Value {
        let mut node_map = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(node) = node {
                node_map.insert(i.to_string(), node);
            }
        }
        json!({"nodes": node_map,
               "root": self.root.map(|i| i.to_string())})
    }

    fn map_arbor_err<T>(result: serde_json::Result<T>, err: ArborError) -> Result<T, ArborError> {
        match result {
            Ok(res) => Ok(res),
            _ => Err(err),
        }
    }

    /// De-serializes a json representation of the plan created in to_json.
    pub fn from_json(json: &str) -> Result<Self, ArborError> {
        let malformed_err = ArborError::ParseError(String::from("Malformatted plan json"));
        let v: Value = PlanTree::map_arbor_err(serde_json::from_str(json), malformed_err.clone())?;
        let nodes: HashMap<String, PlanNode> = PlanTree::map_arbor_err(
            serde_json::from_value(v["nodes"].clone()),
            malformed_err.clone(),
        )?;
        let root: Option<String> = PlanTree::map_arbor_err(
            serde_json::from_value(v["root"].clone()),
            malformed_err.clone(),
        )?;
        let mut plan = PlanTree::new();
        for (i, node) in nodes {
            let i: usize = i.parse().map_err(|_| malformed_err.clone())?;
            if plan.nodes.len() <= i {
                plan.nodes.resize(i + 1, None);
            }
            plan.nodes[i] = Some(node);
        }
        for node in plan.nodes.iter().flatten() {
            let linked = node.children.iter().chain(node.parent.iter());
            for index in linked {
                if !matches!(plan.nodes.get(index.0), Some(Some(_))) {
                    return Err(malformed_err);
                }
            }
        }
        if let Some(i) = root {
            let i: usize = i.parse().map_err(|_| malformed_err.clone())?;
            if !plan.contains(NodeIndex(i)) {
                return Err(malformed_err);
            }
            plan.root = Some(NodeIndex(i));
        }
        Ok(plan)
    }
}

impl fmt::Display for PlanTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => write!(f, "{}", self.render(root)),
            None => write!(f, "<empty plan>"),
        }
    }
}

/// Iterator over the ancestors of a node, nearest first.
///
/// Combine with `take_while` to stop at a boundary such as a JOIN.
pub struct Ancestors<'a> {
    tree: &'a PlanTree,
    next: Option<NodeIndex>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}
