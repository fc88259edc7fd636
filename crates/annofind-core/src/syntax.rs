//! Syntax tree model and root-to-leaf paths.
//!
//! The parser is not part of annofind. This module defines the contract it
//! hands over: an arena of [`Node`]s rooted at a single compilation unit, and
//! [`SyntaxPath`]s from that root down to a candidate node.
//!
//! # Derived Data
//!
//! Two pieces of node data are wired by [`SyntaxTree::push`] rather than
//! supplied by the caller:
//!
//! - A class-like declaration pushed directly under an object-construction
//!   expression (`new_class`) becomes that expression's inline class body.
//! - A `variable` with `receiver: true` pushed directly under a `method`
//!   becomes that method's declared receiver parameter.
//!
//! # Document Form
//!
//! [`TreeSpec`] is the nested JSON form of a tree. Node ids are assigned in
//! pre-order, so the root is always `0`:
//!
//! ```
//! use annofind_core::syntax::{SyntaxTree, TreeSpec};
//!
//! let spec: TreeSpec = serde_json::from_str(r#"{
//!     "kind": "compilation_unit", "package": "a.b",
//!     "children": [{ "kind": "class", "name": "Outer" }]
//! }"#).unwrap();
//! let tree = SyntaxTree::from_spec(&spec).unwrap();
//! assert_eq!(tree.len(), 2);
//! ```

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while building a tree or a path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyntaxError {
    /// The tree root is not a compilation unit.
    #[error("tree root must be a compilation unit, found {found}")]
    RootNotCompilationUnit { found: &'static str },

    /// A compilation unit was pushed below the root.
    #[error("compilation unit cannot be nested under node {parent}")]
    NestedCompilationUnit { parent: NodeId },

    /// The parent id does not name a node of this tree.
    #[error("unknown parent node {parent}")]
    UnknownParent { parent: NodeId },

    /// An object-construction expression received a second class body.
    #[error("object construction {new_class} already has an inline class body")]
    DuplicateClassBody { new_class: NodeId },

    /// A method received a second receiver parameter.
    #[error("method {method} already declares a receiver parameter")]
    DuplicateReceiver { method: NodeId },

    /// A receiver parameter was pushed under something other than a method.
    #[error("receiver parameter must be declared directly under a method, not under {parent}")]
    ReceiverOutsideMethod { parent: NodeId },

    /// A path was empty.
    #[error("syntax path is empty")]
    EmptyPath,

    /// A path does not follow parent links from the root.
    #[error("syntax path is broken at depth {depth} (node {node})")]
    BrokenPath { depth: usize, node: NodeId },
}

/// Result type for tree construction.
pub type SyntaxResult<T> = Result<T, SyntaxError>;

// ============================================================================
// Node Types
// ============================================================================

/// Arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Which kind of class-like declaration a `class` node is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassFlavor {
    #[default]
    Class,
    Interface,
    Enum,
    AnnotationType,
}

/// Kind tag plus kind-specific data of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Compilation root, with its package clause if any.
    CompilationUnit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        package: Option<String>,
    },
    /// Class-like declaration. An empty name marks an anonymous class.
    Class {
        #[serde(default)]
        name: String,
        #[serde(default)]
        flavor: ClassFlavor,
    },
    /// Object-construction expression (`new T(..)`, possibly with a body).
    NewClass {
        #[serde(skip)]
        body: Option<NodeId>,
    },
    /// Method or constructor declaration.
    Method {
        name: String,
        /// Parameter type descriptors in declaration order, e.g. `I`, `Ljava/lang/String;`.
        #[serde(default)]
        parameters: Vec<String>,
        #[serde(skip)]
        receiver: Option<NodeId>,
    },
    /// Variable or parameter declaration.
    Variable {
        name: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        receiver: bool,
    },
    /// Block statement.
    Block,
    /// Anything else the parser reports.
    Other {
        #[serde(default)]
        label: String,
    },
}

impl NodeKind {
    /// Compilation unit with an optional package clause.
    pub fn compilation_unit(package: Option<&str>) -> Self {
        NodeKind::CompilationUnit {
            package: package.map(str::to_string),
        }
    }

    /// Named class declaration.
    pub fn class(name: impl Into<String>) -> Self {
        NodeKind::Class {
            name: name.into(),
            flavor: ClassFlavor::Class,
        }
    }

    /// Class-like declaration of the given flavor.
    pub fn class_of(flavor: ClassFlavor, name: impl Into<String>) -> Self {
        NodeKind::Class {
            name: name.into(),
            flavor,
        }
    }

    /// Class declaration without a simple name.
    pub fn anonymous_class() -> Self {
        Self::class("")
    }

    /// Object-construction expression; its body is attached by pushing a class under it.
    pub fn new_class() -> Self {
        NodeKind::NewClass { body: None }
    }

    /// Method declaration with parameter descriptors.
    pub fn method(name: impl Into<String>, parameters: &[&str]) -> Self {
        NodeKind::Method {
            name: name.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            receiver: None,
        }
    }

    /// Ordinary variable or parameter declaration.
    pub fn variable(name: impl Into<String>) -> Self {
        NodeKind::Variable {
            name: name.into(),
            receiver: false,
        }
    }

    /// Receiver parameter declaration (`Outer this`).
    pub fn receiver_parameter() -> Self {
        NodeKind::Variable {
            name: "this".to_string(),
            receiver: true,
        }
    }

    /// Short tag used in diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::CompilationUnit { .. } => "compilation_unit",
            NodeKind::Class { .. } => "class",
            NodeKind::NewClass { .. } => "new_class",
            NodeKind::Method { .. } => "method",
            NodeKind::Variable { .. } => "variable",
            NodeKind::Block => "block",
            NodeKind::Other { .. } => "other",
        }
    }

    /// Returns true for class, interface, enum and annotation-type declarations.
    pub fn is_class_like(&self) -> bool {
        matches!(self, NodeKind::Class { .. })
    }

    pub fn is_new_class(&self) -> bool {
        matches!(self, NodeKind::NewClass { .. })
    }

    pub fn is_method(&self) -> bool {
        matches!(self, NodeKind::Method { .. })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, NodeKind::Variable { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block)
    }

    /// Simple name of a class, method or variable.
    pub fn simple_name(&self) -> Option<&str> {
        match self {
            NodeKind::Class { name, .. }
            | NodeKind::Method { name, .. }
            | NodeKind::Variable { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Clears data that only [`SyntaxTree::push`] may set.
    fn detached(mut self) -> Self {
        match &mut self {
            NodeKind::NewClass { body } => *body = None,
            NodeKind::Method { receiver, .. } => *receiver = None,
            _ => {}
        }
        self
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::CompilationUnit { package: Some(p) } => write!(f, "compilation unit {p}"),
            NodeKind::CompilationUnit { package: None } => write!(f, "compilation unit"),
            NodeKind::Class { name, .. } if name.is_empty() => write!(f, "anonymous class"),
            NodeKind::Class { name, .. } => write!(f, "class {name}"),
            NodeKind::NewClass { body: Some(_) } => write!(f, "new (with body)"),
            NodeKind::NewClass { body: None } => write!(f, "new"),
            NodeKind::Method { name, parameters, .. } => {
                write!(f, "method {}({})", name, parameters.concat())
            }
            NodeKind::Variable { name, .. } => write!(f, "variable {name}"),
            NodeKind::Block => write!(f, "block"),
            NodeKind::Other { label } => write!(f, "other {label}"),
        }
    }
}

/// A node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    /// Declared package of a compilation unit; an empty package clause counts as none.
    pub fn package(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::CompilationUnit { package } => {
                package.as_deref().filter(|p| !p.is_empty())
            }
            _ => None,
        }
    }

    /// Inline class body of an object-construction expression.
    pub fn class_body(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::NewClass { body } => *body,
            _ => None,
        }
    }

    /// Declared receiver parameter of a method.
    pub fn receiver_parameter(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Method { receiver, .. } => *receiver,
            _ => None,
        }
    }
}

// ============================================================================
// SyntaxTree
// ============================================================================

/// Arena syntax tree with a single compilation-unit root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl SyntaxTree {
    /// Create a tree holding only a compilation unit.
    pub fn new(package: Option<&str>) -> Self {
        SyntaxTree {
            nodes: vec![Node {
                id: NodeId(0),
                parent: None,
                children: Vec::new(),
                kind: NodeKind::compilation_unit(package),
            }],
        }
    }

    /// Create a tree from an explicit root kind, which must be a compilation unit.
    pub fn with_root(kind: NodeKind) -> SyntaxResult<Self> {
        if !matches!(kind, NodeKind::CompilationUnit { .. }) {
            return Err(SyntaxError::RootNotCompilationUnit { found: kind.tag() });
        }
        Ok(SyntaxTree {
            nodes: vec![Node {
                id: NodeId(0),
                parent: None,
                children: Vec::new(),
                kind,
            }],
        })
    }

    /// Build a tree from its nested document form, assigning ids in pre-order.
    pub fn from_spec(spec: &TreeSpec) -> SyntaxResult<Self> {
        let mut tree = SyntaxTree::with_root(spec.kind.clone())?;
        let root = tree.root();
        tree.push_specs(root, &spec.children)?;
        Ok(tree)
    }

    fn push_specs(&mut self, parent: NodeId, specs: &[TreeSpec]) -> SyntaxResult<()> {
        for spec in specs {
            let id = self.push(parent, spec.kind.clone())?;
            self.push_specs(id, &spec.children)?;
        }
        Ok(())
    }

    /// Id of the compilation unit.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Append a child under `parent` and return its id.
    ///
    /// Wires the inline class body of `new_class` parents and the declared
    /// receiver of `method` parents (see the module docs).
    pub fn push(&mut self, parent: NodeId, kind: NodeKind) -> SyntaxResult<NodeId> {
        let kind = kind.detached();
        let parent_kind = &self
            .nodes
            .get(parent.index())
            .ok_or(SyntaxError::UnknownParent { parent })?
            .kind;

        let is_receiver = matches!(kind, NodeKind::Variable { receiver: true, .. });
        match (&kind, parent_kind) {
            (NodeKind::CompilationUnit { .. }, _) => {
                return Err(SyntaxError::NestedCompilationUnit { parent });
            }
            (NodeKind::Class { .. }, NodeKind::NewClass { body: Some(_) }) => {
                return Err(SyntaxError::DuplicateClassBody { new_class: parent });
            }
            (_, NodeKind::Method { receiver: Some(_), .. }) if is_receiver => {
                return Err(SyntaxError::DuplicateReceiver { method: parent });
            }
            (_, NodeKind::Method { .. }) => {}
            _ if is_receiver => return Err(SyntaxError::ReceiverOutsideMethod { parent }),
            _ => {}
        }

        let id = NodeId(self.nodes.len() as u32);
        let is_class = kind.is_class_like();
        let parent_node = &mut self.nodes[parent.index()];
        match &mut parent_node.kind {
            NodeKind::NewClass { body } if is_class => *body = Some(id),
            NodeKind::Method { receiver, .. } if is_receiver => *receiver = Some(id),
            _ => {}
        }
        parent_node.children.push(id);
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        Ok(id)
    }

    /// Node ids in pre-order (declaration order).
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self[id].children.iter().rev().copied());
        }
        order
    }

    /// Path from the root to `leaf`, or `None` for an unknown id.
    pub fn path_to(&self, leaf: NodeId) -> Option<SyntaxPath<'_>> {
        SyntaxPath::to_node(self, leaf)
    }
}

impl Index<NodeId> for SyntaxTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

/// Nested document form of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSpec {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSpec>,
}

impl TreeSpec {
    pub fn new(kind: NodeKind) -> Self {
        TreeSpec {
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<TreeSpec>) -> Self {
        self.children = children;
        self
    }
}

// ============================================================================
// SyntaxPath
// ============================================================================

/// Root-to-leaf sequence of nodes of one tree.
///
/// A path is never empty. It borrows the tree, so it stays valid (and
/// immutable) for the duration of a query.
#[derive(Debug, Clone)]
pub struct SyntaxPath<'t> {
    tree: &'t SyntaxTree,
    ids: Vec<NodeId>,
}

impl<'t> SyntaxPath<'t> {
    /// Build the path to `leaf` by following parent links.
    pub fn to_node(tree: &'t SyntaxTree, leaf: NodeId) -> Option<Self> {
        let mut ids = Vec::new();
        let mut current = Some(tree.node(leaf)?.id);
        while let Some(id) = current {
            ids.push(id);
            current = tree[id].parent;
        }
        ids.reverse();
        Some(SyntaxPath { tree, ids })
    }

    /// Build a path from explicit root-first ids, checking every parent link.
    pub fn from_ids(tree: &'t SyntaxTree, ids: Vec<NodeId>) -> SyntaxResult<Self> {
        let first = *ids.first().ok_or(SyntaxError::EmptyPath)?;
        if first != tree.root() {
            return Err(SyntaxError::BrokenPath {
                depth: 0,
                node: first,
            });
        }
        for (depth, pair) in ids.windows(2).enumerate() {
            let linked = tree.node(pair[1]).and_then(|n| n.parent) == Some(pair[0]);
            if !linked {
                return Err(SyntaxError::BrokenPath {
                    depth: depth + 1,
                    node: pair[1],
                });
            }
        }
        Ok(SyntaxPath { tree, ids })
    }

    /// The tree this path points into.
    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// Number of nodes on the path.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false: paths hold at least the root.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Root-first node ids.
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    /// Node at `depth` (0 is the root).
    pub fn node(&self, depth: usize) -> &'t Node {
        &self.tree[self.ids[depth]]
    }

    pub fn leaf(&self) -> &'t Node {
        self.node(self.ids.len() - 1)
    }

    pub fn leaf_id(&self) -> NodeId {
        self.ids[self.ids.len() - 1]
    }

    /// Root-first iterator over the nodes.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &'t Node> + ExactSizeIterator + '_ {
        let tree = self.tree;
        self.ids.iter().map(move |id| &tree[*id])
    }

    /// The first `len` nodes of this path, i.e. the path to an ancestor.
    pub fn prefix(&self, len: usize) -> Option<SyntaxPath<'t>> {
        if len == 0 || len > self.ids.len() {
            return None;
        }
        Some(SyntaxPath {
            tree: self.tree,
            ids: self.ids[..len].to_vec(),
        })
    }

    /// Path to the leaf's parent.
    pub fn parent_path(&self) -> Option<SyntaxPath<'t>> {
        self.prefix(self.ids.len() - 1)
    }
}

impl fmt::Display for SyntaxPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            write!(f, "{}", node.kind)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
