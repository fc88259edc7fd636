//! Declaration-order ranks of anonymous and local classes.
//!
//! Compiled class names encode anonymous and local classes by their rank
//! among same-category siblings of one enclosing class (`Outer$0`,
//! `Outer$0Local`). The criteria never compute ranks themselves; they ask an
//! [`OrdinalIndex`]. [`ScopeOrdinals`] is the default index, built once per
//! compilation unit:
//!
//! ```text
//! SyntaxTree --ScopeOrdinals::build--> ScopeOrdinals (immutable)
//!                                            |
//!            InClassCriterion ---rank_of-----+
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::syntax::{NodeId, NodeKind, SyntaxPath, SyntaxTree};

/// Declaration-order rank, starting at 0.
pub type Ordinal = u32;

/// Category of a synthetically named class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassCategory {
    /// Class declaration without a simple name.
    Anonymous,
    /// Class declared directly inside a block.
    Local,
}

/// Source of anonymous/local class ranks for one compilation unit.
pub trait OrdinalIndex: Send + Sync {
    /// Rank of `node` among the `category` classes of its enclosing scope.
    ///
    /// `node` is either the class declaration itself or, for anonymous
    /// classes, the object-construction expression owning the body. Returns
    /// `None` when the node is not a class of that category.
    fn rank_of(&self, path: &SyntaxPath<'_>, node: NodeId, category: ClassCategory)
        -> Option<Ordinal>;
}

/// Ranks computed by one pre-order walk over a [`SyntaxTree`].
///
/// The enclosing scope of a class is its nearest class-like ancestor.
/// Anonymous and local classes are numbered independently, each starting
/// at 0 within every scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeOrdinals {
    anonymous: HashMap<NodeId, Ordinal>,
    local: HashMap<NodeId, Ordinal>,
    /// Object-construction expression to its inline body.
    bodies: HashMap<NodeId, NodeId>,
}

impl ScopeOrdinals {
    /// Rank every anonymous and local class of `tree`.
    pub fn build(tree: &SyntaxTree) -> Self {
        let mut ordinals = ScopeOrdinals::default();
        let mut counters: HashMap<(Option<NodeId>, ClassCategory), Ordinal> = HashMap::new();

        for id in tree.preorder() {
            let node = &tree[id];
            if let Some(body) = node.class_body() {
                ordinals.bodies.insert(id, body);
            }
            let NodeKind::Class { name, .. } = &node.kind else {
                continue;
            };
            let parent_is_block = node.parent.is_some_and(|p| tree[p].kind.is_block());
            let category = if parent_is_block {
                ClassCategory::Local
            } else if name.is_empty() {
                ClassCategory::Anonymous
            } else {
                continue;
            };

            let scope = enclosing_class(tree, id);
            let counter = counters.entry((scope, category)).or_insert(0);
            let table = match category {
                ClassCategory::Anonymous => &mut ordinals.anonymous,
                ClassCategory::Local => &mut ordinals.local,
            };
            table.insert(id, *counter);
            *counter += 1;
        }

        debug!(
            anonymous = ordinals.anonymous.len(),
            local = ordinals.local.len(),
            "built scope ordinals"
        );
        ordinals
    }

    /// Number of ranked classes of `category`.
    pub fn count(&self, category: ClassCategory) -> usize {
        match category {
            ClassCategory::Anonymous => self.anonymous.len(),
            ClassCategory::Local => self.local.len(),
        }
    }
}

impl OrdinalIndex for ScopeOrdinals {
    fn rank_of(
        &self,
        _path: &SyntaxPath<'_>,
        node: NodeId,
        category: ClassCategory,
    ) -> Option<Ordinal> {
        match category {
            ClassCategory::Anonymous => {
                let class = self.bodies.get(&node).copied().unwrap_or(node);
                self.anonymous.get(&class).copied()
            }
            ClassCategory::Local => self.local.get(&node).copied(),
        }
    }
}

/// Nearest class-like ancestor of `id`, excluding `id` itself.
fn enclosing_class(tree: &SyntaxTree, id: NodeId) -> Option<NodeId> {
    let mut current = tree[id].parent;
    while let Some(ancestor) = current {
        if tree[ancestor].kind.is_class_like() {
            return Some(ancestor);
        }
        current = tree[ancestor].parent;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(tree: &SyntaxTree, ordinals: &ScopeOrdinals, id: NodeId, c: ClassCategory) -> Option<Ordinal> {
        let path = tree.path_to(id).unwrap();
        ordinals.rank_of(&path, id, c)
    }

    #[test]
    fn anonymous_classes_ranked_per_enclosing_class() {
        let mut tree = SyntaxTree::new(None);
        let outer = tree.push(tree.root(), NodeKind::class("Outer")).unwrap();
        let first_new = tree.push(outer, NodeKind::new_class()).unwrap();
        let first = tree.push(first_new, NodeKind::anonymous_class()).unwrap();
        // Nested inside the first anonymous class: its own scope.
        let nested_new = tree.push(first, NodeKind::new_class()).unwrap();
        let nested = tree.push(nested_new, NodeKind::anonymous_class()).unwrap();
        let second_new = tree.push(outer, NodeKind::new_class()).unwrap();
        let second = tree.push(second_new, NodeKind::anonymous_class()).unwrap();

        let ordinals = ScopeOrdinals::build(&tree);
        assert_eq!(rank(&tree, &ordinals, first, ClassCategory::Anonymous), Some(0));
        assert_eq!(rank(&tree, &ordinals, second, ClassCategory::Anonymous), Some(1));
        assert_eq!(rank(&tree, &ordinals, nested, ClassCategory::Anonymous), Some(0));
        assert_eq!(ordinals.count(ClassCategory::Anonymous), 3);
    }

    #[test]
    fn new_class_resolves_to_its_body() {
        let mut tree = SyntaxTree::new(None);
        let outer = tree.push(tree.root(), NodeKind::class("Outer")).unwrap();
        let plain_new = tree.push(outer, NodeKind::new_class()).unwrap();
        let new_class = tree.push(outer, NodeKind::new_class()).unwrap();
        tree.push(new_class, NodeKind::anonymous_class()).unwrap();

        let ordinals = ScopeOrdinals::build(&tree);
        assert_eq!(rank(&tree, &ordinals, new_class, ClassCategory::Anonymous), Some(0));
        assert_eq!(rank(&tree, &ordinals, plain_new, ClassCategory::Anonymous), None);
    }

    #[test]
    fn local_classes_ranked_separately_from_anonymous() {
        let mut tree = SyntaxTree::new(None);
        let outer = tree.push(tree.root(), NodeKind::class("Outer")).unwrap();
        let method = tree.push(outer, NodeKind::method("m", &[])).unwrap();
        let block = tree.push(method, NodeKind::Block).unwrap();
        let anon_new = tree.push(block, NodeKind::new_class()).unwrap();
        tree.push(anon_new, NodeKind::anonymous_class()).unwrap();
        let local_a = tree.push(block, NodeKind::class("A")).unwrap();
        let local_b = tree.push(block, NodeKind::class("B")).unwrap();

        let ordinals = ScopeOrdinals::build(&tree);
        assert_eq!(rank(&tree, &ordinals, local_a, ClassCategory::Local), Some(0));
        assert_eq!(rank(&tree, &ordinals, local_b, ClassCategory::Local), Some(1));
        assert_eq!(rank(&tree, &ordinals, local_a, ClassCategory::Anonymous), None);
        assert_eq!(rank(&tree, &ordinals, outer, ClassCategory::Local), None);
    }
}
