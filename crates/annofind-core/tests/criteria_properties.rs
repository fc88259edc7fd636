//! Cross-module properties of the location criteria.
//!
//! Trees here are built by hand the way a parser front end would report
//! them; ids are assigned in insertion order.

use std::thread;

use annofind_core::bytecode::{opcodes, ClassEvent, InsnCategory, MethodOffsetIndex};
use annofind_core::criteria::{in_class, receiver, Criteria, Criterion, CriterionKind, UnitContext};
use annofind_core::ordinal::{ClassCategory, OrdinalIndex, ScopeOrdinals};
use annofind_core::syntax::{NodeId, NodeKind, SyntaxTree};

// ============================================================================
// Fixtures
// ============================================================================

/// ```java
/// package a.b;
/// class Outer {
///     class Inner { int f; }
///     void m() {
///         new Object() { int g; };
///         new Object() { int h; };
///         class Local { int i; }
///         class LocalRenamed { int j; }
///     }
/// }
/// ```
struct Fixture {
    tree: SyntaxTree,
    outer: NodeId,
    inner_field: NodeId,
    first_anon_field: NodeId,
    second_anon_field: NodeId,
    first_local_field: NodeId,
    second_local_field: NodeId,
}

fn fixture() -> Fixture {
    let mut tree = SyntaxTree::new(Some("a.b"));
    let outer = tree.push(tree.root(), NodeKind::class("Outer")).unwrap();
    let inner = tree.push(outer, NodeKind::class("Inner")).unwrap();
    let inner_field = tree.push(inner, NodeKind::variable("f")).unwrap();
    let m = tree.push(outer, NodeKind::method("m", &[])).unwrap();
    let block = tree.push(m, NodeKind::Block).unwrap();

    let mut anon_fields = Vec::new();
    for field in ["g", "h"] {
        let new_class = tree.push(block, NodeKind::new_class()).unwrap();
        let body = tree.push(new_class, NodeKind::anonymous_class()).unwrap();
        anon_fields.push(tree.push(body, NodeKind::variable(field)).unwrap());
    }
    let mut local_fields = Vec::new();
    for (class, field) in [("Local", "i"), ("LocalRenamed", "j")] {
        let local = tree.push(block, NodeKind::class(class)).unwrap();
        local_fields.push(tree.push(local, NodeKind::variable(field)).unwrap());
    }

    Fixture {
        tree,
        outer,
        inner_field,
        first_anon_field: anon_fields[0],
        second_anon_field: anon_fields[1],
        first_local_field: local_fields[0],
        second_local_field: local_fields[1],
    }
}

fn holds(fx: &Fixture, criterion: &dyn Criterion, leaf: NodeId) -> bool {
    let ordinals = ScopeOrdinals::build(&fx.tree);
    let cx = UnitContext::new(&ordinals);
    let path = fx.tree.path_to(leaf).unwrap();
    criterion.is_satisfied_by_leaf(Some(&path), leaf, &cx)
}

/// Binary name of the innermost class enclosing `leaf`, as a compiler would write it.
fn reconstructed_name(fx: &Fixture, leaf: NodeId) -> String {
    let ordinals = ScopeOrdinals::build(&fx.tree);
    let path = fx.tree.path_to(leaf).unwrap();
    let mut name = String::from("a.b");
    let mut separator = '.';
    for (depth, node) in path.nodes().enumerate() {
        let NodeKind::Class { name: simple, .. } = &node.kind else {
            continue;
        };
        let parent = &path.node(depth - 1).kind;
        name.push(separator);
        if parent.is_new_class() {
            let rank = ordinals.rank_of(&path, node.id, ClassCategory::Anonymous).unwrap();
            name.push_str(&rank.to_string());
        } else if parent.is_block() {
            let rank = ordinals.rank_of(&path, node.id, ClassCategory::Local).unwrap();
            name.push_str(&format!("{rank}{simple}"));
        } else {
            name.push_str(simple);
        }
        separator = '$';
    }
    name
}

// ============================================================================
// Name matching
// ============================================================================

mod names {
    use super::*;

    #[test]
    fn package_prefix_is_order_sensitive() {
        let fx = fixture();
        assert!(holds(&fx, &in_class("a.b.Outer", true), fx.outer));
        assert!(!holds(&fx, &in_class("b.Outer", true), fx.outer));
        assert!(!holds(&fx, &in_class("b.a.Outer", true), fx.outer));
    }

    #[test]
    fn anonymous_ordinals_select_one_class() {
        let fx = fixture();
        let first = in_class("a.b.Outer$0", true);
        let second = in_class("a.b.Outer$1", true);
        assert!(holds(&fx, &first, fx.first_anon_field));
        assert!(!holds(&fx, &first, fx.second_anon_field));
        assert!(holds(&fx, &second, fx.second_anon_field));
        assert!(!holds(&fx, &second, fx.first_anon_field));
    }

    #[test]
    fn local_class_names_match_by_prefix() {
        let fx = fixture();
        assert!(holds(&fx, &in_class("a.b.Outer$0Local", true), fx.first_local_field));
        assert!(holds(&fx, &in_class("a.b.Outer$1Local", true), fx.second_local_field));
        assert!(!holds(&fx, &in_class("a.b.Outer$1Local", true), fx.first_local_field));
        assert!(!holds(&fx, &in_class("a.b.Outer$0Other", true), fx.first_local_field));
    }

    #[test]
    fn non_exact_matches_anywhere_inside() {
        let fx = fixture();
        let anywhere = in_class("a.b.Outer", false);
        for leaf in [
            fx.inner_field,
            fx.first_anon_field,
            fx.second_anon_field,
            fx.first_local_field,
        ] {
            assert!(holds(&fx, &anywhere, leaf), "leaf {leaf}");
        }
        assert!(!holds(&fx, &in_class("a.b.Outer", true), fx.inner_field));
    }

    #[test]
    fn exact_match_agrees_with_reconstructed_name() {
        let fx = fixture();
        let candidates = [
            "a.b.Outer",
            "a.b.Outer$Inner",
            "a.b.Outer$0",
            "a.b.Outer$1",
            "a.b.Outer$0Local",
            "a.b.Outer$1LocalRenamed",
        ];
        for leaf in [
            fx.inner_field,
            fx.first_anon_field,
            fx.second_anon_field,
            fx.first_local_field,
            fx.second_local_field,
        ] {
            let expected = reconstructed_name(&fx, leaf);
            for name in candidates {
                assert_eq!(
                    holds(&fx, &in_class(name, true), leaf),
                    name == expected,
                    "{name} vs reconstructed {expected} at {leaf}"
                );
            }
        }
    }
}

// ============================================================================
// Receiver
// ============================================================================

mod receivers {
    use super::*;

    #[test]
    fn method_and_declared_receiver_are_exclusive() {
        let mut tree = SyntaxTree::new(None);
        let class = tree.push(tree.root(), NodeKind::class("C")).unwrap();
        let bare = tree.push(class, NodeKind::method("bare", &[])).unwrap();
        let declared = tree.push(class, NodeKind::method("declared", &[])).unwrap();
        let this = tree.push(declared, NodeKind::receiver_parameter()).unwrap();
        let ordinals = ScopeOrdinals::build(&tree);
        let cx = UnitContext::new(&ordinals);

        let check = |method: &str, leaf: NodeId| {
            let path = tree.path_to(leaf).unwrap();
            receiver(method).unwrap().is_satisfied_by(Some(&path), &cx)
        };
        assert!(check("bare()", bare));
        assert!(!check("declared()", declared));
        assert!(check("declared()", this));
    }
}

// ============================================================================
// Context and concurrency
// ============================================================================

mod context {
    use super::*;

    #[test]
    fn conjunction_with_offsets_in_context() {
        let fx = fixture();
        let ordinals = ScopeOrdinals::build(&fx.tree);
        let offsets = MethodOffsetIndex::build(vec![
            ClassEvent::Method {
                name: "m".to_string(),
                descriptor: "()V".to_string(),
            },
            ClassEvent::Label { offset: 0 },
            ClassEvent::TypeInsn {
                opcode: opcodes::NEW,
                type_name: "a/b/Outer$0".to_string(),
            },
        ])
        .unwrap();
        let cx = UnitContext::new(&ordinals).with_offsets(&offsets);
        assert_eq!(
            cx.offsets()
                .and_then(|o| o.offset_at("m()", InsnCategory::New, 0)),
            Some(0)
        );

        let mut criteria = Criteria::new();
        criteria.add(in_class("a.b.Outer", false));
        criteria.add(in_class("a.b.Outer$0", true));
        assert_eq!(criteria.kinds(), vec![CriterionKind::InClass; 2]);
        assert!(!criteria.is_on_receiver());

        let path = fx.tree.path_to(fx.first_anon_field).unwrap();
        assert!(criteria.is_satisfied_by(Some(&path), &cx));
        assert!(!criteria.is_satisfied_by(None, &cx));
    }

    #[test]
    fn evaluation_is_shareable_across_threads() {
        let fx = fixture();
        let ordinals = ScopeOrdinals::build(&fx.tree);
        let cx = UnitContext::new(&ordinals);
        let criterion = in_class("a.b.Outer$1", true);
        let leaves: Vec<NodeId> = fx.tree.preorder();

        let sequential: Vec<bool> = leaves
            .iter()
            .map(|&id| criterion.is_satisfied_by(fx.tree.path_to(id).as_ref(), &cx))
            .collect();

        let parallel: Vec<bool> = thread::scope(|s| {
            let handles: Vec<_> = leaves
                .iter()
                .map(|&id| {
                    let (tree, cx, criterion) = (&fx.tree, &cx, &criterion);
                    s.spawn(move || criterion.is_satisfied_by(tree.path_to(id).as_ref(), cx))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(sequential, parallel);
        assert!(parallel.iter().any(|&hit| hit));
    }
}
