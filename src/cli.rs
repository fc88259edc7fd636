//! CLI front door.
//!
//! Provides the command implementations behind the `annofind` binary:
//! - `locate` - Evaluate criteria against the nodes of a syntax tree
//! - `offsets` - Build the bytecode offset index of one class
//!
//! ## Error Handling
//!
//! All functions return `Result<T, AnnofindError>`. The caller (typically
//! `main.rs`) renders errors as JSON with a stable exit code.

use tracing::debug;

use annofind_core::bytecode::{ClassEvent, MethodOffsetIndex};
use annofind_core::criteria::{Criteria, CriterionSpec, UnitContext};
use annofind_core::error::AnnofindError;
use annofind_core::ordinal::ScopeOrdinals;
use annofind_core::output::{CriterionMatches, LocateResponse, OffsetsResponse};
use annofind_core::syntax::{NodeId, SyntaxTree};

use crate::request::LocateRequest;

/// Evaluate every criterion of `request` on its candidate nodes.
///
/// Criteria are built before the tree is indexed, so a bad criterion is
/// reported even when the tree is also malformed.
pub fn run_locate(request: &LocateRequest) -> Result<LocateResponse, AnnofindError> {
    let criteria = build_criteria(&request.criteria)?;
    let tree = SyntaxTree::from_spec(&request.tree)?;
    let candidates = match &request.candidates {
        Some(ids) => {
            if let Some(&id) = ids.iter().find(|&&id| tree.node(id).is_none()) {
                return Err(AnnofindError::UnknownNode { id });
            }
            ids.clone()
        }
        None => tree.preorder(),
    };

    let ordinals = ScopeOrdinals::build(&tree);
    let cx = UnitContext::new(&ordinals);

    debug!(
        nodes = tree.len(),
        candidates = candidates.len(),
        criteria = %criteria,
        "evaluating criteria"
    );

    let mut per_criterion: Vec<Vec<NodeId>> = vec![Vec::new(); criteria.len()];
    let mut all = Vec::new();
    for &id in &candidates {
        let path = tree.path_to(id);
        for (matches, criterion) in per_criterion.iter_mut().zip(criteria.iter()) {
            if criterion.is_satisfied_by_leaf(path.as_ref(), id, &cx) {
                matches.push(id);
            }
        }
        if criteria.is_satisfied_by(path.as_ref(), &cx) {
            all.push(id);
        }
    }

    let results = criteria
        .iter()
        .zip(per_criterion)
        .map(|(criterion, matches)| CriterionMatches {
            criterion: criterion.to_string(),
            kind: criterion.kind(),
            matches,
        })
        .collect();
    Ok(LocateResponse::new(candidates.len(), results, all))
}

/// Index the decoder events of one class.
pub fn run_offsets(events: Vec<ClassEvent>) -> Result<OffsetsResponse, AnnofindError> {
    let event_count = events.len();
    let index = MethodOffsetIndex::build(events)?;
    debug!(events = event_count, methods = index.len(), "indexed class");
    Ok(OffsetsResponse::from_index(&index))
}

/// Build the conjunction of `specs`, failing on the first invalid one.
pub fn build_criteria(specs: &[CriterionSpec]) -> Result<Criteria, AnnofindError> {
    let mut criteria = Criteria::new();
    for spec in specs {
        criteria.add_boxed(spec.build()?);
    }
    Ok(criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use annofind_core::criteria::CriterionKind;
    use annofind_core::syntax::{NodeKind, TreeSpec};

    /// `package p; class Outer { void m() { new Object() {}; } }`
    fn request(criteria: Vec<CriterionSpec>) -> LocateRequest {
        let tree = TreeSpec::new(NodeKind::compilation_unit(Some("p"))).with_children(vec![
            TreeSpec::new(NodeKind::class("Outer")).with_children(vec![TreeSpec::new(
                NodeKind::method("m", &[]),
            )
            .with_children(vec![TreeSpec::new(NodeKind::Block).with_children(vec![
                TreeSpec::new(NodeKind::new_class())
                    .with_children(vec![TreeSpec::new(NodeKind::anonymous_class())]),
            ])])]),
        ]);
        LocateRequest {
            tree,
            criteria,
            candidates: None,
        }
    }

    mod locate {
        use super::*;

        #[test]
        fn reports_matches_per_criterion_and_conjunction() {
            let response = run_locate(&request(vec![
                CriterionSpec::InClass {
                    class_name: "p.Outer$0".to_string(),
                    exact: true,
                },
                CriterionSpec::InClass {
                    class_name: "p.Outer".to_string(),
                    exact: false,
                },
            ]))
            .unwrap();

            // Pre-order: 0 unit, 1 Outer, 2 m, 3 block, 4 new, 5 anonymous body.
            assert_eq!(response.candidates, 6);
            assert_eq!(response.criteria[0].kind, CriterionKind::InClass);
            // The `new` expression with a body already counts as inside `$0`.
            assert_eq!(
                response.criteria[0].matches,
                vec![NodeId::new(4), NodeId::new(5)]
            );
            assert_eq!(
                response.criteria[1].matches,
                (1..=5).map(NodeId::new).collect::<Vec<_>>()
            );
            assert_eq!(response.all, vec![NodeId::new(4), NodeId::new(5)]);
        }

        #[test]
        fn candidates_restrict_evaluation() {
            let mut req = request(vec![CriterionSpec::Receiver {
                method: "m()".to_string(),
            }]);
            req.candidates = Some(vec![NodeId::new(2), NodeId::new(1)]);
            let response = run_locate(&req).unwrap();
            assert_eq!(response.candidates, 2);
            assert_eq!(response.criteria[0].matches, vec![NodeId::new(2)]);
        }

        #[test]
        fn unknown_candidate_is_an_error() {
            let mut req = request(vec![]);
            req.candidates = Some(vec![NodeId::new(99)]);
            let err = run_locate(&req).unwrap_err();
            assert!(matches!(err, AnnofindError::UnknownNode { id } if id == NodeId::new(99)));
        }

        #[test]
        fn bad_criterion_is_reported_first() {
            let mut req = request(vec![CriterionSpec::SigMethod {
                signature: "m".to_string(),
            }]);
            req.tree = TreeSpec::new(NodeKind::class("NotAUnit"));
            let err = run_locate(&req).unwrap_err();
            assert!(matches!(err, AnnofindError::InvalidCriterion(_)));
        }
    }

    mod offsets {
        use super::*;

        #[test]
        fn indexes_events() {
            let response = run_offsets(vec![
                ClassEvent::Method {
                    name: "run".to_string(),
                    descriptor: "()V".to_string(),
                },
                ClassEvent::InvokeDynamic {
                    name: "get".to_string(),
                    descriptor: "()Ljava/util/function/Supplier;".to_string(),
                },
            ])
            .unwrap();
            assert_eq!(response.methods.len(), 1);
            assert_eq!(response.methods[0].method, "run()");
        }

        #[test]
        fn overflowing_operand_offset_is_malformed_input() {
            let err = run_offsets(vec![
                ClassEvent::Method {
                    name: "run".to_string(),
                    descriptor: "()V".to_string(),
                },
                ClassEvent::Label { offset: u32::MAX },
                ClassEvent::TypeInsn {
                    opcode: annofind_core::bytecode::opcodes::INSTANCEOF,
                    type_name: "java/lang/String".to_string(),
                },
            ])
            .unwrap_err();
            assert!(matches!(err, AnnofindError::InvalidEvents(_)));
            assert_eq!(err.error_code().code(), 3);
        }
    }
}
