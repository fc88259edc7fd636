//! Criterion: the leaf is where a method's receiver annotation belongs.
//!
//! A method without a declared receiver parameter is annotated on the
//! method node itself; the inserter synthesizes the parameter. Once the
//! method declares one, annotations go on that parameter (or inside its
//! type), never on the method node, so the same annotation cannot be
//! inserted twice.

use std::fmt;

use tracing::trace;

use super::{
    Criterion, CriterionError, CriterionKind, MethodSignatureCriterion, SignatureCriterion,
    UnitContext,
};
use crate::syntax::{NodeKind, SyntaxPath};

pub struct ReceiverCriterion {
    /// Method name and parameters, without return type.
    method_name: String,
    signature: Box<dyn SignatureCriterion>,
}

impl ReceiverCriterion {
    /// Receiver of the method `name(params)`.
    pub fn new(method_name: &str) -> Result<Self, CriterionError> {
        let signature = MethodSignatureCriterion::parse(method_name)?;
        Ok(Self::with_signature(method_name, signature))
    }

    /// Receiver of a method selected by a custom signature criterion.
    pub fn with_signature(
        method_name: &str,
        signature: impl SignatureCriterion + 'static,
    ) -> Self {
        ReceiverCriterion {
            method_name: method_name.to_string(),
            signature: Box::new(signature),
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    fn matches(&self, path: &SyntaxPath<'_>) -> bool {
        let leaf = path.leaf();
        if let NodeKind::Method { receiver, .. } = &leaf.kind {
            return self.signature.is_satisfied_by(path) && receiver.is_none();
        }

        // Below the method: only the receiver parameter itself may be passed
        // on the way up (e.g. a type argument of the receiver type).
        let mut param = None;
        for depth in (0..path.len()).rev() {
            let node = path.node(depth);
            match &node.kind {
                NodeKind::Method { receiver, .. } => {
                    let Some(param) = param else {
                        trace!(method = %node.id, "receiver: no parameter on path");
                        return false;
                    };
                    if *receiver != Some(param) {
                        trace!(method = %node.id, %param, "receiver: parameter is not the receiver");
                        return false;
                    }
                    return path
                        .prefix(depth + 1)
                        .is_some_and(|method_path| self.signature.is_satisfied_by(&method_path));
                }
                NodeKind::Variable { .. } => {
                    if param.is_some() {
                        trace!(variable = %node.id, "receiver: passed through two parameters");
                        return false;
                    }
                    param = Some(node.id);
                }
                _ => {}
            }
        }
        false
    }
}

impl Criterion for ReceiverCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Receiver
    }

    fn is_satisfied_by(&self, path: Option<&SyntaxPath<'_>>, _cx: &UnitContext<'_>) -> bool {
        path.is_some_and(|p| self.matches(p))
    }
}

impl fmt::Display for ReceiverCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiverCriterion for method: {}", self.method_name)
    }
}

impl fmt::Debug for ReceiverCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverCriterion")
            .field("method_name", &self.method_name)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}
