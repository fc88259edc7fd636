//! Criterion: the leaf is a method declaration with a given signature.

use std::fmt;

use super::{Criterion, CriterionError, CriterionKind, UnitContext};
use crate::syntax::{NodeKind, SyntaxPath};

/// Decides whether the leaf of a method path matches a target signature.
///
/// [`ReceiverCriterion`](super::ReceiverCriterion) delegates to this seam.
pub trait SignatureCriterion: fmt::Display + Send + Sync {
    fn is_satisfied_by(&self, method_path: &SyntaxPath<'_>) -> bool;
}

/// Matches `name(params)` against a method's simple name and parameter descriptors.
///
/// Constructors use the name `<init>`. A return descriptor after `)` is
/// accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignatureCriterion {
    signature: String,
    name: String,
    parameters: String,
}

impl MethodSignatureCriterion {
    pub fn parse(signature: &str) -> Result<Self, CriterionError> {
        let invalid = |reason: &str| CriterionError::InvalidSignature {
            signature: signature.to_string(),
            reason: reason.to_string(),
        };
        let open = signature.find('(').ok_or_else(|| invalid("missing '('"))?;
        let close = signature.find(')').ok_or_else(|| invalid("missing ')'"))?;
        if close < open {
            return Err(invalid("')' before '('"));
        }
        let name = &signature[..open];
        if name.is_empty() {
            return Err(invalid("missing method name"));
        }
        Ok(MethodSignatureCriterion {
            signature: signature.to_string(),
            name: name.to_string(),
            parameters: signature[open + 1..close].to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concatenated parameter descriptors.
    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    fn matches_leaf(&self, path: &SyntaxPath<'_>) -> bool {
        match &path.leaf().kind {
            NodeKind::Method {
                name, parameters, ..
            } => *name == self.name && parameters.concat() == self.parameters,
            _ => false,
        }
    }
}

impl SignatureCriterion for MethodSignatureCriterion {
    fn is_satisfied_by(&self, method_path: &SyntaxPath<'_>) -> bool {
        self.matches_leaf(method_path)
    }
}

impl Criterion for MethodSignatureCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::SigMethod
    }

    fn is_satisfied_by(&self, path: Option<&SyntaxPath<'_>>, _cx: &UnitContext<'_>) -> bool {
        path.is_some_and(|p| self.matches_leaf(p))
    }
}

impl fmt::Display for MethodSignatureCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "is sig method '{}'", self.signature)
    }
}
