//! Location criteria: predicates over syntax paths.
//!
//! A [`Criterion`] answers "does the leaf of this path satisfy me?" for one
//! candidate node. Criteria are pure and read-only: evaluation never mutates
//! the tree or the indexes, so one criterion may be evaluated concurrently
//! from many threads once the per-unit indexes in [`UnitContext`] are built.
//!
//! ## Criteria
//!
//! - [`InClassCriterion`] - the leaf lies inside a class given by its
//!   dot/dollar-delimited binary name
//! - [`ReceiverCriterion`] - the leaf is where a receiver annotation of a
//!   method belongs
//! - [`MethodSignatureCriterion`] - the leaf is a method with a given signature
//!
//! ## Usage
//!
//! ```
//! use annofind_core::criteria::{in_class, Criterion, UnitContext};
//! use annofind_core::ordinal::ScopeOrdinals;
//! use annofind_core::syntax::{NodeKind, SyntaxTree};
//!
//! let mut tree = SyntaxTree::new(Some("a.b"));
//! let class = tree.push(tree.root(), NodeKind::class("C")).unwrap();
//! let ordinals = ScopeOrdinals::build(&tree);
//! let cx = UnitContext::new(&ordinals);
//!
//! let path = tree.path_to(class).unwrap();
//! assert!(in_class("a.b.C", true).is_satisfied_by(Some(&path), &cx));
//! assert!(!in_class("b.C", true).is_satisfied_by(Some(&path), &cx));
//! ```

mod in_class;
mod receiver;
mod signature;

pub use in_class::InClassCriterion;
pub use receiver::ReceiverCriterion;
pub use signature::{MethodSignatureCriterion, SignatureCriterion};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::MethodOffsetIndex;
use crate::ordinal::OrdinalIndex;
use crate::syntax::{NodeId, SyntaxPath};

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while constructing a criterion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CriterionError {
    /// Method signature is not of the form `name(params)`.
    #[error("invalid method signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },

    /// Class name target is empty.
    #[error("class name must not be empty")]
    EmptyClassName,
}

// ============================================================================
// Criterion Trait
// ============================================================================

/// Identifies what a criterion tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    InClass,
    Receiver,
    SigMethod,
}

impl CriterionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionKind::InClass => "in_class",
            CriterionKind::Receiver => "receiver",
            CriterionKind::SigMethod => "sig_method",
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-compilation-unit indexes a criterion may consult.
///
/// Both indexes are built before the first query and never change
/// afterwards.
#[derive(Clone, Copy)]
pub struct UnitContext<'u> {
    ordinals: &'u dyn OrdinalIndex,
    offsets: Option<&'u MethodOffsetIndex>,
}

impl<'u> UnitContext<'u> {
    pub fn new(ordinals: &'u dyn OrdinalIndex) -> Self {
        UnitContext {
            ordinals,
            offsets: None,
        }
    }

    /// Attach the offset index of the class compiled from this unit.
    pub fn with_offsets(mut self, offsets: &'u MethodOffsetIndex) -> Self {
        self.offsets = Some(offsets);
        self
    }

    pub fn ordinals(&self) -> &'u dyn OrdinalIndex {
        self.ordinals
    }

    pub fn offsets(&self) -> Option<&'u MethodOffsetIndex> {
        self.offsets
    }
}

impl fmt::Debug for UnitContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitContext")
            .field("offsets", &self.offsets.is_some())
            .finish_non_exhaustive()
    }
}

/// A predicate over the leaf of a syntax path.
///
/// `Display` renders the human-readable description used in diagnostics.
pub trait Criterion: fmt::Display + Send + Sync {
    fn kind(&self) -> CriterionKind;

    /// Whether the leaf of `path` satisfies this criterion. `None` never does.
    fn is_satisfied_by(&self, path: Option<&SyntaxPath<'_>>, cx: &UnitContext<'_>) -> bool;

    /// Same as [`Criterion::is_satisfied_by`], with the leaf named explicitly.
    ///
    /// `leaf` must be the leaf of `path`.
    fn is_satisfied_by_leaf(
        &self,
        path: Option<&SyntaxPath<'_>>,
        leaf: NodeId,
        cx: &UnitContext<'_>,
    ) -> bool {
        debug_assert!(
            path.is_none_or(|p| p.leaf_id() == leaf),
            "explicit leaf {leaf} is not the leaf of the path"
        );
        self.is_satisfied_by(path, cx)
    }
}

// ============================================================================
// Factories
// ============================================================================

/// Leaf lies inside the class `class_name`.
pub fn in_class(class_name: impl Into<String>, exact: bool) -> InClassCriterion {
    InClassCriterion::new(class_name, exact)
}

/// Leaf is the receiver insertion point of `method`.
pub fn receiver(method: &str) -> Result<ReceiverCriterion, CriterionError> {
    ReceiverCriterion::new(method)
}

/// Leaf is a method declaration with signature `signature`.
pub fn sig_method(signature: &str) -> Result<MethodSignatureCriterion, CriterionError> {
    MethodSignatureCriterion::parse(signature)
}

// ============================================================================
// Criteria (conjunction)
// ============================================================================

/// A set of criteria that must all hold.
#[derive(Default)]
pub struct Criteria {
    criteria: Vec<Box<dyn Criterion>>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, criterion: impl Criterion + 'static) {
        self.criteria.push(Box::new(criterion));
    }

    pub fn add_boxed(&mut self, criterion: Box<dyn Criterion>) {
        self.criteria.push(criterion);
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Whether every criterion holds. An empty set holds for any present path.
    pub fn is_satisfied_by(&self, path: Option<&SyntaxPath<'_>>, cx: &UnitContext<'_>) -> bool {
        path.is_some() && self.criteria.iter().all(|c| c.is_satisfied_by(path, cx))
    }

    /// Whether this set targets a receiver parameter.
    pub fn is_on_receiver(&self) -> bool {
        self.criteria
            .iter()
            .any(|c| c.kind() == CriterionKind::Receiver)
    }

    pub fn kinds(&self) -> Vec<CriterionKind> {
        self.criteria.iter().map(|c| c.kind()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Criterion> {
        self.criteria.iter().map(|c| c.as_ref())
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, criterion) in self.criteria.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{criterion}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Criteria{}", self)
    }
}

// ============================================================================
// CriterionSpec
// ============================================================================

/// Serialized description of a criterion, as found in request documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriterionSpec {
    InClass {
        class_name: String,
        #[serde(default)]
        exact: bool,
    },
    Receiver {
        method: String,
    },
    SigMethod {
        signature: String,
    },
}

impl CriterionSpec {
    /// Build the described criterion.
    pub fn build(&self) -> Result<Box<dyn Criterion>, CriterionError> {
        Ok(match self {
            CriterionSpec::InClass { class_name, exact } => {
                if class_name.is_empty() {
                    return Err(CriterionError::EmptyClassName);
                }
                Box::new(in_class(class_name.clone(), *exact))
            }
            CriterionSpec::Receiver { method } => Box::new(receiver(method)?),
            CriterionSpec::SigMethod { signature } => Box::new(sig_method(signature)?),
        })
    }
}
