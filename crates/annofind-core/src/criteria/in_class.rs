//! Criterion: the leaf lies inside a class given by its binary name.
//!
//! A dollar sign in a target name either was inserted by the compiler for a
//! nested, anonymous or local class, or was written by the programmer (or a
//! bytecode tool). Both readings, and any mix of them, have to be accepted:
//!
//! ```text
//! a.b.Outer            top-level class in package a.b
//! a.b.Outer$Inner      member class (also written a.b.Outer.Inner)
//! a.b.Outer$0          first anonymous class of Outer
//! a.b.Outer$0Local     first local class of Outer, named Local*
//! a.b.Outer$0$1        second anonymous class inside the first one
//! ```
//!
//! Matching consumes the name outermost-first while walking the path from
//! the root. Walking from the leaf instead would accept `a.b.c` for a leaf in
//! `a.b.c.c`.
//!
//! A digit-led segment is always read as compiler-synthesized, so a class
//! that a programmer named `Outer$1x` cannot be told apart from the first
//! local class `x`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::{Criterion, CriterionKind, UnitContext};
use crate::ordinal::{ClassCategory, Ordinal};
use crate::syntax::{Node, NodeKind, SyntaxPath};

/// `<ordinal>` or `<ordinal>$<rest>`.
static ANONYMOUS_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)(\$(.*))?$").expect("valid anonymous-class grammar"));

/// `<ordinal><name-prefix>` or `<ordinal><name-prefix>$<rest>`.
static LOCAL_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)([^$]+)(\$(.*))?$").expect("valid local-class grammar")
});

/// Leaf lies inside the class `class_name`, exactly or at any depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InClassCriterion {
    class_name: String,
    exact: bool,
}

impl InClassCriterion {
    /// `class_name` is a fully-qualified binary name.
    ///
    /// With `exact`, the leaf's innermost enclosing class must be the named
    /// class; otherwise being anywhere inside it is enough.
    pub fn new(class_name: impl Into<String>, exact: bool) -> Self {
        InClassCriterion {
            class_name: class_name.into(),
            exact,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Free-standing form of the criterion.
    pub fn matches(
        path: Option<&SyntaxPath<'_>>,
        cx: &UnitContext<'_>,
        class_name: &str,
        exact: bool,
    ) -> bool {
        let Some(path) = path else {
            return false;
        };
        NameWalk {
            path,
            cx,
            cname: class_name,
            exact,
        }
        .run()
    }
}

/// What the current node requires of the remaining name.
enum Pending {
    None,
    Anonymous,
    Local,
}

/// One left-to-right scan of a path against a class name.
struct NameWalk<'p, 't, 'c, 'n> {
    path: &'p SyntaxPath<'t>,
    cx: &'c UnitContext<'c>,
    /// However much of the class name remains to match.
    cname: &'n str,
    exact: bool,
}

impl<'n> NameWalk<'_, '_, '_, 'n> {
    fn run(mut self) -> bool {
        let path = self.path;
        let mut inside_match = false;

        for (depth, node) in path.nodes().enumerate() {
            let previous = depth.checked_sub(1).map(|d| &path.node(d).kind);
            let mut pending = Pending::None;

            match &node.kind {
                NodeKind::CompilationUnit { .. } => {
                    if let Some(package) = node.package() {
                        match self
                            .cname
                            .strip_prefix(package)
                            .and_then(|rest| rest.strip_prefix('.'))
                        {
                            Some(rest) => self.cname = rest,
                            None => return self.fail(node, "package mismatch"),
                        }
                    }
                }
                NodeKind::Class { name, .. } => {
                    if previous.is_some_and(NodeKind::is_new_class) {
                        // Already handled as the body of the preceding `new`.
                        continue;
                    }
                    if previous.is_some_and(NodeKind::is_block) {
                        pending = Pending::Local;
                    } else if name.is_empty() {
                        pending = Pending::Anonymous;
                    } else if self.cname == name {
                        if !self.exact {
                            trace!(class = %name, "in-class: reached target class");
                            return true;
                        }
                        self.cname = "";
                    } else if let Some(rest) = self
                        .cname
                        .strip_prefix(name.as_str())
                        .and_then(|rest| rest.strip_prefix(['$', '.']))
                    {
                        self.cname = rest;
                    } else {
                        return self.fail(node, "class name mismatch");
                    }
                }
                NodeKind::NewClass { body } => {
                    // The `new` expression itself is in the enclosing class;
                    // only its braces are in the anonymous class.
                    if self.cname.is_empty() {
                        inside_match = true;
                    } else if body.is_some() {
                        pending = Pending::Anonymous;
                    }
                }
                NodeKind::Method { .. } | NodeKind::Variable { .. } => {
                    // No descending into a same-named class nested in the match.
                    if inside_match {
                        return self.fail(node, "member of a class nested in the match");
                    }
                }
                NodeKind::Block | NodeKind::Other { .. } => {}
            }

            let matched = match pending {
                Pending::None => true,
                Pending::Anonymous => self.enter_anonymous(node),
                Pending::Local => self.enter_local(node),
            };
            if !matched {
                return false;
            }
        }

        trace!(remaining = self.cname, leaf = %path.leaf_id(), "in-class: path exhausted");
        self.cname.is_empty()
    }

    fn enter_anonymous(&mut self, node: &Node) -> bool {
        let cname: &'n str = self.cname;
        let Some(caps) = ANONYMOUS_CLASS.captures(cname) else {
            return self.fail(node, "not an anonymous class segment");
        };
        let wanted = parse_ordinal(&caps[1]);
        self.cname = caps.get(3).map_or("", |m| m.as_str());

        let actual = self
            .cx
            .ordinals()
            .rank_of(self.path, node.id, ClassCategory::Anonymous);
        if actual != Some(wanted) {
            trace!(wanted, ?actual, node = %node.id, "in-class: anonymous ordinal mismatch");
            return false;
        }
        true
    }

    fn enter_local(&mut self, node: &Node) -> bool {
        let cname: &'n str = self.cname;
        let Some(caps) = LOCAL_CLASS.captures(cname) else {
            return self.fail(node, "not a local class segment");
        };
        let wanted = parse_ordinal(&caps[1]);
        let prefix = &caps[2];

        let actual = self
            .cx
            .ordinals()
            .rank_of(self.path, node.id, ClassCategory::Local);
        let declared = node.kind.simple_name().unwrap_or_default();
        // Tools may rename local classes, so the name only has to start with the prefix.
        if actual != Some(wanted) || !declared.starts_with(prefix) {
            trace!(
                wanted,
                ?actual,
                prefix,
                declared,
                node = %node.id,
                "in-class: local class mismatch"
            );
            return false;
        }
        self.cname = caps.get(4).map_or("", |m| m.as_str());
        true
    }

    fn fail(&self, node: &Node, reason: &str) -> bool {
        trace!(remaining = self.cname, node = %node.id, kind = %node.kind, reason, "in-class: no match");
        false
    }
}

/// Digits accepted by the grammar always parse, barring overflow.
fn parse_ordinal(digits: &str) -> Ordinal {
    match digits.parse() {
        Ok(ordinal) => ordinal,
        Err(err) => panic!("class-name grammar accepted ordinal '{digits}' that does not parse: {err}"),
    }
}

impl Criterion for InClassCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::InClass
    }

    fn is_satisfied_by(&self, path: Option<&SyntaxPath<'_>>, cx: &UnitContext<'_>) -> bool {
        Self::matches(path, cx, &self.class_name, self.exact)
    }
}

impl fmt::Display for InClassCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In class '{}'", self.class_name)?;
        if self.exact {
            write!(f, " (exactly)")?;
        }
        Ok(())
    }
}
