//! Input documents read by the CLI.

use std::fs;
use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use annofind_core::criteria::CriterionSpec;
use annofind_core::error::AnnofindError;
use annofind_core::syntax::{NodeId, TreeSpec};

/// One locate run: a compilation unit, the criteria to test and,
/// optionally, which nodes to test them on.
///
/// ```json
/// {
///   "tree": {"kind": "compilation_unit", "package": "a.b", "children": [
///     {"kind": "class", "name": "C"}
///   ]},
///   "criteria": [{"kind": "in_class", "class_name": "a.b.C", "exact": true}]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocateRequest {
    pub tree: TreeSpec,
    pub criteria: Vec<CriterionSpec>,
    /// Nodes to evaluate; every node of the tree when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<NodeId>>,
}

/// Read and parse a JSON document, naming it in errors as `document`.
pub fn read_document<T: DeserializeOwned>(path: &Path, document: &str) -> Result<T, AnnofindError> {
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => AnnofindError::file_not_found(path.display().to_string()),
        _ => AnnofindError::from(err),
    })?;
    serde_json::from_str(&text).map_err(|err| AnnofindError::malformed(document, err.to_string()))
}
