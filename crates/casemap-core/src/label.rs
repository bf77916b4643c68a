//! Case identifiers and label decoration.
//!
//! A test case is recognised by a bracketed label such as `[TC-001]` in a
//! node's canonical text. Nodes without a label are structural and are never
//! decorated.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::status::Status;

static CASE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Z0-9-]+)\]").expect("case label regex is valid"));

/// Identifier of a test case within one version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    /// Wrap an identifier. No validation is applied; keys read back from a
    /// status file are taken as-is.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Extract the case identifier from a node's canonical text.
///
/// Only the first bracketed label counts. Must be given canonical text, never
/// a decorated label.
#[must_use]
pub fn extract_case_id(canonical: &str) -> Option<CaseId> {
    CASE_LABEL
        .captures(canonical)
        .and_then(|caps| caps.get(1))
        .map(|m| CaseId::new(m.as_str()))
}

/// Build the visible label for a decorated node.
///
/// Always rebuilt from canonical text so repeated decoration cannot stack
/// glyphs.
#[must_use]
pub fn decorate(status: Status, canonical: &str) -> String {
    format!("{} {canonical}", status.glyph())
}
