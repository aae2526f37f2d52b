//! Outcome records accumulated during a reconciliation run.
//!
//! The engine never logs or formats results on its own; every action taken,
//! skipped or failed becomes one [`Finding`] in the ordered list returned to
//! the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a [`Finding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    /// An action was carried out.
    Success,
    /// An action failed; the run continued.
    Error,
    /// Something needs operator attention (low-confidence anchor,
    /// unmatched port, missing service).
    Warning,
    /// Informational only (e.g. a relationship that already existed).
    Info,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingKind::Success => write!(f, "success"),
            FindingKind::Error => write!(f, "error"),
            FindingKind::Warning => write!(f, "warning"),
            FindingKind::Info => write!(f, "info"),
        }
    }
}

/// One outcome record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Outcome severity.
    pub kind: FindingKind,
    /// The object or concern the record is about, e.g. `"Gi0/0/1 [OpticalPort]"`.
    pub subject: String,
    /// What happened.
    pub message: String,
}

impl Finding {
    pub fn new(kind: FindingKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn success(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FindingKind::Success, subject, message)
    }

    pub fn error(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FindingKind::Error, subject, message)
    }

    pub fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FindingKind::Warning, subject, message)
    }

    pub fn info(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FindingKind::Info, subject, message)
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}
