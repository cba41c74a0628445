//! Reported (non-fatal) problems surfaced to the operator.

use std::fmt;

use tracing::{debug, warn};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Output was produced, but in a degraded form.
    Warning,
    /// The affected operation was skipped.
    Error,
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    /// No transform is registered for a request or response content type.
    UnsupportedContentType,
    /// The operation can't be turned into a request descriptor.
    MalformedOperation,
    /// Two artifacts would claim the same identifier or path.
    IdentifierCollision,
    /// An explicit operationId was used more than once and got renamed.
    DuplicateOperationId,
    /// A schema construct compiled to an unconstrained type.
    DegradedSchema,
}

/// A reported problem, tied to an operation or schema when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Category.
    pub kind: DiagnosticKind,
    /// Operation id or schema name the problem belongs to.
    pub subject: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// An error diagnostic: the subject is skipped.
    pub fn error(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            subject: Some(subject.into()),
            message: message.into(),
        }
    }

    /// A warning diagnostic: output was degraded but produced.
    pub fn warning(
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            subject: Some(subject.into()),
            message: message.into(),
        }
    }

    /// Whether this diagnostic caused something to be skipped.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Log through `tracing`. Degraded schemas are common and only logged at debug.
    pub fn log(&self, source: &str) {
        match (self.severity, self.kind) {
            (Severity::Warning, DiagnosticKind::DegradedSchema) => {
                debug!(source = %source, subject = ?self.subject, "{}", self.message);
            }
            _ => warn!(source = %source, subject = ?self.subject, kind = ?self.kind, "{}", self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.subject {
            Some(subject) => write!(f, "{level}[{subject}]: {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}
