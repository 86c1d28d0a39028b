//! Diagnostic infrastructure for the semantic analyzer.
//!
//! Provides a `DiagnosticEngine` that accumulates errors, warnings, and notes
//! with source spans. Unlike a driver-facing engine it never prints: the
//! surrounding driver decides when and how to render, using `fmt_diagnostic`.
//!
//! The engine enforces an error budget: once `error_limit` errors have been
//! recorded, reporting methods return `false` ("stop") and callers are
//! expected to wind down, treating subsequent sentinel types and operands as
//! invalid.

use crate::common::source::{SourceManager, Span};

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// An error in the checked translation unit.
    Error,
    /// A warning that does not invalidate the analysis.
    Warning,
    /// A supplementary note attached to a previous error or warning.
    Note,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A single diagnostic message with severity, location, and message text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into(), span: None }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into(), span: None }
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self { severity: Severity::Note, message: message.into(), span: None }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// Collects semantic diagnostics subject to an error budget.
///
/// Checking phases call `error()`/`warning()` as problems are discovered and
/// keep walking; the return value of `error()` says whether the budget still
/// permits continuing. The accumulated list is drained by the caller with
/// `take_diagnostics`.
#[derive(Debug)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    /// Maximum number of errors to record before asking callers to stop.
    /// Zero means unlimited.
    error_limit: usize,
}

impl DiagnosticEngine {
    pub fn new(error_limit: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
            error_limit,
        }
    }

    /// Record an error. Returns `true` while the error budget permits
    /// continuing, `false` once it is exhausted.
    pub fn error(&mut self, span: Span, message: impl Into<String>) -> bool {
        self.error_count += 1;
        if self.error_limit == 0 || self.error_count <= self.error_limit {
            self.diagnostics.push(Diagnostic::error(message).with_span(span));
        }
        self.may_continue()
    }

    /// Record an error with no source position (configuration problems).
    pub fn error_no_span(&mut self, message: impl Into<String>) -> bool {
        self.error_count += 1;
        if self.error_limit == 0 || self.error_count <= self.error_limit {
            self.diagnostics.push(Diagnostic::error(message));
        }
        self.may_continue()
    }

    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.warning_count += 1;
        self.diagnostics.push(Diagnostic::warning(message).with_span(span));
    }

    /// Whether the error budget still permits continuing.
    pub fn may_continue(&self) -> bool {
        self.error_limit == 0 || self.error_count < self.error_limit
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Render one diagnostic as `file:line:col: severity: message`, resolving
    /// the span through `sources` when available.
    pub fn fmt_diagnostic(diag: &Diagnostic, sources: Option<&SourceManager>) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        if let (Some(span), Some(sm)) = (diag.span, sources) {
            let loc = sm.resolve_span(span);
            let _ = write!(out, "{}: ", loc);
        }
        let _ = write!(out, "{}: {}", diag.severity, diag.message);
        out
    }
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new(0)
    }
}
