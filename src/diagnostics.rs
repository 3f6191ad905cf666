//! Diagnostic collection and rendering.
//!
//! Grounded in the teacher's `context::{Severity, TokenError}` pair: a small, `Display`-able
//! error value carried alongside a line number, plus a `colored`-based rendering step. This
//! module generalizes that into a `Reporter` that *collects* diagnostics instead of bailing on
//! the first one, since the declaration analyser's propagation rule (spec §7) requires surfacing
//! every independent root cause in a single pass rather than stopping at the first error.

use std::fmt;

use colored::Colorize as _;

use crate::lexer::Span;

/// The severity of a diagnostic. Errors halt nothing by themselves; it's the caller's job to
/// check `Reporter::error_count` and decide whether to keep going (e.g. a driver exits non-zero,
/// but an aggregate's layout analysis keeps inspecting the remaining members regardless).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	/// A hard error. The offending declaration or sub-node is poisoned.
	Error,
	/// A warning. Does not poison anything; purely informational.
	Warning,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error => write!(f, "{}", "error".red().bold()),
			Self::Warning => write!(f, "{}", "warning".yellow().bold()),
		}
	}
}

/// A single diagnostic: a span, a severity, a primary message, and zero or more trailing notes.
///
/// The `notes` field is how this crate satisfies the "duplicate-name and repeated-attribute
/// errors emit two spans" rule from spec §7: the primary `span`/`message` point at the new
/// occurrence, and a note points back at the prior declaration.
#[derive(Debug, Clone)]
pub struct Diagnostic {
	/// Where the diagnostic is anchored.
	pub span: Span,
	/// Error or warning.
	pub severity: Severity,
	/// The primary human-readable message.
	pub message: String,
	/// Secondary `(span, message)` notes, e.g. "previous declaration was here".
	pub notes: Vec<(Span, String)>,
}

impl Diagnostic {
	/// Creates a new error diagnostic with no notes.
	#[must_use]
	pub fn error(span: Span, message: impl Into<String>) -> Self {
		Self {
			span,
			severity: Severity::Error,
			message: message.into(),
			notes: Vec::new(),
		}
	}

	/// Creates a new warning diagnostic with no notes.
	#[must_use]
	pub fn warning(span: Span, message: impl Into<String>) -> Self {
		Self {
			span,
			severity: Severity::Warning,
			message: message.into(),
			notes: Vec::new(),
		}
	}

	/// Attaches a secondary note pointing at another span (e.g. a prior declaration).
	#[must_use]
	pub fn with_note(mut self, span: Span, message: impl Into<String>) -> Self {
		self.notes.push((span, message.into()));
		self
	}
}

/// Collects diagnostics emitted during parsing and analysis, and renders them against a source
/// string on demand. Exactly one `Reporter` is expected to live for the duration of a
/// `CompilationSession` (see `crate::session`).
#[derive(Debug, Default)]
pub struct Reporter {
	diagnostics: Vec<Diagnostic>,
}

impl Reporter {
	/// Creates an empty reporter.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a diagnostic.
	pub fn emit(&mut self, diagnostic: Diagnostic) {
		self.diagnostics.push(diagnostic);
	}

	/// Shorthand for `emit(Diagnostic::error(span, message))`.
	pub fn error(&mut self, span: Span, message: impl Into<String>) {
		self.emit(Diagnostic::error(span, message));
	}

	/// The number of error-severity diagnostics emitted so far.
	#[must_use]
	pub fn error_count(&self) -> usize {
		self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
	}

	/// All diagnostics emitted so far, in emission order.
	#[must_use]
	pub fn diagnostics(&self) -> &[Diagnostic] {
		&self.diagnostics
	}

	/// Renders every collected diagnostic against `source`, one per line, with a colored
	/// one-line snippet of the offending source the way the teacher's `ColoredCabin` machinery
	/// prints error context.
	#[must_use]
	pub fn render(&self, source: &str) -> String {
		let lines: Vec<&str> = source.lines().collect();
		let mut out = String::new();
		for diagnostic in &self.diagnostics {
			out.push_str(&format!("{}:{}:{}: {}\n", diagnostic.span.line, diagnostic.span.column, diagnostic.severity, diagnostic.message));
			if let Some(line) = lines.get(diagnostic.span.line.saturating_sub(1)) {
				out.push_str(&format!("    {}\n", line.dimmed()));
			}
			for (note_span, note_message) in &diagnostic.notes {
				out.push_str(&format!("  {} {}:{}: {}\n", "note:".blue().bold(), note_span.line, note_span.column, note_message));
			}
		}
		out
	}
}
