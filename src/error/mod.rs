//! Error types and diagnostics for streaming parsing.
//!
//! This module provides structured error reporting with source location
//! tracking. Errors carry line, column, and codepoint offset information
//! for precise diagnostics.
//!
//! The parser distinguishes **soft** diagnostics — reported through the
//! `on_error` event and collected into a `Vec<ParseDiagnostic>` while
//! parsing continues — from hard failures such as writing to a closed
//! parser, which are returned as `Err` from the feeding methods.

use std::fmt;

/// Severity level for a parse diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// A non-fatal issue that doesn't prevent parsing.
    Warning,
    /// A recoverable error — the parser can continue but the document is malformed.
    Error,
    /// An unrecoverable error — parsing must stop.
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Source location within a document stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u64,
    /// 1-based column number (in codepoints, not bytes).
    pub column: u64,
    /// 0-based codepoint offset from the start of the stream.
    pub offset: u64,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single diagnostic emitted during parsing.
///
/// Diagnostics accumulate on the parser as it recovers, allowing a caller
/// to inspect everything that went wrong even when no handler was set for
/// the error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// Human-readable error message.
    pub message: String,
    /// Where in the stream this error occurred, when position tracking is on.
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{}: {} at {}", self.severity, self.message, loc),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// The error type surfaced through `on_error` and returned by the feeding
/// methods when a latched error is raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the stream the error occurred, when position tracking is on.
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{}\nLine: {}\nColumn: {}\nChar: {}",
                self.message, loc.line, loc.column, loc.offset
            ),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ParseError {}
