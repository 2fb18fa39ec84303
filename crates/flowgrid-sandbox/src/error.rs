//! Sandbox error types.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// A compile-time diagnostic with user-source coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line in the user's source.
    pub line: u32,
    /// 1-based column in the user's source.
    pub column: u32,
    /// Diagnostic message.
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}, Col {}: {}", self.line, self.column, self.message)
    }
}

/// Errors that can occur while checking or executing sandboxed code.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Code failed to parse; reported before anything executes.
    #[error("code compilation failed: {}", format_diagnostics(.0))]
    Compile(Vec<Diagnostic>),

    /// Code threw or rejected at run time.
    #[error("{0}")]
    Execution(String),

    /// Wall-clock budget exhausted.
    #[error("Execution timeout")]
    Timeout,

    /// Source exceeds the configured size cap.
    #[error("code too large: {actual} bytes (max {max})")]
    CodeTooLarge {
        /// Configured maximum in bytes.
        max: usize,
        /// Actual code size in bytes.
        actual: usize,
    },

    /// Returned value exceeds the configured size cap once serialized.
    #[error("output too large: {actual} bytes (max {max})")]
    OutputTooLarge {
        /// Configured maximum in bytes.
        max: usize,
        /// Actual output size in bytes.
        actual: usize,
    },

    /// Internal sandbox failure.
    #[error("internal sandbox error: {0}")]
    Internal(String),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

static LINE_COL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)line (\d+), col(?:umn)? (\d+)").expect("valid regex"));

static COLON_POS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(\d+):(\d+)").expect("valid regex"));

/// Best-effort extraction of a `(line, column)` position from an engine
/// error message.
///
/// Positions refer to the evaluated unit, not necessarily the user's
/// original source; callers adjust for any wrapper offset themselves.
pub fn source_position(message: &str) -> Option<(u32, u32)> {
    let captures = LINE_COL
        .captures(message)
        .or_else(|| COLON_POS.captures(message))?;
    let line = captures.get(1)?.as_str().parse().ok()?;
    let column = captures.get(2)?.as_str().parse().ok()?;
    Some((line, column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_line_col_form() {
        let pos = source_position("unexpected token ';' at line 12, col 3");
        assert_eq!(pos, Some((12, 3)));
    }

    #[test]
    fn extracts_column_form() {
        let pos = source_position("SyntaxError at line 4, column 17");
        assert_eq!(pos, Some((4, 17)));
    }

    #[test]
    fn extracts_colon_form() {
        let pos = source_position("Error: boom\n    at <anonymous>:7:21");
        assert_eq!(pos, Some((7, 21)));
    }

    #[test]
    fn returns_none_without_position() {
        assert_eq!(source_position("Error: boom"), None);
    }

    #[test]
    fn compile_error_formats_all_diagnostics() {
        let err = SandboxError::Compile(vec![
            Diagnostic { line: 1, column: 2, message: "bad token".into() },
            Diagnostic { line: 3, column: 4, message: "worse token".into() },
        ]);
        let text = err.to_string();
        assert!(text.contains("Line 1, Col 2: bad token"));
        assert!(text.contains("Line 3, Col 4: worse token"));
    }

    #[test]
    fn timeout_display_is_stable() {
        assert_eq!(SandboxError::Timeout.to_string(), "Execution timeout");
    }
}
