//! Lexical classification of engine console output
//!
//! The engine only prints human-oriented text, so each trimmed line is sorted
//! by a fixed precedence of predicates:
//!
//! 1. noise: load banners naming a `.xwam` or `.P` file, dropped
//! 2. warning: contains "warning" (any case) or starts with `+++`
//! 3. error: contains "error" (any case), starts with `***`, or mentions
//!    "Syntax error" / "Undefined"
//! 4. anything else is a result
//!
//! Warnings are tested before errors, so "Warning: error count 1" is a warning.

use serde::{Deserialize, Serialize};

/// Bucket a single output line falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Noise,
    Warning,
    Error,
    Result,
}

/// Engine output partitioned into results, warnings and errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedOutput {
    pub results: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// The unmodified text that was classified
    #[serde(rename = "raw_output")]
    pub raw: String,
}

impl ClassifiedOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether any error line mentions "syntax" or "error", ignoring case.
    pub fn has_syntax_errors(&self) -> bool {
        self.errors.iter().any(|line| {
            let lower = line.to_lowercase();
            lower.contains("syntax") || lower.contains("error")
        })
    }
}

fn is_noise(line: &str) -> bool {
    line.contains("Loading") && (line.contains(".xwam") || line.contains(".P"))
}

fn is_warning(line: &str) -> bool {
    line.to_lowercase().contains("warning") || line.starts_with("+++")
}

fn is_error(line: &str) -> bool {
    line.to_lowercase().contains("error")
        || line.starts_with("***")
        || line.contains("Syntax error")
        || line.contains("Undefined")
}

/// Classify one already-trimmed, non-blank line.
pub fn classify_line(line: &str) -> LineClass {
    if is_noise(line) {
        LineClass::Noise
    } else if is_warning(line) {
        LineClass::Warning
    } else if is_error(line) {
        LineClass::Error
    } else {
        LineClass::Result
    }
}

/// Partition `raw` line by line. Blank lines are skipped.
pub fn classify(raw: &str) -> ClassifiedOutput {
    let mut output = ClassifiedOutput {
        raw: raw.to_string(),
        ..Default::default()
    };

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match classify_line(line) {
            LineClass::Noise => {}
            LineClass::Warning => output.warnings.push(line.to_string()),
            LineClass::Error => output.errors.push(line.to_string()),
            LineClass::Result => output.results.push(line.to_string()),
        }
    }

    output
}
