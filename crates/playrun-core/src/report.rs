//! JSON report summary
//!
//! The Playwright JSON reporter writes a top-level `stats` object:
//!
//! ```json
//! { "stats": { "expected": 12, "unexpected": 7, "skipped": 2, "flaky": 1, "duration": 48213.5 } }
//! ```
//!
//! Reading is lenient. Anything missing or malformed counts as 0, so a
//! half-written report still produces a summary.

use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::Result;

/// Counters from the report's `stats` object
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    /// Tests with the expected outcome (passed)
    pub expected: u64,
    /// Tests with an unexpected outcome (failed)
    pub unexpected: u64,
    /// Skipped tests
    pub skipped: u64,
    /// Tests that passed on retry
    pub flaky: u64,
    /// Wall-clock duration in milliseconds
    pub duration_ms: f64,
}

impl Stats {
    /// Read the summary from a report file.
    ///
    /// Only failing to read the file is an error; its content never is.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read(path.as_ref())?;
        Ok(Self::parse_bytes(&contents))
    }

    /// Extract the summary from report text
    pub fn parse(contents: &str) -> Self {
        Self::parse_bytes(contents.as_bytes())
    }

    /// Extract the summary from raw report bytes, which need not be UTF-8
    pub fn parse_bytes(contents: &[u8]) -> Self {
        let doc: Value = match serde_json::from_slice(contents) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Report is not valid JSON ({}); counting everything as 0", e);
                Value::Null
            }
        };
        Self::from_value(&doc)
    }

    /// Extract the summary from a parsed report
    pub fn from_value(doc: &Value) -> Self {
        let stats = doc.get("stats").unwrap_or(&Value::Null);
        let number = |key: &str| stats.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        let count = |key: &str| {
            let value = stats.get(key);
            value
                .and_then(Value::as_u64)
                .or_else(|| value.and_then(Value::as_f64).map(|n| n.max(0.0) as u64))
                .unwrap_or(0)
        };

        Self {
            expected: count("expected"),
            unexpected: count("unexpected"),
            skipped: count("skipped"),
            flaky: count("flaky"),
            duration_ms: number("duration"),
        }
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms / 1000.0
    }

    /// Whether any test had an unexpected outcome
    pub fn has_failures(&self) -> bool {
        self.unexpected > 0
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test Summary")?;
        writeln!(f, "  Passed:   {}", self.expected)?;
        writeln!(f, "  Failed:   {}", self.unexpected)?;
        writeln!(f, "  Skipped:  {}", self.skipped)?;
        writeln!(f, "  Flaky:    {}", self.flaky)?;
        write!(f, "  Duration: {:.2}s", self.duration_secs())
    }
}
