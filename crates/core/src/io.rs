//! Output handling with stdout/stderr separation contract
//!
//! Commands write their results through [`Output`] instead of `println!` so
//! machine-readable output never mixes with logs, which go to stderr via
//! tracing.

use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};

/// Output helper that enforces stdout/stderr separation
///
/// # Examples
///
/// ```
/// use slidekit_core::io::Output;
/// use serde_json::json;
///
/// let mut output = Output::stdout();
/// output.write_json(&json!({"resolved": 3, "failed": 0})).unwrap();
/// output.write_line("3 artifacts resolved").unwrap();
/// ```
pub struct Output {
    writer: Box<dyn Write>,
}

impl Output {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }

    /// Write a value as pretty-printed JSON followed by a newline
    pub fn write_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write one line of user-facing text
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{}", text)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
