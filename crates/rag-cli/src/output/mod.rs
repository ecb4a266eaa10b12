//! Terminal output formatting and utilities.
//!
//! All command output goes through `OutputHandler` so that `--json` and
//! colors are applied consistently, and so tests can capture what a command
//! printed.

pub mod colors;
pub mod errors;

use serde::Serialize;
use std::cell::RefCell;

use colors::ColorSupport;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: ColorSupport,
    json: bool,
    /// When set, stdout lines are recorded instead of printed
    captured: Option<RefCell<Vec<String>>>,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new(json: bool) -> Self {
        Self {
            colors: ColorSupport::detect(),
            json,
            captured: None,
        }
    }

    /// Handler that records stdout lines without colors
    pub fn buffered(json: bool) -> Self {
        Self {
            colors: ColorSupport::disabled(),
            json,
            captured: Some(RefCell::new(Vec::new())),
        }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn colors(&self) -> ColorSupport {
        self.colors
    }

    /// Lines recorded by a buffered handler
    pub fn lines(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .map(|captured| captured.borrow().clone())
            .unwrap_or_default()
    }

    /// Print a plain line
    pub fn line(&self, message: &str) {
        match &self.captured {
            Some(captured) => captured.borrow_mut().push(message.to_string()),
            None => println!("{}", message),
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        self.line(&self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.line(&format!("{} {}", self.colors.green("✓"), message));
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        self.line(&format!("{} {}", self.colors.yellow("⚠"), message));
    }

    /// Print a value as pretty JSON
    pub fn json<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        let text = serde_json::to_string_pretty(value)?;
        self.line(&text);
        Ok(())
    }
}
