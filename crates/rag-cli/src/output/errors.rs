//! Error message formatting with actionable suggestions.

use rag_core::error::RagError;
use std::error::Error;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format any error reaching the binary edge, with an optional extra hint
    pub fn format(&self, error: &anyhow::Error, hint: Option<&str>) -> String {
        let mut output = match error.downcast_ref::<RagError>() {
            Some(rag_error) => self.format_error(rag_error),
            None => {
                let mut output = self.format_simple(&error.to_string());
                output.push('\n');
                for cause in error.chain().skip(1) {
                    self.push_cause(&mut output, &cause.to_string());
                }
                output
            },
        };

        if let Some(hint) = hint {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(hint);
            output.push('\n');
        }

        output
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &RagError) -> String {
        let mut output = self.format_simple(&error.to_string());
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            self.push_cause(&mut output, &err.to_string());
            source = err.source();
        }

        output
    }

    /// Format a simple error message
    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }

    fn push_cause(&self, output: &mut String, cause: &str) {
        output.push('\n');
        output.push_str(&self.colors.dim("caused by"));
        output.push_str(": ");
        output.push_str(cause);
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new(ColorSupport::detect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter() -> ErrorFormatter {
        ErrorFormatter::new(ColorSupport::disabled())
    }

    #[test]
    fn test_includes_suggestion() {
        let err = RagError::UnknownNode { id: "P9".to_string() };
        let text = formatter().format_error(&err);
        assert!(text.starts_with("error: Node 'P9' not found"));
        assert!(text.contains("help: Add the process or resource first"));
    }

    #[test]
    fn test_includes_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only disk");
        let err = RagError::persistence_with("Failed to write graph", io);
        let text = formatter().format(&anyhow::Error::new(err), None);
        assert!(text.contains("Persistence failure: Failed to write graph"));
        assert!(text.contains("caused by: read-only disk"));
    }

    #[test]
    fn test_plain_anyhow_error() {
        let err = anyhow::anyhow!("disk gone").context("Failed to start");
        let text = formatter().format(&err, None);
        assert!(text.starts_with("error: Failed to start"));
        assert!(text.contains("caused by: disk gone"));
    }

    #[test]
    fn test_extra_hint() {
        let err = anyhow::Error::new(RagError::UnknownNode { id: "p1".to_string() });
        let text = formatter().format(&err, Some("did you mean 'P1'?"));
        assert!(text.ends_with("help: did you mean 'P1'?\n"));
    }
}
