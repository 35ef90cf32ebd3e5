//! Error rendering with suggestions and the cause chain.

use std::error::Error;

use cairn_core::error::CairnError;

use super::colors::ColorSupport;

/// Renders a `CairnError` for the terminal
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Message, optional location and suggestion, then every cause
    pub fn format_error(&self, error: &CairnError) -> String {
        let mut output = format!("{}: {}\n", self.colors.red("error"), error);

        if let CairnError::TomlParse { line, column, .. } = error {
            if *line > 0 {
                output.push_str(&format!(
                    "  {} line {}, column {}\n",
                    self.colors.dim("-->"),
                    line,
                    column
                ));
            }
        }

        let mut source = error.source();
        while let Some(cause) = source {
            output.push_str(&format!("{}: {}\n", self.colors.dim("caused by"), cause));
            source = cause.source();
        }

        if let Some(suggestion) = deepest_suggestion(error) {
            output.push_str(&format!("\n{}: {}\n", self.colors.bold("help"), suggestion));
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// The suggestion of the innermost wrapped error that has one
fn deepest_suggestion(error: &CairnError) -> Option<&'static str> {
    match error {
        CairnError::Contains { source, .. } | CairnError::Push { source, .. } => {
            deepest_suggestion(source).or_else(|| error.suggestion())
        }
        _ => error.suggestion(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> ErrorFormatter {
        ErrorFormatter::with_colors(ColorSupport::disabled())
    }

    #[test]
    fn test_format_includes_cause_chain() {
        let error = CairnError::push(
            "lib.a",
            CairnError::Network {
                message: "connection reset".to_string(),
                source: None,
            },
        );
        let rendered = plain().format_error(&error);

        assert!(rendered.starts_with("error: Upload of lib.a failed"));
        assert!(rendered.contains("caused by: Network error: connection reset"));
        assert!(rendered.contains("help: Check your connection"));
    }

    #[test]
    fn test_format_toml_location() {
        let error = CairnError::TomlParse {
            message: "unknown field".to_string(),
            line: 3,
            column: 1,
        };
        let rendered = plain().format_error(&error);
        assert!(rendered.contains("--> line 3, column 1"));
        assert!(rendered.contains("cairn check"));
    }

    #[test]
    fn test_interrupted_has_no_help() {
        let rendered = plain().format_error(&CairnError::Interrupted);
        assert_eq!(rendered, "error: Interrupted\n");
    }
}
