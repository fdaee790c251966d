use serde::{Deserialize, Serialize};

pub type ParamResult<T> = Result<T, ParamError>;

/// Byte range into the text handed to the expression parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn add_offset(self, delta: usize) -> Self {
        Self {
            start: self.start.saturating_add(delta),
            end: self.end.saturating_add(delta),
        }
    }
}

/// Syntax error reported by the leaf expression parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (at {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    #[must_use]
    pub fn add_offset(self, delta: usize) -> Self {
        Self {
            message: self.message,
            span: self.span.add_offset(delta),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    /// A parameter had the wrong shape for the function consuming it: a separator group where a
    /// single expression was required, or a missing argument where one is mandatory.
    #[error("{}invalid parameter", function_prefix(.function))]
    InvalidParameter { function: Option<String> },

    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(String),
}

impl ParamError {
    pub(crate) fn invalid_parameter(function: Option<&str>) -> Self {
        ParamError::InvalidParameter {
            function: function.map(str::to_string),
        }
    }

    /// Attach the name of the function whose arguments were being read.
    ///
    /// Only [`ParamError::InvalidParameter`] carries a function name; other variants are
    /// returned unchanged.
    #[must_use]
    pub fn in_function(self, name: &str) -> Self {
        match self {
            ParamError::InvalidParameter { .. } => ParamError::invalid_parameter(Some(name)),
            other => other,
        }
    }
}

fn function_prefix(function: &Option<String>) -> String {
    match function {
        Some(name) => format!("{name}: "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message_names_function() {
        let err = ParamError::invalid_parameter(Some("sum"));
        assert_eq!(err.to_string(), "sum: invalid parameter");

        let err = ParamError::invalid_parameter(None);
        assert_eq!(err.to_string(), "invalid parameter");
        assert_eq!(
            err.in_function("top").to_string(),
            "top: invalid parameter"
        );
    }

    #[test]
    fn syntax_errors_keep_their_span() {
        let err: ParamError = ParseError::new("unexpected token", Span::new(2, 3))
            .add_offset(4)
            .into();
        assert_eq!(err.to_string(), "syntax error: unexpected token (at 6..7)");
        assert_eq!(err.clone().in_function("f"), err);
    }
}
