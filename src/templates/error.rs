use std::error::Error as StdError;

use thiserror::Error;

/// Failure classes surfaced by catalog construction and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Parse,
    Render,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Parse => "parse",
            ErrorKind::Render => "render",
        }
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {page}")]
    NotFound { page: String },
    #[error("template parse error in `{template}`: {message}")]
    Parse { template: String, message: String },
    #[error("template render error for `{page}`: {message}")]
    Render { page: String, message: String },
}

impl TemplateError {
    pub fn not_found(page: impl Into<String>) -> Self {
        Self::NotFound { page: page.into() }
    }

    pub fn parse(template: impl Into<String>, error: &(dyn StdError + 'static)) -> Self {
        Self::Parse {
            template: template.into(),
            message: error_chain(error),
        }
    }

    pub fn parse_message(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            template: template.into(),
            message: message.into(),
        }
    }

    pub fn render(page: impl Into<String>, error: &(dyn StdError + 'static)) -> Self {
        Self::Render {
            page: page.into(),
            message: error_chain(error),
        }
    }

    pub fn render_message(page: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            page: page.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::NotFound { .. } => ErrorKind::NotFound,
            TemplateError::Parse { .. } => ErrorKind::Parse,
            TemplateError::Render { .. } => ErrorKind::Render,
        }
    }

    /// Page name for not-found and render failures.
    pub fn page(&self) -> Option<&str> {
        match self {
            TemplateError::NotFound { page } | TemplateError::Render { page, .. } => Some(page),
            TemplateError::Parse { .. } => None,
        }
    }
}

/// Flatten an error and its sources into one line.
///
/// Tera reports the useful detail (line, column, missing variable) in the
/// source chain while the top-level message only names the template.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(inner) = current {
        let text = inner.to_string();
        if !text.is_empty() && !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = inner.source();
    }
    message
}
