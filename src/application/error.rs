use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError, templates::TemplateError};

/// Diagnostic chain attached to error responses and read back by the
/// response logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: String,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message: public_message.into(),
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = format!("{}\n", self.public_message);
        let mut response = (self.status, body).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Catalog rebuild failures are operator-facing, so the message is public.
impl From<TemplateError> for HttpError {
    fn from(error: TemplateError) -> Self {
        HttpError::from_error(
            "application::error::template_error_to_http_error",
            StatusCode::INTERNAL_SERVER_ERROR,
            error.to_string(),
            &error,
        )
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Infra(InfraError::Configuration { .. }) => 78,
            AppError::Infra(InfraError::Templates(_)) => 65,
            AppError::Infra(InfraError::Io(_)) => 74,
            AppError::Infra(InfraError::Telemetry(_)) | AppError::Unexpected(_) => 1,
        }
    }
}

impl From<TemplateError> for AppError {
    fn from(error: TemplateError) -> Self {
        Self::Infra(InfraError::Templates(error))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn report_collects_source_chain() {
        let inner = std::io::Error::other("disk gone");
        let outer = InfraError::Io(inner);
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &outer);
        assert_eq!(report.messages[0], "io error: disk gone");
        assert_eq!(report.source, "test");
    }

    #[test]
    fn template_errors_become_public_500s() {
        let error = TemplateError::parse_message("views/home.html", "unexpected `%}`");
        let http = HttpError::from(error);
        assert_eq!(http.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = http.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert!(report.messages[0].contains("views/home.html"));
    }

    #[test]
    fn exit_codes_distinguish_failures() {
        let parse = AppError::from(TemplateError::parse_message("layouts", "missing"));
        assert_eq!(parse.exit_code(), 65);
        let config = AppError::from(InfraError::configuration("bad"));
        assert_eq!(config.exit_code(), 78);
        assert_eq!(AppError::unexpected("boom").exit_code(), 1);
    }
}
