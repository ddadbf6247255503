use std::io;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, request::Parts},
    response::Response,
};
use tracing::warn;

use crate::{
    application::error::ErrorReport,
    templates::{PageResponse, ResponseSink, TemplateError},
};

const SOURCE: &str = "infra::http::sink";

/// Collects a rendered page into an axum [`Response`].
///
/// Render failures are attached as an [`ErrorReport`] so the response logging
/// middleware can report them.
#[derive(Debug)]
pub struct HttpSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    report: Option<ErrorReport>,
}

impl HttpSink {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            report: None,
        }
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        if let Some(report) = self.report {
            report.attach(&mut response);
        }
        response
    }
}

impl Default for HttpSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for HttpSink {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn write_body(&mut self, body: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(body);
        Ok(())
    }

    fn record_failure(&mut self, error: &TemplateError) {
        self.report = Some(ErrorReport::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            error,
        ));
    }
}

/// Render `page` for `request` into a complete response.
pub fn render_response(page: PageResponse<'_>, request: &Parts) -> Response {
    let mut sink = HttpSink::new();
    if let Err(err) = page.render(&mut sink, request) {
        warn!(error = %err, "buffered page write failed");
    }
    sink.into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, header::CONTENT_TYPE};

    use super::*;

    #[test]
    fn collects_status_headers_and_body() {
        let mut sink = HttpSink::new();
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        sink.set_status(StatusCode::ACCEPTED);
        sink.write_body(b"hello ").unwrap();
        sink.write_body(b"world").unwrap();

        let response = sink.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert!(response.extensions().get::<ErrorReport>().is_none());
    }

    #[test]
    fn failures_are_attached_as_reports() {
        let mut sink = HttpSink::new();
        sink.record_failure(&TemplateError::not_found("missing"));

        let response = sink.into_response();
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.source, SOURCE);
        assert_eq!(report.messages[0], "template not found: missing");
    }

    #[test]
    fn render_response_reports_unknown_pages() {
        let manager = crate::templates::TemplateManager::new(
            crate::templates::TemplateOptions::new().source(
                "-",
                crate::templates::MemorySource::new()
                    .with_file("layouts/base.html", "{% include \"page\" %}"),
            ),
        );
        manager.init().unwrap();
        let (parts, _) = Request::new(()).into_parts();

        let response = render_response(manager.response().page("nope"), &parts);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
