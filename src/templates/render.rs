//! Buffered rendering onto a response sink.
//!
//! Status and headers must be decided before the first body byte, so a page
//! is executed into memory first and committed only once it rendered cleanly.

use std::{io, time::Instant};

use axum::http::{
    HeaderName, HeaderValue, StatusCode,
    header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    request::Parts,
};
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::{Map, Value};
use tera::{Context, Tera};
use tracing::{error, warn};

use super::catalog::{Catalog, layout_template_name};
use super::error::{TemplateError, error_chain};
use super::manager::SYSTEM_ERROR_PAGE;
use super::response::PageResponse;

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Destination for one HTTP response. Headers and status precede the body.
pub trait ResponseSink {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    fn set_status(&mut self, status: StatusCode);

    fn write_body(&mut self, body: &[u8]) -> io::Result<()>;

    /// Called once before an error response is written.
    fn record_failure(&mut self, _error: &TemplateError) {}
}

#[derive(Debug, Serialize)]
struct RequestView<'a> {
    method: &'a str,
    path: &'a str,
    query: Option<&'a str>,
}

impl<'a> From<&'a Parts> for RequestView<'a> {
    fn from(parts: &'a Parts) -> Self {
        Self {
            method: parts.method.as_str(),
            path: parts.uri.path(),
            query: parts.uri.query(),
        }
    }
}

pub(crate) struct RenderJob<'r, 'm> {
    pub catalog: &'r Catalog,
    pub page: String,
    pub content_type: &'r HeaderValue,
    pub response: &'r PageResponse<'m>,
}

struct Rendered {
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Vec<u8>,
}

pub(crate) fn render_page<S: ResponseSink + ?Sized>(
    sink: &mut S,
    request: &Parts,
    job: RenderJob<'_, '_>,
) -> io::Result<()> {
    let started = Instant::now();
    let result = render_into(sink, request, job);
    histogram!("trellis_render_ms").record(started.elapsed().as_secs_f64() * 1000.0);
    result
}

fn render_into<S: ResponseSink + ?Sized>(
    sink: &mut S,
    request: &Parts,
    job: RenderJob<'_, '_>,
) -> io::Result<()> {
    let RenderJob {
        catalog,
        page,
        content_type,
        response,
    } = job;

    let Some(bundle) = catalog.get(&page) else {
        counter!("trellis_render_total", "outcome" => "not_found").increment(1);
        return handle_error(sink, &TemplateError::not_found(page), response);
    };

    let layout = response.template_layout();
    let rendered = match execute(bundle, &page, layout, request, response) {
        Ok(rendered) => rendered,
        Err(err) => {
            counter!("trellis_render_total", "outcome" => "render_error").increment(1);
            if page == SYSTEM_ERROR_PAGE {
                return write_system_failure(sink, &err);
            }
            return handle_error(sink, &err, response);
        }
    };

    let has_content_type = rendered.headers.iter().any(|(name, _)| name == CONTENT_TYPE);
    if !has_content_type {
        sink.set_header(CONTENT_TYPE, content_type.clone());
    }
    for (name, value) in rendered.headers {
        sink.set_header(name, value);
    }
    sink.set_status(response.status_code());

    let result = sink.write_body(&rendered.body);
    match &result {
        Ok(()) => counter!("trellis_render_total", "outcome" => "ok").increment(1),
        Err(err) => {
            counter!("trellis_render_total", "outcome" => "write_error").increment(1);
            warn!(page = %page, layout, error = %err, "failed to write rendered page");
        }
    }
    result
}

fn execute(
    bundle: &Tera,
    page: &str,
    layout: &str,
    request: &Parts,
    response: &PageResponse<'_>,
) -> Result<Rendered, TemplateError> {
    let context = view_context(page, request, response)?;
    let headers = validated_headers(page, response)?;

    let mut body = Vec::new();
    bundle
        .render_to(&layout_template_name(layout), &context, &mut body)
        .map_err(|err| TemplateError::render(page, &err))?;

    Ok(Rendered { headers, body })
}

/// Bound data plus `title` and `request`, unless the data already defines them.
fn view_context(
    page: &str,
    request: &Parts,
    response: &PageResponse<'_>,
) -> Result<Context, TemplateError> {
    let mut data: Map<String, Value> = response
        .bound_data()
        .map_err(|message| TemplateError::render_message(page, message))?
        .clone();

    if let Some(title) = response.title_text() {
        data.entry("title")
            .or_insert_with(|| Value::String(title.to_string()));
    }
    if !data.contains_key("request") {
        let view = serde_json::to_value(RequestView::from(request))
            .map_err(|err| TemplateError::render(page, &err))?;
        data.insert("request".to_string(), view);
    }

    Context::from_serialize(&data).map_err(|err| TemplateError::render(page, &err))
}

fn validated_headers(
    page: &str,
    response: &PageResponse<'_>,
) -> Result<Vec<(HeaderName, HeaderValue)>, TemplateError> {
    response
        .header_map()
        .iter()
        .map(|(name, value)| {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| TemplateError::render(page, &err))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|err| TemplateError::render(page, &err))?;
            Ok((header_name, header_value))
        })
        .collect()
}

fn handle_error<S: ResponseSink + ?Sized>(
    sink: &mut S,
    err: &TemplateError,
    response: &PageResponse<'_>,
) -> io::Result<()> {
    error!(
        kind = err.kind().as_str(),
        page = err.page().unwrap_or_default(),
        requested = response.template_path(),
        layout = response.template_layout(),
        error = %err,
        "failed to render page"
    );
    sink.record_failure(err);
    write_plain_error(sink, &err.to_string())
}

/// The system error page itself failed: write the raw failure once and stop.
fn write_system_failure<S: ResponseSink + ?Sized>(
    sink: &mut S,
    err: &TemplateError,
) -> io::Result<()> {
    let raw = match err {
        TemplateError::Render { message, .. } => message.clone(),
        other => error_chain(other),
    };
    error!(page = SYSTEM_ERROR_PAGE, error = %raw, "system error page failed to render");
    sink.record_failure(err);
    write_plain_error(sink, &format!("error executing template: {raw}"))
}

fn write_plain_error<S: ResponseSink + ?Sized>(sink: &mut S, message: &str) -> io::Result<()> {
    sink.set_header(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT));
    sink.set_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    sink.write_body(format!("{message}\n").as_bytes())
}
