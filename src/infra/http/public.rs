use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header::ALLOW},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::info;

use crate::{application::error::HttpError, templates::TemplateManager};

use super::{
    middleware::{log_responses, set_request_context},
    sink::render_response,
};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub templates: Arc<TemplateManager>,
    pub enable_reload: bool,
}

pub fn build_router(state: HttpState) -> Router {
    let mut router = Router::new().route("/_health", get(health));
    if state.enable_reload {
        router = router.route("/_templates/reload", post(reload));
    }

    router
        .fallback(serve_page)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn reload(State(state): State<HttpState>) -> Response {
    let templates = state.templates.clone();
    match tokio::task::spawn_blocking(move || templates.reload()).await {
        Ok(Ok(pages)) => {
            info!(pages, "template catalog reloaded over http");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(Err(err)) => HttpError::from(err).into_response(),
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        )
        .into_response(),
    }
}

async fn serve_page(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let (parts, _body) = request.into_parts();
    if parts.method != Method::GET && parts.method != Method::HEAD {
        let mut response = HttpError::new(
            SOURCE,
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
            format!("{} is not served for template pages", parts.method),
        )
        .into_response();
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
        return response;
    }

    let path = match urlencoding::decode(parts.uri.path()) {
        Ok(path) => path,
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request path is not valid UTF-8",
                &err,
            )
            .into_response();
        }
    };

    let templates = &state.templates;
    let page = templates.page_name_for(&path);
    let response = templates.response().title(page.clone()).page(page);
    render_response(response, &parts)
}
