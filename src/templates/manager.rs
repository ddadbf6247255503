use std::{
    io,
    sync::Arc,
};

use axum::http::{HeaderValue, request::Parts};
use metrics::{counter, gauge};
use serde_json::json;
use tracing::{Span, info, warn};

use super::catalog::{Catalog, CatalogBuilder, lookup_name};
use super::config::{ResolvedOptions, TemplateOptions};
use super::error::TemplateError;
use super::helpers::HelperRegistry;
use super::render::{RenderJob, ResponseSink, render_page};
use super::response::PageResponse;
use super::slot::CatalogSlot;
use super::source::NamedSource;

/// Page rendered for server errors; it renders with the system layout.
pub const SYSTEM_ERROR_PAGE: &str = "system/server-error";

/// Page served for an empty request path.
pub const HOME_PAGE: &str = "home";

/// Owns the template sources and the active catalog.
///
/// The catalog is rebuilt wholesale by [`init`](Self::init) and swapped in only
/// once the new build succeeded; renders always see one complete catalog.
#[derive(Debug)]
pub struct TemplateManager {
    base_layout: String,
    system_layout: String,
    extension: String,
    content_type: HeaderValue,
    sources: Vec<NamedSource>,
    helpers: HelperRegistry,
    span: Span,
    catalog: CatalogSlot,
}

impl TemplateManager {
    pub fn new(options: TemplateOptions) -> Self {
        let ResolvedOptions {
            base_layout,
            system_layout,
            extension,
            sources,
            helpers,
            span,
        } = options.resolve();
        let content_type = content_type_for(&extension);

        Self {
            base_layout,
            system_layout,
            extension,
            content_type,
            sources,
            helpers,
            span,
            catalog: CatalogSlot::default(),
        }
    }

    /// Build the catalog from every source and make it active.
    ///
    /// On failure the previously active catalog (if any) stays in place.
    /// Returns the number of pages in the new catalog.
    pub fn init(&self) -> Result<usize, TemplateError> {
        let _entered = self.span.enter();
        let _guard = self.catalog.rebuild_guard();

        let built = CatalogBuilder::new(&self.sources, &self.extension, &self.helpers).build();
        let catalog = match built {
            Ok(catalog) => catalog,
            Err(err) => {
                counter!("trellis_catalog_build_total", "result" => "error").increment(1);
                warn!(error = %err, "template catalog build failed; keeping previous catalog");
                return Err(err);
            }
        };

        catalog.describe();
        let pages = catalog.len();
        self.catalog.install(catalog);

        counter!("trellis_catalog_build_total", "result" => "ok").increment(1);
        gauge!("trellis_catalog_pages").set(pages as f64);
        info!(pages, "template catalog installed");
        Ok(pages)
    }

    /// Rebuild the catalog from the current contents of every source.
    pub fn reload(&self) -> Result<usize, TemplateError> {
        self.init()
    }

    pub fn is_initialized(&self) -> bool {
        self.catalog.current().is_some()
    }

    /// Snapshot of the active catalog; empty before the first successful build.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.current().unwrap_or_default()
    }

    pub fn response(&self) -> PageResponse<'_> {
        PageResponse::new(self)
    }

    /// Response targeting the system error page with status 500.
    pub fn server_error(&self, message: impl Into<String>) -> PageResponse<'_> {
        let message = message.into();
        self.response()
            .page(SYSTEM_ERROR_PAGE)
            .status(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
            .data(&json!({ "error": message }))
    }

    pub fn render<S: ResponseSink + ?Sized>(
        &self,
        sink: &mut S,
        request: &Parts,
        response: &PageResponse<'_>,
    ) -> io::Result<()> {
        let _entered = self.span.enter();
        let catalog = self.catalog();
        let job = RenderJob {
            catalog: &catalog,
            page: self.page_name_for(response.template_path()),
            content_type: &self.content_type,
            response,
        };
        render_page(sink, request, job)
    }

    /// Map a requested path to a page name with the configured extension.
    pub fn page_name_for(&self, path: &str) -> String {
        lookup_name(path, &self.extension)
    }

    pub fn base_layout(&self) -> &str {
        &self.base_layout
    }

    pub fn system_layout(&self) -> &str {
        &self.system_layout
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn sources(&self) -> &[NamedSource] {
        &self.sources
    }
}

fn content_type_for(extension: &str) -> HeaderValue {
    let mime = mime_guess::from_ext(extension.trim_start_matches('.'))
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::TEXT)
        .unwrap_or(mime_guess::mime::TEXT_HTML);
    HeaderValue::from_str(&format!("{}; charset=utf-8", mime.essence_str()))
        .unwrap_or_else(|_| HeaderValue::from_static("text/html; charset=utf-8"))
}
