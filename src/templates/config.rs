//! Template manager options.
//!
//! Unset or empty values fall back to defaults when the manager is built:
//! the base layout to `base`, the system layout to the resolved base layout,
//! and the extension to `.html` (always normalized to start with `.`).

use std::sync::Arc;

use tracing::{Span, info_span};

use super::helpers::{HelperRegistry, page_name_function};
use super::source::{DirSource, EmbeddedSource, NamedSource, ROOT_SOURCE, TemplateSource};

pub const DEFAULT_BASE_LAYOUT: &str = "base";
pub const DEFAULT_EXTENSION: &str = ".html";

/// Options for [`TemplateManager`](super::TemplateManager).
#[derive(Debug, Clone, Default)]
pub struct TemplateOptions {
    base_layout: Option<String>,
    system_layout: Option<String>,
    extension: Option<String>,
    sources: Vec<NamedSource>,
    helpers: HelperRegistry,
    diagnostics: Option<Span>,
}

impl TemplateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_layout(mut self, layout: impl Into<String>) -> Self {
        self.base_layout = Some(layout.into());
        self
    }

    pub fn system_layout(mut self, layout: impl Into<String>) -> Self {
        self.system_layout = Some(layout.into());
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Register a source. Re-using a name replaces the earlier source in place.
    pub fn source(mut self, name: impl Into<String>, source: impl TemplateSource + 'static) -> Self {
        self.push_source(NamedSource::new(name, source));
        self
    }

    pub fn shared_source(mut self, name: impl Into<String>, source: Arc<dyn TemplateSource>) -> Self {
        self.push_source(NamedSource::from_arc(name, source));
        self
    }

    /// Helpers merged over the built-in set and any registered earlier.
    pub fn helpers(mut self, helpers: HelperRegistry) -> Self {
        self.helpers = self.helpers.merge(helpers);
        self
    }

    /// Span the manager logs catalog builds and renders under. Defaults to a
    /// `templates` span.
    pub fn diagnostics(mut self, span: Span) -> Self {
        self.diagnostics = Some(span);
        self
    }

    fn push_source(&mut self, source: NamedSource) {
        match self
            .sources
            .iter_mut()
            .find(|existing| existing.name() == source.name())
        {
            Some(existing) => *existing = source,
            None => self.sources.push(source),
        }
    }

    pub(crate) fn resolve(self) -> ResolvedOptions {
        let base_layout = non_empty(self.base_layout).unwrap_or_else(|| DEFAULT_BASE_LAYOUT.into());
        let system_layout = non_empty(self.system_layout).unwrap_or_else(|| base_layout.clone());
        let extension = normalize_extension(self.extension.as_deref().unwrap_or_default());

        let helpers = HelperRegistry::builtin()
            .function("page_name", page_name_function(extension.clone()))
            .merge(self.helpers);

        ResolvedOptions {
            base_layout,
            system_layout,
            extension,
            sources: self.sources,
            helpers,
            span: self
                .diagnostics
                .unwrap_or_else(|| info_span!(target: "trellis::templates", "templates")),
        }
    }
}

impl From<&crate::config::TemplateSettings> for TemplateOptions {
    fn from(settings: &crate::config::TemplateSettings) -> Self {
        let mut options = Self::new();
        if let Some(layout) = settings.base_layout.as_ref() {
            options = options.base_layout(layout.clone());
        }
        if let Some(layout) = settings.system_layout.as_ref() {
            options = options.system_layout(layout.clone());
        }
        if let Some(extension) = settings.extension.as_ref() {
            options = options.extension(extension.clone());
        }

        if settings.sources.is_empty() {
            return options.source(ROOT_SOURCE, EmbeddedSource::builtin());
        }
        for source in &settings.sources {
            options = options.source(source.name.clone(), DirSource::new(source.path.clone()));
        }
        options
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedOptions {
    pub base_layout: String,
    pub system_layout: String,
    pub extension: String,
    pub sources: Vec<NamedSource>,
    pub helpers: HelperRegistry,
    pub span: Span,
}

/// Ensure the extension starts with `.`; empty input yields the default.
pub fn normalize_extension(extension: &str) -> String {
    let extension = extension.trim();
    if extension.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
