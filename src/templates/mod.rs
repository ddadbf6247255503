//! Layered template catalog and page rendering.
//!
//! Templates come from one or more named sources, each laid out as:
//!
//! ```text
//! layouts/   flat, required     -> `layout:<name>` entry points
//! partials/  recursive, optional -> shared fragments, e.g. `nav.html`
//! views/     recursive, optional -> one page each, e.g. `docs/intro`
//! ```
//!
//! Pages from a source other than the root (`-`) are named `<source>:<path>`.
//!
//! ```no_run
//! use trellis::templates::{DirSource, TemplateManager, TemplateOptions};
//!
//! let manager = TemplateManager::new(
//!     TemplateOptions::new()
//!         .source("-", DirSource::new("site"))
//!         .source("blog", DirSource::new("blog")),
//! );
//! manager.init()?;
//! # Ok::<(), trellis::templates::TemplateError>(())
//! ```

mod catalog;
mod config;
mod error;
mod helpers;
mod manager;
mod render;
mod response;
mod slot;
mod source;

pub use catalog::{
    Catalog, CatalogBuilder, LAYOUTS_DIR, PAGE_TEMPLATE, PARTIALS_DIR, SYSTEM_DIR, VIEWS_DIR,
    layout_template_name, lookup_name, page_name,
};
pub use config::{DEFAULT_BASE_LAYOUT, DEFAULT_EXTENSION, TemplateOptions, normalize_extension};
pub use error::{ErrorKind, TemplateError, error_chain};
pub use helpers::HelperRegistry;
pub use manager::{HOME_PAGE, SYSTEM_ERROR_PAGE, TemplateManager};
pub use render::ResponseSink;
pub use response::PageResponse;
pub use source::{
    Depth, DirSource, EmbeddedSource, MemorySource, NamedSource, ROOT_SOURCE, TemplateSource,
    is_root,
};
