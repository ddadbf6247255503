//! Catalog construction.
//!
//! Every source contributes three independent scans:
//!
//! - **layouts**: flat, required; each file becomes `layout:<stem>`
//! - **partials**: recursive, optional; named by their path below `partials/`
//! - **views**: recursive, optional; each file becomes one page
//!
//! Layouts and partials from all sources form one shared common set. Each page
//! gets its own clone of that set with the page parsed in as `page`, so a page
//! parse never touches the common set or another page's bundle.

use std::{collections::BTreeMap, time::Instant};

use tera::Tera;
use tracing::{debug, info};

use super::error::TemplateError;
use super::helpers::HelperRegistry;
use super::manager::HOME_PAGE;
use super::source::{Depth, NamedSource};

pub const LAYOUTS_DIR: &str = "layouts";
pub const PARTIALS_DIR: &str = "partials";
pub const VIEWS_DIR: &str = "views";
pub const SYSTEM_DIR: &str = "system";

/// Template name each bundle stores its page under. Layouts render it with
/// `{% include "page" %}`.
pub const PAGE_TEMPLATE: &str = "page";

const LAYOUT_PREFIX: &str = "layout:";
const AUTOESCAPE_EXTENSIONS: [&str; 3] = [".html", ".htm", ".xml"];

pub fn layout_template_name(layout: &str) -> String {
    format!("{LAYOUT_PREFIX}{layout}")
}

/// Derive the page name for a view file.
///
/// `relative` is the path below `views/`; the extension is stripped and non-root
/// sources prefix `<source>:`.
pub fn page_name(source: &NamedSource, relative: &str, extension: &str) -> String {
    let stem = relative.strip_suffix(extension).unwrap_or(relative);
    if source.is_root() {
        stem.to_string()
    } else {
        format!("{}:{stem}", source.name())
    }
}

/// Map a requested path to the page it names.
///
/// Surrounding whitespace and leading `/` are dropped, a trailing `extension` is
/// stripped and an empty path resolves to [`HOME_PAGE`].
pub fn lookup_name(path: &str, extension: &str) -> String {
    let trimmed = path.trim().trim_start_matches('/');
    let trimmed = trimmed.strip_suffix(extension).unwrap_or(trimmed);
    if trimmed.is_empty() {
        HOME_PAGE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Page name → composed bundle. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pages: BTreeMap<String, Tera>,
}

impl Catalog {
    pub fn get(&self, page: &str) -> Option<&Tera> {
        self.pages.get(page)
    }

    pub fn contains(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }

    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Log every page with the templates its bundle carries.
    pub fn describe(&self) {
        for (page, bundle) in &self.pages {
            let mut templates: Vec<_> = bundle.get_template_names().collect();
            templates.sort_unstable();
            debug!(page = %page, templates = ?templates, "catalog entry");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadedTemplate {
    pub name: String,
    pub origin: String,
    pub contents: String,
}

pub struct CatalogBuilder<'a> {
    sources: &'a [NamedSource],
    extension: &'a str,
    helpers: &'a HelperRegistry,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(sources: &'a [NamedSource], extension: &'a str, helpers: &'a HelperRegistry) -> Self {
        Self {
            sources,
            extension,
            helpers,
        }
    }

    pub fn build(&self) -> Result<Catalog, TemplateError> {
        let started = Instant::now();
        // `:` separates the source prefix from the page path.
        if let Some(source) = self.sources.iter().find(|source| source.name().contains(':')) {
            return Err(TemplateError::parse_message(
                source.name(),
                format!("source name `{}` must not contain `:`", source.name()),
            ));
        }
        let common = self.common()?;

        let mut pages = BTreeMap::new();
        let mut origins: BTreeMap<String, String> = BTreeMap::new();
        for source in self.sources {
            for view in scan_views(source, self.extension)? {
                if let Some(previous) = origins.get(&view.name) {
                    return Err(TemplateError::parse_message(
                        view.origin,
                        format!("page `{}` is already defined by `{previous}`", view.name),
                    ));
                }

                let mut bundle = common.clone();
                bundle
                    .add_raw_template(PAGE_TEMPLATE, &view.contents)
                    .map_err(|err| TemplateError::parse(view.origin.clone(), &err))?;
                debug!(page = %view.name, origin = %view.origin, "loaded page");

                origins.insert(view.name.clone(), view.origin);
                pages.insert(view.name, bundle);
            }
        }

        info!(
            sources = self.sources.len(),
            pages = pages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "template catalog built"
        );
        Ok(Catalog { pages })
    }

    /// Shared layouts and partials, with helpers applied.
    fn common(&self) -> Result<Tera, TemplateError> {
        let mut common = Tera::default();
        if AUTOESCAPE_EXTENSIONS.contains(&self.extension) {
            // Entry points are named `layout:<name>`, so suffix matching has
            // to accept every template name.
            common.autoescape_on(vec![""]);
        } else {
            common.autoescape_on(vec![]);
        }
        self.helpers.apply(&mut common);

        let mut shared: Vec<LoadedTemplate> = Vec::new();
        for source in self.sources {
            shared.extend(scan_layouts(source, self.extension)?);
        }
        for source in self.sources {
            shared.extend(scan_partials(source, self.extension)?);
        }

        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for template in &shared {
            if let Some(previous) = seen.insert(&template.name, &template.origin) {
                debug!(
                    template = %template.name,
                    replaced = %previous,
                    by = %template.origin,
                    "shared template overridden by later source"
                );
            }
        }

        common
            .add_raw_templates(
                shared
                    .iter()
                    .map(|template| (template.name.as_str(), template.contents.as_str())),
            )
            .map_err(|err| {
                let origin = shared
                    .iter()
                    .rev()
                    .find(|template| err.to_string().contains(&format!("'{}'", template.name)))
                    .map(|template| template.origin.clone())
                    .unwrap_or_else(|| "layouts and partials".to_string());
                TemplateError::parse(origin, &err)
            })?;

        Ok(common)
    }
}

/// Layout files directly inside `layouts/`, named `layout:<stem>`.
pub(crate) fn scan_layouts(
    source: &NamedSource,
    extension: &str,
) -> Result<Vec<LoadedTemplate>, TemplateError> {
    let origin = source.origin(LAYOUTS_DIR);
    if !source.source().has_dir(LAYOUTS_DIR) {
        return Err(TemplateError::parse_message(
            origin,
            "source has no layouts directory",
        ));
    }

    let layouts = load_matching(source, LAYOUTS_DIR, Depth::Flat, extension, |relative| {
        let stem = relative.strip_suffix(extension).unwrap_or(relative);
        layout_template_name(stem)
    })?;

    if layouts.is_empty() {
        return Err(TemplateError::parse_message(
            origin,
            format!("no `*{extension}` layouts found"),
        ));
    }
    Ok(layouts)
}

/// Partial files at any depth inside `partials/`, named by their path below it.
pub(crate) fn scan_partials(
    source: &NamedSource,
    extension: &str,
) -> Result<Vec<LoadedTemplate>, TemplateError> {
    if !source.source().has_dir(PARTIALS_DIR) {
        return Ok(Vec::new());
    }
    load_matching(source, PARTIALS_DIR, Depth::Recursive, extension, str::to_string)
}

/// View files at any depth inside `views/`, named by their page name.
pub(crate) fn scan_views(
    source: &NamedSource,
    extension: &str,
) -> Result<Vec<LoadedTemplate>, TemplateError> {
    if !source.source().has_dir(VIEWS_DIR) {
        return Ok(Vec::new());
    }
    load_matching(source, VIEWS_DIR, Depth::Recursive, extension, |relative| {
        page_name(source, relative, extension)
    })
}

fn load_matching(
    source: &NamedSource,
    dir: &str,
    depth: Depth,
    extension: &str,
    name_for: impl Fn(&str) -> String,
) -> Result<Vec<LoadedTemplate>, TemplateError> {
    let files = source
        .source()
        .files(dir, depth)
        .map_err(|err| TemplateError::parse(source.origin(dir), &err))?;

    let prefix = format!("{dir}/");
    let mut loaded = Vec::new();
    for path in files {
        if !path.ends_with(extension) {
            continue;
        }
        let Some(relative) = path.strip_prefix(&prefix) else {
            continue;
        };

        let origin = source.origin(&path);
        let contents = source
            .source()
            .read(&path)
            .map_err(|err| TemplateError::parse(origin.clone(), &err))?;
        let name = name_for(relative);
        debug!(source = source.name(), template = %name, path = %path, "loaded template");
        loaded.push(LoadedTemplate {
            name,
            origin,
            contents,
        });
    }
    Ok(loaded)
}
