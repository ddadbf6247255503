//! Named, read-only template trees.
//!
//! A source hands out `/`-separated paths relative to its own root, sorted, so
//! every scan over it is deterministic regardless of the backing store.

use std::{
    collections::BTreeMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use include_dir::{Dir, DirEntry, include_dir};
use walkdir::WalkDir;

/// Name of the root source. Pages from the root source carry no prefix.
pub const ROOT_SOURCE: &str = "-";

static BUILTIN_TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Returns true for the root sentinel (`-`) and the empty name.
pub fn is_root(name: &str) -> bool {
    name.is_empty() || name == ROOT_SOURCE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Only files directly inside the directory.
    Flat,
    /// Files at any depth below the directory.
    Recursive,
}

pub trait TemplateSource: fmt::Debug + Send + Sync {
    /// Returns true when `dir` exists as a directory in this source.
    fn has_dir(&self, dir: &str) -> bool;

    /// Lists files below `dir` as paths relative to the source root, sorted.
    fn files(&self, dir: &str, depth: Depth) -> io::Result<Vec<String>>;

    fn read(&self, path: &str) -> io::Result<String>;
}

/// A template source registered under a name.
#[derive(Debug, Clone)]
pub struct NamedSource {
    name: String,
    source: Arc<dyn TemplateSource>,
}

impl NamedSource {
    pub fn new(name: impl Into<String>, source: impl TemplateSource + 'static) -> Self {
        Self {
            name: name.into(),
            source: Arc::new(source),
        }
    }

    pub fn from_arc(name: impl Into<String>, source: Arc<dyn TemplateSource>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        is_root(&self.name)
    }

    pub fn source(&self) -> &dyn TemplateSource {
        self.source.as_ref()
    }

    /// Human readable `source:path` label used in diagnostics.
    pub fn origin(&self, path: &str) -> String {
        if self.is_root() {
            path.to_string()
        } else {
            format!("{}:{path}", self.name)
        }
    }
}

/// A directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirSource {
    fn has_dir(&self, dir: &str) -> bool {
        self.root.join(dir).is_dir()
    }

    fn files(&self, dir: &str, depth: Depth) -> io::Result<Vec<String>> {
        let mut walker = WalkDir::new(self.root.join(dir))
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        if depth == Depth::Flat {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            files.push(slash_path(relative));
        }
        files.sort();
        Ok(files)
    }

    fn read(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(path))
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A tree compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedSource {
    dir: &'static Dir<'static>,
}

impl EmbeddedSource {
    pub fn new(dir: &'static Dir<'static>) -> Self {
        Self { dir }
    }

    /// The default tree shipped with the crate (`templates/`).
    pub fn builtin() -> Self {
        Self::new(&BUILTIN_TEMPLATES)
    }
}

impl TemplateSource for EmbeddedSource {
    fn has_dir(&self, dir: &str) -> bool {
        self.dir.get_dir(dir).is_some()
    }

    fn files(&self, dir: &str, depth: Depth) -> io::Result<Vec<String>> {
        let Some(start) = self.dir.get_dir(dir) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("embedded directory `{dir}` not found"),
            ));
        };

        let mut files = Vec::new();
        collect_embedded(start, depth, &mut files);
        files.sort();
        Ok(files)
    }

    fn read(&self, path: &str) -> io::Result<String> {
        let file = self.dir.get_file(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("embedded file `{path}` not found"),
            )
        })?;
        file.contents_utf8().map(str::to_string).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("embedded file `{path}` is not valid UTF-8"),
            )
        })
    }
}

fn collect_embedded(dir: &Dir<'_>, depth: Depth, files: &mut Vec<String>) {
    for entry in dir.entries() {
        match entry {
            DirEntry::File(file) => files.push(slash_path(file.path())),
            DirEntry::Dir(child) if depth == Depth::Recursive => {
                collect_embedded(child, depth, files)
            }
            DirEntry::Dir(_) => {}
        }
    }
}

/// An in-memory tree keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        let path = path.into();
        self.files
            .insert(path.trim_start_matches('/').to_string(), contents.into());
    }
}

impl TemplateSource for MemorySource {
    fn has_dir(&self, dir: &str) -> bool {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.files.keys().any(|path| path.starts_with(&prefix))
    }

    fn files(&self, dir: &str, depth: Depth) -> io::Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .files
            .keys()
            .filter(|path| match path.strip_prefix(&prefix) {
                Some(rest) => depth == Depth::Recursive || !rest.contains('/'),
                None => false,
            })
            .cloned()
            .collect())
    }

    fn read(&self, path: &str) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("`{path}` not found"))
        })
    }
}
