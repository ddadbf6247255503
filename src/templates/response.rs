//! Per-request response description.

use std::{collections::BTreeMap, io};

use axum::http::{StatusCode, request::Parts};
use serde::Serialize;
use serde_json::{Map, Value};

use super::manager::{SYSTEM_ERROR_PAGE, TemplateManager};
use super::render::ResponseSink;

/// What to render and how. Created per request, consumed by [`render`](Self::render).
///
/// Setters never fail; the bound data and headers are validated at render time.
#[derive(Debug, Clone)]
pub struct PageResponse<'a> {
    manager: &'a TemplateManager,
    title: Option<String>,
    path: String,
    layout: Option<String>,
    status: StatusCode,
    headers: BTreeMap<String, String>,
    data: Result<Value, String>,
}

impl<'a> PageResponse<'a> {
    pub(crate) fn new(manager: &'a TemplateManager) -> Self {
        Self {
            manager,
            title: None,
            path: String::new(),
            layout: None,
            status: StatusCode::OK,
            headers: BTreeMap::new(),
            data: Ok(Value::Object(Map::new())),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Target page, e.g. `home`, `/docs/intro` or `blog:index`.
    pub fn page(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set a header; a later call with the same name replaces the value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Bind the data the layout executes against. Must serialize to an object.
    pub fn data<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        self.data = serde_json::to_value(data).map_err(|err| err.to_string());
        self
    }

    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn template_path(&self) -> &str {
        &self.path
    }

    /// Explicit layout, else the system layout for the system error page, else
    /// the base layout.
    pub fn template_layout(&self) -> &str {
        if let Some(layout) = self.layout.as_deref() {
            return layout;
        }
        if self.manager.page_name_for(&self.path) == SYSTEM_ERROR_PAGE {
            self.manager.system_layout()
        } else {
            self.manager.base_layout()
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn header_map(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub(crate) fn bound_data(&self) -> Result<&Map<String, Value>, String> {
        match &self.data {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null) => Err("bound data is null; expected an object".to_string()),
            Ok(other) => Err(format!(
                "bound data must serialize to an object, got {}",
                value_kind(other)
            )),
            Err(err) => Err(format!("failed to serialize bound data: {err}")),
        }
    }

    /// Render onto `sink`. Only a failure of the final body write is returned.
    pub fn render<S: ResponseSink + ?Sized>(self, sink: &mut S, request: &Parts) -> io::Result<()> {
        let manager = self.manager;
        manager.render(sink, request, &self)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
