//! Helper functions and filters available inside every template.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use heck::{ToKebabCase, ToLowerCamelCase, ToPascalCase, ToSnakeCase};
use tera::{Filter, Function, Result, Tera, Value};

use super::catalog::lookup_name;

/// Named template helpers. Later registrations replace earlier ones.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    functions: BTreeMap<String, Arc<dyn Function>>,
    filters: BTreeMap<String, Arc<dyn Filter>>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Helpers registered for every catalog unless overridden.
    pub fn builtin() -> Self {
        Self::new()
            .filter("snake_case", snake_case)
            .filter("pascal_case", pascal_case)
            .filter("camel_case", camel_case)
            .filter("kebab_case", kebab_case)
    }

    pub fn function<F: Function + 'static>(mut self, name: impl Into<String>, function: F) -> Self {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    pub fn filter<F: Filter + 'static>(mut self, name: impl Into<String>, filter: F) -> Self {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    /// Merge `other` into `self`; entries from `other` win on name collision.
    pub fn merge(mut self, other: HelperRegistry) -> Self {
        self.functions.extend(other.functions);
        self.filters.extend(other.filters);
        self
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub(crate) fn apply(&self, tera: &mut Tera) {
        for (name, function) in &self.functions {
            tera.register_function(name, SharedFunction(Arc::clone(function)));
        }
        for (name, filter) in &self.filters {
            tera.register_filter(name, SharedFilter(Arc::clone(filter)));
        }
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

struct SharedFunction(Arc<dyn Function>);

impl Function for SharedFunction {
    fn call(&self, args: &HashMap<String, Value>) -> Result<Value> {
        self.0.call(args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

struct SharedFilter(Arc<dyn Filter>);

impl Filter for SharedFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> Result<Value> {
        self.0.filter(value, args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

/// `page_name(path=...)`: the page a request path resolves to.
pub(crate) fn page_name_function(extension: String) -> impl Function {
    move |args: &HashMap<String, Value>| -> Result<Value> {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("page_name expects a `path` string argument"))?;
        Ok(Value::String(lookup_name(path, &extension)))
    }
}

fn snake_case(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("snake_case filter expects a string"))?;
    Ok(Value::String(s.to_snake_case()))
}

fn pascal_case(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("pascal_case filter expects a string"))?;
    Ok(Value::String(s.to_pascal_case()))
}

fn camel_case(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("camel_case filter expects a string"))?;
    Ok(Value::String(s.to_lower_camel_case()))
}

fn kebab_case(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("kebab_case filter expects a string"))?;
    Ok(Value::String(s.to_kebab_case()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera::Context;

    fn render(registry: &HelperRegistry, source: &str) -> Result<String> {
        let mut tera = Tera::default();
        registry.apply(&mut tera);
        tera.add_raw_template("inline", source)?;
        tera.render("inline", &Context::new())
    }

    #[test]
    fn builtin_case_filters() {
        let registry = HelperRegistry::builtin();
        assert_eq!(
            render(&registry, "{{ 'ProcessPayment' | snake_case }}").unwrap(),
            "process_payment"
        );
        assert_eq!(
            render(&registry, "{{ 'process_payment' | pascal_case }}").unwrap(),
            "ProcessPayment"
        );
        assert_eq!(
            render(&registry, "{{ 'process_payment' | camel_case }}").unwrap(),
            "processPayment"
        );
        assert_eq!(
            render(&registry, "{{ 'ProcessPayment' | kebab_case }}").unwrap(),
            "process-payment"
        );
    }

    #[test]
    fn filter_rejects_non_string() {
        let registry = HelperRegistry::builtin();
        assert!(render(&registry, "{{ 42 | snake_case }}").is_err());
    }

    #[test]
    fn caller_helpers_win_on_collision() {
        let caller = HelperRegistry::new()
            .filter("snake_case", |_: &Value, _: &HashMap<String, Value>| -> Result<Value> {
                Ok(Value::String("overridden".into()))
            })
            .function("greeting", |_: &HashMap<String, Value>| -> Result<Value> {
                Ok(Value::String("hello".into()))
            });
        let registry = HelperRegistry::builtin().merge(caller);

        assert_eq!(
            render(&registry, "{{ 'AnyThing' | snake_case }}").unwrap(),
            "overridden"
        );
        assert_eq!(render(&registry, "{{ greeting() }}").unwrap(), "hello");
        assert_eq!(registry.function_names().collect::<Vec<_>>(), vec!["greeting"]);
        assert_eq!(registry.filter_names().count(), 4);
    }

    #[test]
    fn page_name_function_normalizes_paths() {
        let registry =
            HelperRegistry::new().function("page_name", page_name_function(".html".to_string()));
        assert_eq!(
            render(&registry, "{{ page_name(path='/docs/intro.html') }}").unwrap(),
            "docs/intro"
        );
        assert_eq!(render(&registry, "{{ page_name(path='/') }}").unwrap(), "home");
        assert!(render(&registry, "{{ page_name() }}").is_err());
    }
}
