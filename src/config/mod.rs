//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{collections::BTreeSet, net::SocketAddr, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer, de};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{CheckArgs, CliArgs, Command, ServeArgs, ServeOverrides, SourceArg, TemplateOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "trellis";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const ENV_PREFIX: &str = "TRELLIS";
const ENV_SOURCES_KEY: &str = "templates.sources";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub templates: TemplateSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub enable_reload: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Template catalog settings. `None` fields fall back to the template defaults.
#[derive(Debug, Clone, Default)]
pub struct TemplateSettings {
    pub base_layout: Option<String>,
    pub system_layout: Option<String>,
    pub extension: Option<String>,
    pub sources: Vec<SourceSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSettings {
    pub name: String,
    pub path: PathBuf,
}

impl From<SourceArg> for SourceSettings {
    fn from(source: SourceArg) -> Self {
        Self {
            name: source.name,
            path: source.path,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(environment());

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Check(args)) => raw.apply_template_overrides(&args.templates),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// `TRELLIS__SECTION__KEY` variables. `TRELLIS__TEMPLATES__SOURCES` takes a
/// comma-separated list of `NAME=PATH` entries.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key(ENV_SOURCES_KEY)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    templates: RawTemplateSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(enabled) = overrides.enable_reload {
            self.server.enable_reload = Some(enabled);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_template_overrides(&overrides.templates);
    }

    fn apply_template_overrides(&mut self, overrides: &TemplateOverrides) {
        if let Some(layout) = overrides.base_layout.as_ref() {
            self.templates.base_layout = Some(layout.clone());
        }
        if let Some(layout) = overrides.system_layout.as_ref() {
            self.templates.system_layout = Some(layout.clone());
        }
        if let Some(extension) = overrides.extension.as_ref() {
            self.templates.extension = Some(extension.clone());
        }
        if !overrides.sources.is_empty() {
            self.templates.sources = Some(
                overrides
                    .sources
                    .iter()
                    .cloned()
                    .map(SourceSettings::from)
                    .collect(),
            );
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            templates,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let templates = build_template_settings(templates)?;

        Ok(Self {
            server,
            logging,
            templates,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings {
        addr,
        enable_reload: server.enable_reload.unwrap_or(false),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_template_settings(templates: RawTemplateSettings) -> Result<TemplateSettings, LoadError> {
    let base_layout = non_blank(templates.base_layout, "templates.base_layout")?;
    let system_layout = non_blank(templates.system_layout, "templates.system_layout")?;
    let extension = non_blank(templates.extension, "templates.extension")?;

    let sources = templates.sources.unwrap_or_default();
    let mut seen = BTreeSet::new();
    for source in &sources {
        if source.name.contains(':') {
            return Err(LoadError::invalid(
                "templates.sources",
                format!("source name `{}` must not contain `:`", source.name),
            ));
        }
        if source.path.as_os_str().is_empty() {
            return Err(LoadError::invalid(
                "templates.sources",
                format!("source `{}` has an empty path", source.name),
            ));
        }
        if !seen.insert(source.name.as_str()) {
            return Err(LoadError::invalid(
                "templates.sources",
                format!("source `{}` is listed more than once", source.name),
            ));
        }
    }

    Ok(TemplateSettings {
        base_layout,
        system_layout,
        extension,
        sources,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    enable_reload: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTemplateSettings {
    base_layout: Option<String>,
    system_layout: Option<String>,
    extension: Option<String>,
    #[serde(deserialize_with = "deserialize_sources")]
    sources: Option<Vec<SourceSettings>>,
}

/// Sources are tables in files and `NAME=PATH` strings in the environment.
fn deserialize_sources<'de, D>(deserializer: D) -> Result<Option<Vec<SourceSettings>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSource {
        Table(SourceSettings),
        Inline(String),
    }

    let Some(entries) = Option::<Vec<RawSource>>::deserialize(deserializer)? else {
        return Ok(None);
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            RawSource::Table(source) => Some(Ok(source)),
            RawSource::Inline(text) if text.trim().is_empty() => None,
            RawSource::Inline(text) => Some(
                cli::parse_source_arg(text.trim())
                    .map(SourceSettings::from)
                    .map_err(de::Error::custom),
            ),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>, key: &'static str) -> Result<Option<String>, LoadError> {
    match value {
        Some(value) if value.trim().is_empty() => {
            Err(LoadError::invalid(key, "must not be empty"))
        }
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
