use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the trellis binary.
#[derive(Debug, Parser)]
#[command(name = "trellis", version, about = "Layered template server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TRELLIS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve every page of the configured template sources over HTTP.
    Serve(Box<ServeArgs>),
    /// Build the template catalog and list its pages.
    Check(CheckArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub templates: TemplateOverrides,
}

/// A `NAME=PATH` template source given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArg {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct TemplateOverrides {
    /// Template source as NAME=PATH; repeat for several sources. Use `-` for the root source.
    #[arg(
        long = "source",
        value_name = "NAME=PATH",
        value_parser = parse_source_arg,
        allow_hyphen_values = true
    )]
    pub sources: Vec<SourceArg>,

    /// Override the layout used when a response does not pick one.
    #[arg(long = "templates-base-layout", value_name = "NAME")]
    pub base_layout: Option<String>,

    /// Override the layout used for the system error page.
    #[arg(long = "templates-system-layout", value_name = "NAME")]
    pub system_layout: Option<String>,

    /// Override the template file extension.
    #[arg(long = "templates-extension", value_name = "EXT")]
    pub extension: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub templates: TemplateOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Expose `POST /_templates/reload`.
    #[arg(
        long = "server-enable-reload",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub enable_reload: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

pub(super) fn parse_source_arg(value: &str) -> Result<SourceArg, String> {
    let (name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got `{value}`"))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(format!("source `{name}` has an empty path"));
    }
    Ok(SourceArg {
        name: name.trim().to_string(),
        path: PathBuf::from(path),
    })
}
