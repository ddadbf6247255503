use std::path::Path;

use super::*;

#[test]
fn defaults_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
    assert!(!settings.server.enable_reload);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.templates.sources.is_empty());
    assert!(settings.templates.base_layout.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        enable_reload: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(settings.server.enable_reload);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn cli_sources_replace_configured_sources() {
    let mut raw = RawSettings::default();
    raw.templates.sources = Some(vec![SourceSettings {
        name: "-".to_string(),
        path: PathBuf::from("site"),
    }]);

    let overrides = TemplateOverrides {
        sources: vec![SourceArg {
            name: "blog".to_string(),
            path: PathBuf::from("blog-templates"),
        }],
        ..Default::default()
    };
    raw.apply_template_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.templates.sources,
        vec![SourceSettings {
            name: "blog".to_string(),
            path: PathBuf::from("blog-templates"),
        }]
    );
}

#[test]
fn empty_cli_sources_keep_configured_sources() {
    let mut raw = RawSettings::default();
    raw.templates.sources = Some(vec![SourceSettings {
        name: "-".to_string(),
        path: PathBuf::from("site"),
    }]);

    raw.apply_template_overrides(&TemplateOverrides::default());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.templates.sources.len(), 1);
}

#[test]
fn rejects_zero_port() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn rejects_bad_log_level() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn rejects_source_names_with_colon() {
    let mut raw = RawSettings::default();
    raw.templates.sources = Some(vec![SourceSettings {
        name: "a:b".to_string(),
        path: PathBuf::from("x"),
    }]);
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(err.to_string().contains("must not contain `:`"));
}

#[test]
fn rejects_duplicate_source_names() {
    let source = SourceSettings {
        name: "blog".to_string(),
        path: PathBuf::from("x"),
    };
    let mut raw = RawSettings::default();
    raw.templates.sources = Some(vec![source.clone(), source]);
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(err.to_string().contains("listed more than once"));
}

#[test]
fn rejects_blank_layout_names() {
    let mut raw = RawSettings::default();
    raw.templates.base_layout = Some("  ".to_string());
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(err, LoadError::Invalid { key: "templates.base_layout", .. }));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["trellis"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "trellis",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--server-enable-reload",
        "yes",
        "--source",
        "-=site",
        "--source",
        "blog=/srv/blog",
        "--templates-extension",
        "tmpl",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.enable_reload, Some(true));
            let names: Vec<_> = serve
                .overrides
                .templates
                .sources
                .iter()
                .map(|source| source.name.as_str())
                .collect();
            assert_eq!(names, ["-", "blog"]);
            assert_eq!(
                serve.overrides.templates.sources[1].path,
                Path::new("/srv/blog")
            );
            assert_eq!(serve.overrides.templates.extension.as_deref(), Some("tmpl"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_check_arguments() {
    let args = CliArgs::parse_from(["trellis", "check", "--source", "docs=./docs"]);

    match args.command.expect("check command") {
        Command::Check(check) => {
            assert_eq!(check.templates.sources[0].name, "docs");
            assert_eq!(check.templates.sources[0].path, Path::new("./docs"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn malformed_source_argument_is_rejected() {
    let result = CliArgs::try_parse_from(["trellis", "check", "--source", "no-equals-sign"]);
    assert!(result.is_err());
}

fn load_from_env(vars: &[(&str, &str)]) -> Result<Settings, LoadError> {
    let vars = vars
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<config::Map<_, _>>();
    let raw: RawSettings = Config::builder()
        .add_source(environment().source(Some(vars)))
        .build()?
        .try_deserialize()?;
    Settings::from_raw(raw)
}

#[test]
fn environment_lists_template_sources() {
    let settings = load_from_env(&[
        ("TRELLIS__TEMPLATES__SOURCES", "-=site, blog=/srv/blog"),
        ("TRELLIS__SERVER__PORT", "4000"),
        ("TRELLIS__SERVER__ENABLE_RELOAD", "true"),
    ])
    .expect("valid settings");

    assert_eq!(
        settings.templates.sources,
        vec![
            SourceSettings {
                name: "-".to_string(),
                path: PathBuf::from("site"),
            },
            SourceSettings {
                name: "blog".to_string(),
                path: PathBuf::from("/srv/blog"),
            },
        ]
    );
    assert_eq!(settings.server.addr.port(), 4000);
    assert!(settings.server.enable_reload);
}

#[test]
fn environment_accepts_a_single_source() {
    let settings = load_from_env(&[("TRELLIS__TEMPLATES__SOURCES", "docs=./docs")])
        .expect("valid settings");
    assert_eq!(settings.templates.sources.len(), 1);
    assert_eq!(settings.templates.sources[0].name, "docs");
}

#[test]
fn environment_rejects_malformed_sources() {
    let err = load_from_env(&[("TRELLIS__TEMPLATES__SOURCES", "no-equals-sign")]).unwrap_err();
    assert!(matches!(err, LoadError::Build(_)));
    assert!(err.to_string().contains("expected NAME=PATH"));
}
