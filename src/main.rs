use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use trellis::{
    application::error::AppError,
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
    templates::{TemplateManager, TemplateOptions},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let templates = Arc::new(TemplateManager::new(TemplateOptions::from(
        &settings.templates,
    )));

    match command {
        config::Command::Serve(_) => run_serve(settings, templates).await,
        config::Command::Check(_) => run_check(&templates),
    }
}

async fn run_serve(
    settings: config::Settings,
    templates: Arc<TemplateManager>,
) -> Result<(), AppError> {
    templates.init()?;

    let state = HttpState {
        templates,
        enable_reload: settings.server.enable_reload,
    };
    serve_http(&settings, state).await
}

fn run_check(templates: &TemplateManager) -> Result<(), AppError> {
    templates.init()?;
    let catalog = templates.catalog();
    for page in catalog.page_names() {
        println!("{page}");
    }
    Ok(())
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        addr = %settings.server.addr,
        reload = settings.server.enable_reload,
        "serving templates"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
