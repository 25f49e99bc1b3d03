// Bitbucket Pipelines MCP Service entry point
// Serves the REST API and /mcp dispatch over HTTP, the MCP protocol over
// stdio, or both, depending on MCP_TRANSPORT
use actix_web::{web, HttpServer};
use anyhow::{Context, Result};
use bitbucket_pipelines_mcp::{
    api::{self, AppState},
    config::{LogFormat, ServiceConfig, Transport},
    McpServer, PipelineService, ToolRegistry,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout belongs to the stdio transport
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Panics leave the process in an unknown state; log and exit.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        error!(panic = %panic, "Fatal panic, shutting down");
        std::process::exit(1);
    }));
}

async fn run_http(config: &ServiceConfig, state: web::Data<AppState>) -> std::io::Result<()> {
    info!(host = %config.host, port = config.port, "Starting HTTP server");
    info!("Health check available at http://{}:{}/health", config.host, config.port);

    HttpServer::new(move || api::app(state.clone()))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = ServiceConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or(LogFormat::Text),
    );
    install_panic_hook();

    let config = config.map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    info!(
        api_url = %config.api_url,
        workspace = %config.workspace,
        repo_slug = %config.repo_slug,
        transport = ?config.transport,
        "Starting Bitbucket Pipelines MCP service"
    );

    let service = PipelineService::from_config(&config)?;
    let state = web::Data::new(AppState::new(service.clone(), config.access_token.clone()));

    match config.transport {
        Transport::Http => run_http(&config, state).await.context("HTTP server failed")?,
        Transport::Stdio => McpServer::new(ToolRegistry::new(service)).run().await?,
        Transport::Both => {
            let server = McpServer::new(ToolRegistry::new(service));
            let stdio = actix_web::rt::spawn(async move {
                match server.run().await {
                    Ok(()) => warn!("MCP stdio transport finished"),
                    Err(e) => error!(error = %e, "MCP stdio transport failed"),
                }
            });
            // HTTP keeps serving after stdin closes
            let result = run_http(&config, state).await;
            stdio.abort();
            result.context("HTTP server failed")?;
        }
    }

    info!("Shutting down");
    Ok(())
}
