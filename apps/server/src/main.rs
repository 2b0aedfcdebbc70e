#![warn(clippy::all, clippy::pedantic)]

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use healthwatch::HealthService;
use healthwatch::config::{Config, LogFormat};
use tracing::info;

mod error;
mod routes;
mod views;

use error::AppError;
use logger::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "healthwatch", version, about = "Polls HTTP endpoints and alerts when they go down")]
struct Cli {
    /// Path to the TOML config, created with defaults when missing
    #[arg(short, long, env = "HEALTHWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_config(cli.config.as_deref())?;
    if cli.print_config {
        println!("{config}");
        return Ok(());
    }

    init_tracing(config.logging.format.map(|format| match format {
        LogFormat::Compact => logger::LogFormat::Compact,
        LogFormat::Json => logger::LogFormat::Json,
    }));

    let ip: IpAddr = config.server.bind.parse()?;
    run_server(&config, SocketAddr::new(ip, config.server.port)).await
}

async fn run_server(config: &Config, addr: SocketAddr) -> Result<(), AppError> {
    let service = web::Data::new(HealthService::from_config(config).await?);
    info!(targets = service.targets().await.len(), "Health service ready");

    let scheduler = service.scheduler(config.monitor.check_interval()).spawn();

    let app_service = service.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_service.clone())
            .app_data(routes::json_config())
            .configure(routes::routes)
    })
    .bind(addr)?;

    info!(%addr, "HTTP server listening");
    let served = server.run().await;

    info!("Stopping monitoring scheduler");
    scheduler.shutdown().await;

    served?;
    Ok(())
}
