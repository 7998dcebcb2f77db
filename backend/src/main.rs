mod config;
mod extraction;
mod inventory;
mod job_controller;
mod report;
mod services;

use crate::config::{Cli, Command};
use crate::inventory::control::{CancellationToken, RunControl};
use crate::inventory::Inventory;
use crate::job_controller::state::JobsState;
use crate::report::csv_sink::{CsvReportSink, ReportSink};
use crate::services::scan::ScanContext;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use common::model::report::ScanSummary;
use env_logger::Env;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;

fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    // The extraction client is blocking; it is built here, outside any runtime.
    let inventory = match cli.inventory(matches!(cli.command, Command::Serve { .. })) {
        Ok(inventory) => Arc::new(inventory),
        Err(e) => {
            error!("Configuration error: {}", e);
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Scan { root, output } => match scan_once(&inventory, &root, &output) {
            Ok(summary) => {
                println!("{}", serde_json::json!(summary));
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Scan failed: {}", e);
                println!("{}", serde_json::json!({ "error": e }));
                ExitCode::FAILURE
            }
        },
        Command::Serve {
            host,
            port,
            output_dir,
        } => {
            let result = actix_web::rt::System::new().block_on(serve(
                inventory.clone(),
                host,
                port,
                output_dir,
            ));
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Server error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn scan_once(inventory: &Inventory, root: &Path, output: &Path) -> Result<ScanSummary, String> {
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Interrupted, finishing in-flight extractions");
        handler_token.cancel();
    }) {
        warn!("Cannot install Ctrl-C handler: {}", e);
    }

    let control = RunControl::new().with_cancellation(cancel);
    let report = inventory.run(root, &control).map_err(|e| e.to_string())?;

    let mut sink = CsvReportSink::create(output).map_err(|e| e.to_string())?;
    sink.write_report(inventory.catalog(), &report.rows)
        .map_err(|e| e.to_string())?;
    info!("Report written to {}", output.display());
    Ok(report.summary(Some(output)))
}

async fn serve(
    inventory: Arc<Inventory>,
    host: String,
    port: u16,
    output_dir: PathBuf,
) -> std::io::Result<()> {
    // Initialize job controller state
    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState::new(tx);

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let ctx = ScanContext {
        inventory,
        output_dir,
    };

    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(ctx.clone()))
            .service(services::scan::configure_routes())
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
