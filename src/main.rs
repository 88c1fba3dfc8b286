use clap::Parser;
use dbcollect::backend::mysql::MySqlConnector;
use dbcollect::backend::postgres::PostgresConnector;
use dbcollect::cli::Cli;
use dbcollect::config::{self, ConnectionSettings, DatabaseKind};
use dbcollect::error::CollectorError;
use dbcollect::output::{self, CsvFileWriter};
use dbcollect::run::{self, RunReport};
use dbcollect::{logging, masking};
use std::process;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    // Load .env before parsing so it can feed clap's env fallbacks
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = dotenv {
        warn!(error = %e, ".env file not found or could not be loaded");
    }

    if let Err(err) = collect(&cli).await {
        output::print_error(&err);
        process::exit(1);
    }
}

async fn collect(cli: &Cli) -> Result<(), CollectorError> {
    let job = config::load_job_or_default(&cli.workload);
    info!(
        workload = %cli.workload.display(),
        workers = job.workers,
        targets = ?job.targets,
        query = %job.query,
        output_dir = %job.output.directory.display(),
        output_file = %job.output.file_name,
        "loaded workload configuration"
    );

    let settings = ConnectionSettings::from_env()?;
    job.validate()?;
    info!(
        connection = %masking::connection_summary(&settings, cli.show_secrets),
        "connection settings"
    );

    let writer = CsvFileWriter::new(job.output.clone());
    let report = match settings.kind {
        DatabaseKind::MySql => {
            run::run(&job, Arc::new(MySqlConnector::new(settings)), &writer).await?
        }
        DatabaseKind::Postgres => {
            run::run(&job, Arc::new(PostgresConnector::new(settings)), &writer).await?
        }
    };

    log_report(&report);
    Ok(())
}

fn log_report(report: &RunReport) {
    if let Some(ref path) = report.path {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.clone());
        info!(
            path = %absolute.display(),
            rows = report.rows,
            "aggregated data written"
        );
    }
    info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        failed = report.failed,
        targets = report.targets,
        "process completed"
    );
}
