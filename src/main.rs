use clap::Parser;
use csp_headers::cli::{Args, init_logging, load_config};
use csp_headers::run;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(config) = load_config(&args) else {
        std::process::exit(1);
    };

    let report = match run(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Run failed");
            std::process::exit(1);
        }
    };

    if !report.failed_writes.is_empty() || !report.skipped.is_empty() {
        warn!(
            failed_writes = report.failed_writes.len(),
            skipped = report.skipped.len(),
            "Completed with errors"
        );
    }

    info!(
        processed = report.processed,
        discovered = report.discovered,
        blocks = report.header_blocks,
        "Done"
    );

    if report.routes_failed() {
        std::process::exit(1);
    }
}
