pub mod aggregate;
pub mod cli;
pub mod config;
pub mod csp;
pub mod discover;
pub mod error;
pub mod extract;
pub mod headers;
pub mod html;
pub mod path;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::{error, info, warn};

use aggregate::split_to_global_and_local;
use config::Config;
use discover::{exclude_patterns, find_html_files};
use error::{Error, Result};
use extract::{FileProcessor, HeaderRecord};
use headers::{WriteOutcome, append_headers, headers_path, render_headers};
use routes::{RegistrationReport, RouteRegistrar, derive_routes};

/// What a run did.
#[derive(Debug)]
pub struct RunReport {
    pub discovered: usize,
    pub processed: usize,
    /// Documents that could not be read, rewritten or classified.
    pub skipped: Vec<(PathBuf, Error)>,
    /// Document rewrites and the headers append that failed.
    pub failed_writes: Vec<WriteOutcome>,
    pub headers_file: PathBuf,
    pub header_blocks: usize,
    /// Present when route registration was configured.
    pub routes: Option<Result<RegistrationReport>>,
}

impl RunReport {
    pub fn routes_failed(&self) -> bool {
        matches!(self.routes, Some(Err(_)))
    }
}

enum FileOutcome {
    Processed {
        record: HeaderRecord,
        write: WriteOutcome,
    },
    Skipped(PathBuf, Error),
}

/// Read, rewrite and classify one document, then write the rewritten
/// markup back in place.
async fn process_file(processor: &FileProcessor, path: PathBuf) -> FileOutcome {
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) => {
            let e = Error::io(&path, e);
            return FileOutcome::Skipped(path, e);
        }
    };

    let processed = match processor.process(&path, &raw) {
        Ok(processed) => processed,
        Err(e) => return FileOutcome::Skipped(path, e),
    };

    let result = tokio::fs::write(&processed.path, processed.html.as_bytes())
        .await
        .map_err(|e| Error::io(&processed.path, e));

    FileOutcome::Processed {
        record: processed.record,
        write: WriteOutcome {
            path: processed.path,
            result,
        },
    }
}

/// Run the whole pipeline for one build directory.
///
/// Only configuration errors are returned as `Err`. Per-document and
/// per-write failures are logged and collected in the report.
pub async fn run(config: &Config) -> Result<RunReport> {
    let start = Instant::now();

    let exclude = exclude_patterns(&config.exclude)?;
    let paths = find_html_files(&config.build_dir, &exclude);

    let processor = Arc::new(FileProcessor::new(
        config.build_dir.clone(),
        config.disable_generated_policies.clone(),
    ));

    // `buffered` yields in input order, which keeps the fold below (and the
    // headers file) deterministic.
    let outcomes: Vec<FileOutcome> = futures::stream::iter(paths.iter().cloned())
        .map(|path| {
            let processor = Arc::clone(&processor);
            let task_path = path.clone();
            async move {
                match tokio::spawn(async move { process_file(&processor, task_path).await }).await
                {
                    Ok(outcome) => outcome,
                    Err(e) => FileOutcome::Skipped(path, Error::markup(e)),
                }
            }
        })
        .buffered(config.concurrency)
        .collect()
        .await;

    let mut records = Vec::with_capacity(outcomes.len());
    let mut skipped = Vec::new();
    let mut failed_writes = Vec::new();
    for outcome in outcomes {
        match outcome {
            FileOutcome::Processed { record, write } => {
                if let Err(e) = &write.result {
                    warn!(error = %e, "Failed to write rewritten document");
                    failed_writes.push(write);
                }
                records.push(record);
            }
            FileOutcome::Skipped(path, e) => {
                warn!(path = %path.display(), error = %e, "Skipping document");
                skipped.push((path, e));
            }
        }
    }
    let processed = records.len();

    let ordered = split_to_global_and_local(records).into_ordered();
    let text = render_headers(
        &ordered,
        &config.policies,
        &config.disable_policies,
        &config.extra_headers,
    );

    let headers_file = headers_path(&config.build_dir);
    let append = append_headers(&headers_file, &text);
    if let Err(e) = &append.result {
        warn!(error = %e, "Failed to append headers file");
        failed_writes.push(append);
    }

    let routes = match &config.cloudflare {
        Some(cf) => {
            let patterns = derive_routes(cf.strategy, &cf.host, &config.build_dir, &paths, &ordered);
            let result = RouteRegistrar::new(cf.clone()).register(&patterns).await;
            if let Err(e) = &result {
                error!(error = %e, "Route registration failed");
            }
            Some(result)
        }
        None => None,
    };

    info!(
        "Saved at {} - {:.2} seconds",
        headers_file.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(RunReport {
        discovered: paths.len(),
        processed,
        skipped,
        failed_writes,
        headers_file,
        header_blocks: ordered.len() + config.extra_headers.len(),
        routes,
    })
}
