mod cli;

use crate::cli::Cli;
use anyhow::Result;
use clap::Parser;
use mongoseed::{DocumentWriter, ImportResult, MemoryWriter, MongoWriter, ReadingOptions, Seeder};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.quiet);

    let config = args.seeder_config();
    let options = args.reading_options();

    // A dry run never touches the database, so it gets the in-memory backend.
    let result = if config.dry_run {
        run(Seeder::new(config, MemoryWriter::new()), &args.data, &options).await?
    } else {
        let uri = config.database.resolved_uri();
        let writer = MongoWriter::connect(&uri, &config.database.name).await?;
        run(Seeder::new(config, writer), &args.data, &options).await?
    };

    report(&result);
    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run<W: DocumentWriter>(
    seeder: Seeder<W>,
    data: &str,
    options: &ReadingOptions,
) -> Result<ImportResult> {
    let cancel = seeder.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight batches");
            cancel.cancel();
        }
    });

    let result = seeder.seed(Path::new(data), options).await?;
    Ok(result)
}

fn report(result: &ImportResult) {
    for collection in &result.collections {
        info!(
            "{}: {} written, {} failed, {} skipped",
            collection.name, collection.written, collection.failed, collection.skipped
        );
    }
    for failure in &result.failures {
        match &failure.path {
            Some(path) => error!(
                "[{}] {}: {}",
                failure.collection,
                path.display(),
                failure.reason
            ),
            None => error!("[{}] {}", failure.collection, failure.reason),
        }
    }
    info!(
        "imported {} document(s), {} failure(s)",
        result.total_written(),
        result.failures.len()
    );
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "mongoseed=warn" } else { "mongoseed=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}
