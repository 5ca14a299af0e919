use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod error;
mod model;
mod query;
mod report;
mod store;
mod telemetry;

use config::Config;
use report::render;
use store::{MemoryStore, MongoStore, PostStore};
use telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_env();

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        backend = %config.store_backend,
        database = %config.database,
        collection = %config.collection,
        environment = %config.environment,
        "Starting post-metrics-report"
    );

    let store: Arc<dyn PostStore> = match config.store_backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        _ => Arc::new(
            MongoStore::connect(&config.mongodb_uri, &config.database, &config.collection).await?,
        ),
    };

    let run = report::run_report(store.as_ref()).await;

    let rendered = match config.output.as_str() {
        "json" => render::render_json(&run),
        _ => render::render_text(&run),
    };
    println!("{rendered}");

    let exit = if run.succeeded() {
        tracing::info!(steps = run.results.len(), "Report finished");
        ExitCode::SUCCESS
    } else {
        tracing::error!(
            completed = run.results.len(),
            failed = run.failures.len() + usize::from(run.aborted.is_some()),
            "Report finished with failures"
        );
        ExitCode::FAILURE
    };

    telemetry_guard.shutdown();

    Ok(exit)
}
