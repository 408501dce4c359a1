use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    backoff::RetryPolicy,
    coordinator::SubmissionCoordinator,
    note_store::MongoNoteStore,
    object_store::S3ObjectStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting note-board with config: {:?}", cfg);

    // --- Bring up both stores; nothing is served until both answer ---
    let policy = RetryPolicy::default();
    let (notes, objects) = tokio::join!(
        MongoNoteStore::connect(&cfg.mongo_url, &policy),
        S3ObjectStore::connect(&cfg.object_store, &policy),
    );
    let notes = notes?;
    let objects = objects?;

    // --- Initialize coordinator ---
    let coordinator = SubmissionCoordinator::new(Arc::new(notes), Arc::new(objects));

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(coordinator);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("App listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
