//! Defines routes for the note service.
//!
//! ## Structure
//! - `GET  /`            -> rendered note list, newest first
//! - `POST /note`        -> save a note, or stage an attachment for preview
//! - `GET  /img/{name}`  -> stream an attachment back
//! - `GET  /healthz`, `GET /readyz` -> health checks

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        note_handlers::{get_attachment, list_notes, submit_note},
    },
    services::coordinator::SubmissionCoordinator,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router.
///
/// The router carries the `SubmissionCoordinator` to all handlers;
/// `max_upload_bytes` caps request bodies (attachments included).
pub fn routes(max_upload_bytes: usize) -> Router<SubmissionCoordinator> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/", get(list_notes))
        .route("/note", post(submit_note))
        .route("/img/{name}", get(get_attachment))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
