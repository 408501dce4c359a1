//! HTTP handlers for notes and attachments.
//! Turns requests into `Submission`s and streams attachment bodies back
//! without buffering; everything else is the coordinator's job.

use crate::{
    errors::AppError,
    models::{attachment::Attachment, note::RenderedNote},
    services::coordinator::{Submission, SubmissionCoordinator, SubmissionOutcome},
};
use axum::{
    Form, Json,
    body::Body,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Page model consumed by whatever renders the index view.
#[derive(Debug, Serialize)]
pub struct NotesPage {
    pub notes: Vec<RenderedNote>,
    /// Preview content to pre-fill the editor with, after an upload.
    pub content: Option<String>,
}

/// Fields accepted from a url-encoded `POST /note` (no attachment possible).
#[derive(Debug, Deserialize)]
pub struct NoteForm {
    pub description: Option<String>,
    pub upload: Option<String>,
}

/// `GET /` -> every note, newest first, rendered to HTML.
pub async fn list_notes(
    State(coordinator): State<SubmissionCoordinator>,
) -> Result<Json<NotesPage>, AppError> {
    let notes = coordinator.list_rendered().await?;
    Ok(Json(NotesPage {
        notes,
        content: None,
    }))
}

/// `POST /note` -> save a note, or stage an attachment and return a preview.
pub async fn submit_note(
    State(coordinator): State<SubmissionCoordinator>,
    request: Request,
) -> Result<Response, AppError> {
    let submission = read_submission(request).await?;

    match coordinator.submit(submission).await? {
        SubmissionOutcome::Stored => Ok(Redirect::to("/").into_response()),
        SubmissionOutcome::Preview { content } => {
            let notes = coordinator.list_rendered().await?;
            let page = NotesPage {
                notes,
                content: Some(content),
            };
            Ok((StatusCode::OK, Json(page)).into_response())
        }
    }
}

/// `GET /img/{name}` -> stream an attachment with the content type it was
/// uploaded with. The path extractor has already percent-decoded `name`.
pub async fn get_attachment(
    State(coordinator): State<SubmissionCoordinator>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let object = coordinator.fetch_attachment(&name).await?;

    let content_type = object
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let mut response = Response::new(Body::from_stream(object.body));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    Ok(response)
}

async fn read_submission(request: Request) -> Result<Submission, AppError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        let Form(form) = Form::<NoteForm>::from_request(request, &()).await?;
        return Ok(Submission {
            description: form.description,
            upload: form.upload.as_deref().is_some_and(is_truthy),
            file: None,
        });
    }

    let mut multipart = Multipart::from_request(request, &()).await?;

    let mut submission = Submission::default();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "description" => submission.description = Some(field.text().await?),
            "upload" => submission.upload = is_truthy(&field.text().await?),
            "file" | "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                // Browsers send an empty, nameless part when no file was picked.
                if !filename.is_empty() {
                    let attachment = Attachment::new(filename, bytes);
                    submission.file = Some(match content_type {
                        Some(content_type) => attachment.with_content_type(content_type),
                        None => attachment,
                    });
                }
            }
            other => debug!("Ignoring form field `{}`", other),
        }
    }
    Ok(submission)
}

/// Form checkbox semantics: present and not an explicit "off" value.
fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && !["false", "0", "off", "no"]
            .iter()
            .any(|falsy| falsy.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values() {
        for on in ["true", "on", "1", "yes", "TRUE"] {
            assert!(is_truthy(on), "{}", on);
        }
        for off in ["", "  ", "false", "0", "off", "No"] {
            assert!(!is_truthy(off), "{:?}", off);
        }
    }
}
