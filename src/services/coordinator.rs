//! Submission flows over the document store and the object store.
//!
//! - Attachment submissions stage the file in the object store and hand back
//!   a preview string. They never touch the document store.
//! - Plain submissions append a note to the document store.
//! - Empty submissions are dropped silently.
//!
//! The two stores are never written together. An upload that is never
//! followed by a note leaves an unreferenced object behind.

use crate::{
    models::{
        attachment::Attachment,
        note::{Note, RenderedNote},
    },
    services::{
        note_store::{NoteStore, NoteStoreError},
        object_store::{ATTACHMENT_BUCKET, ObjectStore, ObjectStoreError, StoredObject},
        renderer::{attachment_link, compose_attachment_content, render_markdown},
    },
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// One `POST /note` request, already pulled out of the transport.
#[derive(Clone, Debug, Default)]
pub struct Submission {
    pub description: Option<String>,
    pub upload: bool,
    pub file: Option<Attachment>,
}

/// Terminal outcome of a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Attachment stored; composed content awaiting resubmission as a note.
    Preview { content: String },
    /// Note persisted, or nothing to do.
    Stored,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("attachment `{0}` not found")]
    AttachmentNotFound(String),
    #[error(transparent)]
    Notes(#[from] NoteStoreError),
    #[error(transparent)]
    Objects(ObjectStoreError),
}

impl From<ObjectStoreError> for SubmissionError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound { name, .. } => SubmissionError::AttachmentNotFound(name),
            other => SubmissionError::Objects(other),
        }
    }
}

pub type SubmissionResult<T> = Result<T, SubmissionError>;

/// Which flow a submission takes.
enum Route<'a> {
    Attach {
        description: &'a str,
        file: &'a Attachment,
    },
    Save(&'a str),
    Ignore,
}

fn classify(submission: &Submission) -> Route<'_> {
    let description = submission.description.as_deref().unwrap_or("");
    match (&submission.file, submission.upload) {
        (Some(file), true) => Route::Attach { description, file },
        _ if !description.trim().is_empty() => Route::Save(description),
        _ => Route::Ignore,
    }
}

/// Holds the long-lived store handles shared by every request.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    notes: Arc<dyn NoteStore>,
    objects: Arc<dyn ObjectStore>,
    bucket: String,
}

impl SubmissionCoordinator {
    pub fn new(notes: Arc<dyn NoteStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            notes,
            objects,
            bucket: ATTACHMENT_BUCKET.to_string(),
        }
    }

    pub fn notes(&self) -> &dyn NoteStore {
        self.notes.as_ref()
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Handle one submission. See the module docs for the flows.
    pub async fn submit(&self, submission: Submission) -> SubmissionResult<SubmissionOutcome> {
        match classify(&submission) {
            Route::Attach { description, file } => {
                self.objects
                    .put_object(
                        &self.bucket,
                        &file.name,
                        file.bytes.clone(),
                        file.content_type.as_deref(),
                    )
                    .await?;
                info!(
                    name = %file.name,
                    size = file.bytes.len(),
                    content_type = file.content_type.as_deref().unwrap_or("-"),
                    "Staged attachment"
                );
                let content = compose_attachment_content(description, &attachment_link(&file.name));
                Ok(SubmissionOutcome::Preview { content })
            }
            Route::Save(description) => {
                self.notes.insert_note(Note::new(description)).await?;
                info!("Stored note ({} bytes)", description.len());
                Ok(SubmissionOutcome::Stored)
            }
            Route::Ignore => {
                debug!("Dropping submission without attachment or description");
                Ok(SubmissionOutcome::Stored)
            }
        }
    }

    /// Every note, most recent first, rendered to HTML.
    pub async fn list_rendered(&self) -> SubmissionResult<Vec<RenderedNote>> {
        let notes = self.notes.list_notes().await?;
        Ok(notes
            .into_iter()
            .rev()
            .map(|note| RenderedNote {
                description: render_markdown(&note.description),
            })
            .collect())
    }

    /// Stream an attachment by its decoded name, along with the content type
    /// it was uploaded with.
    pub async fn fetch_attachment(&self, name: &str) -> SubmissionResult<StoredObject> {
        Ok(self.objects.get_object(&self.bucket, name).await?)
    }
}
