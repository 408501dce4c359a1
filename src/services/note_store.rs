//! Document store client for the `notes` collection.

use crate::{
    models::note::Note,
    services::backoff::{RetryError, RetryPolicy, connect_with_retry},
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{Client, Collection, Database, bson::doc};
use thiserror::Error;
use tracing::debug;

/// Collection holding every note.
pub const NOTES_COLLECTION: &str = "notes";

/// Database used when the connection string does not name one.
const FALLBACK_DATABASE: &str = "dev";

#[derive(Debug, Error)]
pub enum NoteStoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

pub type NoteStoreResult<T> = Result<T, NoteStoreError>;

/// Operations the service needs from the document store.
///
/// Mid-life failures are returned to the caller; nothing here retries.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Append one note. No uniqueness constraint.
    async fn insert_note(&self, note: Note) -> NoteStoreResult<()>;

    /// Every stored note, in the store's insertion order.
    async fn list_notes(&self) -> NoteStoreResult<Vec<Note>>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> NoteStoreResult<()>;
}

/// MongoDB-backed note store.
#[derive(Clone, Debug)]
pub struct MongoNoteStore {
    database: Database,
    notes: Collection<Note>,
}

impl MongoNoteStore {
    /// Connect to MongoDB, retrying per `policy` until the server answers a ping.
    pub async fn connect(
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<Self, RetryError<NoteStoreError>> {
        connect_with_retry("MongoDB", policy, || Self::try_connect(url)).await
    }

    async fn try_connect(url: &str) -> NoteStoreResult<Self> {
        let client = Client::with_uri_str(url).await?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(FALLBACK_DATABASE));
        // The driver connects lazily; the ping forces a real round trip.
        database.run_command(doc! { "ping": 1 }).await?;
        debug!("Resolved collection {}.{}", database.name(), NOTES_COLLECTION);

        let notes = database.collection::<Note>(NOTES_COLLECTION);
        Ok(Self { database, notes })
    }
}

#[async_trait]
impl NoteStore for MongoNoteStore {
    async fn insert_note(&self, note: Note) -> NoteStoreResult<()> {
        self.notes.insert_one(note).await?;
        Ok(())
    }

    async fn list_notes(&self) -> NoteStoreResult<Vec<Note>> {
        let cursor = self.notes.find(doc! {}).await?;
        Ok(cursor.try_collect::<Vec<_>>().await?)
    }

    async fn ping(&self) -> NoteStoreResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
