//! In-memory stores for tests.

use crate::{
    models::note::Note,
    services::{
        note_store::{NoteStore, NoteStoreResult},
        object_store::{ObjectStore, ObjectStoreError, ObjectStoreResult, StoredObject},
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::{BTreeMap, HashMap},
    io,
    sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: Mutex<Vec<Note>>,
}

impl InMemoryNoteStore {
    pub fn len(&self) -> usize {
        self.notes.lock().unwrap().len()
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn insert_note(&self, note: Note) -> NoteStoreResult<()> {
        self.notes.lock().unwrap().push(note);
        Ok(())
    }

    async fn list_notes(&self) -> NoteStoreResult<Vec<Note>> {
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn ping(&self) -> NoteStoreResult<()> {
        Ok(())
    }
}

#[derive(Clone)]
struct StoredEntry {
    bytes: Bytes,
    content_type: Option<String>,
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    buckets: Mutex<BTreeMap<String, HashMap<String, StoredEntry>>>,
    policies: Mutex<Vec<(String, String)>>,
    /// When set, every put fails with this message.
    fail_puts: Option<String>,
    /// Policy writes left to reject before they start succeeding.
    policy_failures: AtomicU32,
    policy_failure_message: String,
}

impl InMemoryObjectStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        store
            .buckets
            .lock()
            .unwrap()
            .insert(bucket.to_string(), HashMap::new());
        store
    }

    pub fn failing_puts(mut self, message: &str) -> Self {
        self.fail_puts = Some(message.to_string());
        self
    }

    pub fn failing_policies(mut self, times: u32, message: &str) -> Self {
        self.policy_failures = AtomicU32::new(times);
        self.policy_failure_message = message.to_string();
        self
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.lock().unwrap().keys().cloned().collect()
    }

    pub fn policies(&self) -> Vec<(String, String)> {
        self.policies.lock().unwrap().clone()
    }

    pub fn object(&self, bucket: &str, name: &str) -> Option<Bytes> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(name).map(|entry| entry.bytes.clone()))
    }

    pub fn content_type(&self, bucket: &str, name: &str) -> Option<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(name))
            .and_then(|entry| entry.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> ObjectStoreResult<bool> {
        Ok(self.buckets.lock().unwrap().contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> ObjectStoreResult<()> {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> ObjectStoreResult<()> {
        let rejected = self
            .policy_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(ObjectStoreError::Upstream(self.policy_failure_message.clone()));
        }
        self.policies
            .lock()
            .unwrap()
            .push((bucket.to_string(), policy.to_string()));
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        name: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()> {
        if let Some(message) = &self.fail_puts {
            return Err(ObjectStoreError::Upstream(message.clone()));
        }
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::Upstream(format!("no such bucket `{}`", bucket)))?;
        objects.insert(
            name.to_string(),
            StoredEntry {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, name: &str) -> ObjectStoreResult<StoredObject> {
        let entry = self
            .buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(name).cloned())
            .ok_or_else(|| ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })?;
        // Two chunks so consumers have to reassemble.
        let bytes = entry.bytes;
        let split = bytes.len() / 2;
        let chunks = vec![
            Ok::<_, io::Error>(bytes.slice(..split)),
            Ok(bytes.slice(split..)),
        ];
        Ok(StoredObject {
            content_type: entry.content_type,
            body: Box::pin(futures::stream::iter(chunks)),
        })
    }
}
