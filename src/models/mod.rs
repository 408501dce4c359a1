//! Core data models for the note service.
//!
//! Notes are the only persisted records; attachments live as raw objects in
//! the attachment bucket and are referenced from note text by link.

pub mod attachment;
pub mod note;
