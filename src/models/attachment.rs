use bytes::Bytes;

/// A binary attachment received with a submission, keyed by the
/// client-supplied filename.
#[derive(Clone, Debug)]
pub struct Attachment {
    pub name: String,
    pub bytes: Bytes,
    /// Media type declared by the client for this part, stored with the object.
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
