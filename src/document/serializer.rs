use crate::document::model::Document;
use crate::error::Result;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Encoded request body, ready for a [`crate::transport::Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

pub trait Serializer: Send + Sync {
    fn serialize(&self, document: &Document) -> Result<Payload>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, document: &Document) -> Result<Payload> {
        Ok(Payload {
            body: serde_json::to_vec(document)?,
            content_type: JSON_CONTENT_TYPE,
        })
    }
}
