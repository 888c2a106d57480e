use std::collections::HashMap;

use serde_json::Value;

use crate::error::DecodeError;
use crate::models::{ReportPackage, REPORT_TYPE_TAG};

/// Every message kind this node understands.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshMessage {
    PictureReport(ReportPackage),
}

impl MeshMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            MeshMessage::PictureReport(package) => package.type_tag,
        }
    }
}

pub type DecodeFn = fn(Value) -> Result<MeshMessage, DecodeError>;

/// Maps a message's `type` tag to the function that decodes it.
pub struct MessageRegistry {
    decoders: HashMap<u8, DecodeFn>,
}

impl Default for MessageRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(REPORT_TYPE_TAG, decode_picture_report);
        registry
    }
}

impl MessageRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Replaces any decoder already registered for `tag`.
    pub fn register(&mut self, tag: u8, decode: DecodeFn) {
        self.decoders.insert(tag, decode);
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<MeshMessage, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let tag = value
            .get("type")
            .and_then(Value::as_u64)
            .ok_or(DecodeError::MissingTag)?;
        let decode = u8::try_from(tag)
            .ok()
            .and_then(|tag| self.decoders.get(&tag))
            .ok_or(DecodeError::UnknownTag(tag))?;
        decode(value)
    }
}

fn decode_picture_report(value: Value) -> Result<MeshMessage, DecodeError> {
    Ok(MeshMessage::PictureReport(serde_json::from_value(value)?))
}
