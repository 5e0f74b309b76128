use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PAYLOAD_SEPARATOR;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("no metadata separator found in {0}-byte payload")]
    Framing(usize),
    #[error("metadata header is not valid JSON: {0}")]
    MetadataParse(String),
    #[error("metadata JSON contains a raw separator byte at offset {0}")]
    SentinelInMetadata(usize),
    #[error("failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Timestamps carried in the payload header, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub creation_time: f64,
    pub modification_time: f64,
}

/// Build `json(metadata) ++ 0x0A ++ archive`.
pub fn frame_payload(metadata: &FileMetadata, archive: &[u8]) -> Result<Vec<u8>, PayloadError> {
    let json = serde_json::to_vec(metadata)?;
    frame_payload_raw(&json, archive)
}

/// Frame an already-serialized metadata header.
///
/// The header may not contain the separator byte anywhere, including inside
/// JSON string values.
pub fn frame_payload_raw(metadata_json: &[u8], archive: &[u8]) -> Result<Vec<u8>, PayloadError> {
    if let Some(pos) = memchr::memchr(PAYLOAD_SEPARATOR, metadata_json) {
        return Err(PayloadError::SentinelInMetadata(pos));
    }

    let mut payload = Vec::with_capacity(metadata_json.len() + 1 + archive.len());
    payload.extend_from_slice(metadata_json);
    payload.push(PAYLOAD_SEPARATOR);
    payload.extend_from_slice(archive);
    Ok(payload)
}

/// Split a payload at the first separator byte into metadata and archive bytes.
///
/// Any header that does not deserialize into [`FileMetadata`] is reported as
/// [`PayloadError::MetadataParse`]: invalid UTF-8, malformed JSON, and
/// well-formed JSON that lacks `creation_time` or `modification_time` alike.
pub fn deframe_payload(payload: &[u8]) -> Result<(FileMetadata, &[u8]), PayloadError> {
    let pos = memchr::memchr(PAYLOAD_SEPARATOR, payload)
        .ok_or(PayloadError::Framing(payload.len()))?;

    let header = std::str::from_utf8(&payload[..pos])
        .map_err(|e| PayloadError::MetadataParse(e.to_string()))?;
    let metadata: FileMetadata =
        serde_json::from_str(header).map_err(|e| PayloadError::MetadataParse(e.to_string()))?;

    Ok((metadata, &payload[pos + 1..]))
}
