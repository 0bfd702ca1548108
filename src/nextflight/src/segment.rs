//! Segment assembly.
//!
//! Each extracted segment is a small tagged tuple `[tag, payload?]`. The
//! assembler reduces the ordered segment sequence to the list of buffer
//! chunks whose concatenation is the full record stream.
//!
//! Tags:
//! - 0 bootstrap: initializes the accumulation buffer
//! - 1 continuation: appends the string payload verbatim
//! - 2 form-state: decoded but discarded, kept only for index alignment
//! - 3 binary: base64 payload, decoded bytes appended as a chunk

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use thiserror::Error;

pub const TAG_BOOTSTRAP: i64 = 0;
pub const TAG_CONTINUATION: i64 = 1;
pub const TAG_FORM_STATE: i64 = 2;
pub const TAG_BINARY: i64 = 3;

/// Errors from segment assembly.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A payload segment arrived before the bootstrap segment.
    #[error("segment {position} used the buffer before a bootstrap segment initialized it")]
    BufferNotInitialized { position: usize },

    /// The segment's tag is not in the known set; the stream version is
    /// unsupported.
    #[error("unknown segment tag {tag} at segment {position}")]
    UnknownTag { tag: i64, position: usize },

    /// The segment is not a `[tag, payload?]` tuple of the expected types.
    #[error("malformed segment {position}: {detail}")]
    Malformed { position: usize, detail: String },

    /// A binary segment's payload is not valid base64.
    #[error("invalid base64 payload in segment {position}")]
    InvalidBase64 {
        position: usize,
        #[source]
        source: base64::DecodeError,
    },
}

fn malformed(position: usize, detail: impl Into<String>) -> SegmentError {
    SegmentError::Malformed {
        position,
        detail: detail.into(),
    }
}

/// Reduce an ordered segment sequence to the stream's buffer chunks.
pub fn assemble(segments: &[Value]) -> Result<Vec<Vec<u8>>, SegmentError> {
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut initialized = false;

    for (position, segment) in segments.iter().enumerate() {
        let items = segment
            .as_array()
            .ok_or_else(|| malformed(position, "segment is not a sequence"))?;
        let tag = items
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed(position, "missing integer tag"))?;

        match tag {
            TAG_BOOTSTRAP => {
                initialized = true;
            }
            TAG_CONTINUATION => {
                if !initialized {
                    return Err(SegmentError::BufferNotInitialized { position });
                }
                let payload = string_payload(items, position)?;
                chunks.push(payload.as_bytes().to_vec());
            }
            TAG_FORM_STATE => {
                // Payload intentionally discarded; the tag only keeps index
                // alignment with the source stream.
            }
            TAG_BINARY => {
                if !initialized {
                    return Err(SegmentError::BufferNotInitialized { position });
                }
                let payload = string_payload(items, position)?;
                let bytes = STANDARD
                    .decode(payload)
                    .map_err(|source| SegmentError::InvalidBase64 { position, source })?;
                chunks.push(bytes);
            }
            other => {
                return Err(SegmentError::UnknownTag {
                    tag: other,
                    position,
                });
            }
        }
    }

    Ok(chunks)
}

fn string_payload(items: &[Value], position: usize) -> Result<&str, SegmentError> {
    items
        .get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(position, "expected a string payload"))
}
