//! Record decoding.
//!
//! Scans the concatenated stream buffer left to right, one record per
//! iteration: a base-16 index field up to `:`, an optional run of uppercase
//! value-class letters, then a payload framed either by an explicit byte
//! length (`T` records, whose text may contain bytes that look like record
//! delimiters) or by the start of the next record. The buffer is treated as
//! raw bytes; only text payloads are required to be valid UTF-8.

use crate::element::ElementError;
use crate::resolve::resolve;
use crate::tree::FlightData;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use thiserror::Error;

/// Start of the next record: a newline followed by a (possibly empty) run of
/// lowercase hex digits and a colon.
static RECORD_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[0-9a-f]*:").expect("static pattern"));

/// Errors from record decoding. All are fatal: the stream is assumed
/// complete, so no partial result is returned and nothing is retried.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The index field before a `:` is not a base-16 integer.
    #[error("malformed record index at offset {offset}: {detail}")]
    BadIndex { offset: usize, detail: String },

    /// A text record's length field is missing or not a base-16 integer.
    #[error("malformed text length field at offset {offset}: {detail}")]
    BadLength { offset: usize, detail: String },

    /// A text record's declared length runs past the end of the buffer.
    #[error("text payload at offset {offset} runs past the end of the stream")]
    TruncatedText { offset: usize },

    /// A text record's payload is not valid UTF-8.
    #[error("text payload at offset {offset} is not valid UTF-8")]
    InvalidText { offset: usize },

    /// A non-text payload failed to JSON-decode.
    #[error("record payload at offset {offset} is not valid JSON: {source}")]
    BadPayload {
        offset: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Classification or shape validation failed.
    #[error(transparent)]
    Element(#[from] ElementError),
}

/// Concatenate assembled chunks and decode the full stream.
pub fn decode(chunks: &[Vec<u8>]) -> Result<FlightData, DecodeError> {
    decode_buffer(&chunks.concat())
}

/// Decode a stream from a string. Convenience for callers holding text.
pub fn decode_str(stream: &str) -> Result<FlightData, DecodeError> {
    decode_buffer(stream.as_bytes())
}

/// Decode a raw stream buffer into a fresh element tree.
pub fn decode_buffer(buf: &[u8]) -> Result<FlightData, DecodeError> {
    let mut data = FlightData::default();
    let mut pos = 0usize;

    while pos < buf.len() {
        // Index field: bytes up to the next ':'. No ':' left means the
        // stream is exhausted; that is normal termination.
        let Some(colon) = find_byte(&buf[pos..], b':') else {
            break;
        };
        let index = parse_index(&buf[pos..pos + colon], pos)?;
        let mut cur = pos + colon + 1;

        // Value-class tag: consecutive uppercase ASCII letters.
        let tag_start = cur;
        while cur < buf.len() && buf[cur].is_ascii_uppercase() {
            cur += 1;
        }
        let class = (cur > tag_start)
            .then(|| String::from_utf8_lossy(&buf[tag_start..cur]).into_owned());

        let element = if class.as_deref() == Some("T") {
            // Length-prefixed framing: base-16 byte count up to ',', then
            // exactly that many payload bytes, taken verbatim.
            let comma = find_byte(&buf[cur..], b',').ok_or_else(|| DecodeError::BadLength {
                offset: cur,
                detail: "missing ',' after length field".to_string(),
            })?;
            let length = parse_hex(&buf[cur..cur + comma]).ok_or_else(|| DecodeError::BadLength {
                offset: cur,
                detail: "length field is not base-16".to_string(),
            })? as usize;
            let start = cur + comma + 1;
            let end = start
                .checked_add(length)
                .filter(|&end| end <= buf.len())
                .ok_or(DecodeError::TruncatedText { offset: start })?;
            let text = std::str::from_utf8(&buf[start..end])
                .map_err(|_| DecodeError::InvalidText { offset: start })?;
            cur = end;
            resolve(serde_json::Value::String(text.to_string()), class.as_deref(), index)?
        } else {
            // Delimiter framing: the payload runs to the start of the next
            // record, or to one byte before the end of the buffer.
            let (payload, next) = match RECORD_DELIMITER.find(&buf[cur..]) {
                Some(m) => (&buf[cur..cur + m.start()], cur + m.start() + 1),
                None => {
                    let end = buf.len().saturating_sub(1).max(cur);
                    (&buf[cur..end], buf.len())
                }
            };
            let value = serde_json::from_slice(payload)
                .map_err(|source| DecodeError::BadPayload { offset: cur, source })?;
            cur = next;
            resolve(value, class.as_deref(), index)?
        };

        data.insert(index, element);
        pos = cur;
    }

    Ok(data)
}

fn find_byte(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

/// Parse the record index field. Empty means anonymous. A length-framed text
/// payload leaves the following record's newline in front of its index, so
/// surrounding ASCII whitespace is tolerated.
fn parse_index(field: &[u8], offset: usize) -> Result<Option<u64>, DecodeError> {
    if field.is_empty() {
        return Ok(None);
    }
    let trimmed: Vec<u8> = field
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    parse_hex(&trimmed)
        .map(Some)
        .ok_or_else(|| DecodeError::BadIndex {
            offset,
            detail: format!("{:?} is not a base-16 integer", String::from_utf8_lossy(field)),
        })
}

fn parse_hex(field: &[u8]) -> Option<u64> {
    if field.is_empty() {
        return None;
    }
    let text = std::str::from_utf8(field).ok()?;
    u64::from_str_radix(text, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use serde_json::json;

    #[test]
    fn test_mixed_framing_scenario() {
        let data = decode_str("0:HL[\"/a.css\",\"style\"]\n1:T5,hello").unwrap();
        assert_eq!(data.len(), 2);

        let hint = data.get(0).unwrap();
        assert_eq!(hint.kind(), ElementKind::HintPreload);
        assert_eq!(hint.href(), Some("/a.css"));
        assert_eq!(hint.type_name(), Some("style"));
        assert!(hint.attrs().is_none());

        let text = data.get(1).unwrap();
        assert_eq!(text.kind(), ElementKind::Text);
        assert_eq!(text.text(), Some("hello"));
    }

    #[test]
    fn test_text_length_is_hexadecimal() {
        // 0x10 = 16 payload bytes
        let data = decode_str("a:T10,0123456789abcdef").unwrap();
        assert_eq!(data.get(10).unwrap().text(), Some("0123456789abcdef"));
    }

    #[test]
    fn test_text_payload_may_contain_delimiters() {
        // The embedded "\n1:" must not terminate the length-framed payload.
        let data = decode_str("0:{\"b\":\"X\"}\n1:T6,a\n1:bc\n2:null\n").unwrap();
        assert_eq!(data.get(1).unwrap().text(), Some("a\n1:bc"));
        assert_eq!(data.get(2).unwrap().kind(), ElementKind::EmptyData);
    }

    #[test]
    fn test_indices_are_hexadecimal() {
        let data = decode_str("0:{\"b\":\"X\"}\nf:null\n").unwrap();
        assert!(data.get(15).is_some());
    }

    #[test]
    fn test_record_after_text_record() {
        let data = decode_str("0:{\"b\":\"X\"}\n1:T2,hi\n2:null\n").unwrap();
        assert_eq!(data.get(1).unwrap().text(), Some("hi"));
        assert_eq!(data.get(2).unwrap().kind(), ElementKind::EmptyData);
    }

    #[test]
    fn test_anonymous_records_accumulate() {
        let data = decode_str("0:{\"b\":\"X\"}\n:null\n:null\n").unwrap();
        assert_eq!(data.anonymous().len(), 2);
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_duplicate_index_last_write_wins() {
        let data = decode_str("0:{\"b\":\"X\"}\n1:T1,a\n1:T1,b\n").unwrap();
        assert_eq!(data.get(1).unwrap().text(), Some("b"));
    }

    #[test]
    fn test_final_record_drops_trailing_byte() {
        // Without a following delimiter the payload stops one byte short of
        // the buffer end, eating the trailing newline.
        let data = decode_str("2:[\"k\",\"v\",\"d\"]\n").unwrap();
        assert_eq!(data.get(2).unwrap().kind(), ElementKind::UrlQuery);
    }

    #[test]
    fn test_chunked_input_is_concatenated() {
        let chunks = vec![b"0:{\"b\":\"X\"}\n1:T5,he".to_vec(), b"llo".to_vec()];
        let data = decode(&chunks).unwrap();
        assert_eq!(data.get(1).unwrap().text(), Some("hello"));
    }

    #[test]
    fn test_empty_buffer() {
        let data = decode_str("").unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_bad_index_is_fatal() {
        let err = decode_str("zz:null\n").unwrap_err();
        assert!(matches!(err, DecodeError::BadIndex { .. }));
    }

    #[test]
    fn test_bad_length_field_is_fatal() {
        let err = decode_str("0:{\"b\":\"X\"}\n1:T5hello").unwrap_err();
        assert!(matches!(err, DecodeError::BadLength { .. }));

        let err = decode_str("0:{\"b\":\"X\"}\n1:Tqq,hello").unwrap_err();
        assert!(matches!(err, DecodeError::BadLength { .. }));
    }

    #[test]
    fn test_truncated_text_is_fatal() {
        let err = decode_str("0:{\"b\":\"X\"}\n1:Tff,short").unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedText { .. }));
    }

    #[test]
    fn test_bad_json_payload_is_fatal() {
        let err = decode_str("0:{\"b\":\"X\"}\n1:{broken\n").unwrap_err();
        assert!(matches!(err, DecodeError::BadPayload { .. }));
    }

    #[test]
    fn test_unclassifiable_root_aborts_decode() {
        let err = decode_str("0:42\n").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Element(ElementError::MissingRootType)
        ));
    }

    #[test]
    fn test_determinism() {
        let stream = "0:{\"b\":\"X\"}\n1:T5,hello\n2:[\"$\",\"div\",null,{}]\n";
        let a = decode_str(stream).unwrap();
        let b = decode_str(stream).unwrap();
        assert_eq!(a, b);
    }
}
