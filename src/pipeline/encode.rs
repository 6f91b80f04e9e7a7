//! Byte-to-text encoding: `ImageFile` → base64 data reference.
//!
//! The reference has the shape `data:<content-type>;base64, <payload>`, with
//! a single space after the comma.
//!
//! Large files (tens of MB) are encoded in fixed 48 KiB chunks. The chunk
//! length is a multiple of 3, so no padding appears mid-stream and the
//! concatenation is identical to a one-shot encode.

use crate::file::ImageFile;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::fmt;
use tracing::debug;

const CHUNK_BYTES: usize = 3 * 16 * 1024;

const SEPARATOR: &str = ";base64, ";

/// A `data:<type>;base64, <payload>` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DataReference(String);

impl DataReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The declared content type between `data:` and `;base64, `.
    pub fn content_type(&self) -> &str {
        self.split().0
    }

    /// The base64 payload after `;base64, `.
    pub fn payload(&self) -> &str {
        self.split().1
    }

    /// Decode the payload back into bytes.
    pub fn decode_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.payload())
    }

    fn split(&self) -> (&str, &str) {
        let rest = &self.0["data:".len()..];
        rest.split_once(SEPARATOR).unwrap_or((rest, ""))
    }
}

impl fmt::Display for DataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DataReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Standard-alphabet, padded base64 of `bytes`, encoded chunk by chunk.
pub fn encode_base64(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(CHUNK_BYTES) {
        STANDARD.encode_string(chunk, &mut out);
    }
    out
}

/// Build the data reference for `file` from its bytes and declared type.
pub fn to_data_reference(file: &ImageFile) -> DataReference {
    let b64 = encode_base64(file.bytes());
    debug!(
        "Encoded '{}' → {} bytes base64",
        file.name(),
        b64.len()
    );

    let content_type = file.content_type();
    let mut url = String::with_capacity(5 + content_type.len() + SEPARATOR.len() + b64.len());
    url.push_str("data:");
    url.push_str(content_type);
    url.push_str(SEPARATOR);
    url.push_str(&b64);
    DataReference(url)
}
