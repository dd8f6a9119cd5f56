//! Inline image payload decoding.
//!
//! Clients send images either as bare base64 or as a
//! `data:<mime>;base64,<data>` URI. Both forms decode to the same bytes.

use base64::prelude::*;

use crate::error::CoreError;

/// Media type assumed when the payload carries none.
pub const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// A decoded inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// MIME type from the data URI, or [`DEFAULT_MEDIA_TYPE`].
    pub media_type: String,
    /// Canonical base64 text (without any URI prefix).
    pub data: String,
    /// Decoded bytes; never empty.
    pub bytes: Vec<u8>,
}

/// Decode an inline image field.
///
/// Fails with [`CoreError::InvalidInput`] when the base64 is malformed or
/// decodes to zero bytes.
pub fn decode_inline_image(raw: &str) -> Result<InlineImage, CoreError> {
    let raw = raw.trim();
    let (media_type, data) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',').ok_or_else(|| {
                CoreError::InvalidInput("data URI is missing the ',' separator".into())
            })?;
            let mime = header.strip_suffix(";base64").ok_or_else(|| {
                CoreError::InvalidInput("only base64 data URIs are supported".into())
            })?;
            let mime = if mime.is_empty() {
                DEFAULT_MEDIA_TYPE
            } else {
                mime
            };
            (mime.to_string(), data)
        }
        None => (DEFAULT_MEDIA_TYPE.to_string(), raw),
    };

    let bytes = BASE64_STANDARD
        .decode(data.as_bytes())
        .map_err(|e| CoreError::InvalidInput(format!("Invalid base64 image data: {e}")))?;

    if bytes.is_empty() {
        return Err(CoreError::InvalidInput("Image data is empty".into()));
    }

    Ok(InlineImage {
        media_type,
        data: data.to_string(),
        bytes,
    })
}
