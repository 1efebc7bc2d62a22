//! Image payload decoding and MIME detection.

use crate::models::ImageInput;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("No image provided")]
    Missing,

    #[error("Image is not valid base64")]
    InvalidBase64,

    #[error("Malformed data URL")]
    MalformedDataUrl,

    #[error("Unsupported image type: {0}")]
    Unsupported(String),
}

/// Detect an image MIME type from its leading bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [_, _, _, _, b'f', b't', b'y', b'p', b0, b1, b2, b3, ..] => match &[*b0, *b1, *b2, *b3] {
            b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" => Some("image/heic"),
            b"mif1" | b"msf1" => Some("image/heif"),
            _ => None,
        },
        _ => None,
    }
}

/// Decode a base64 image given bare or as a `data:<mime>;base64,` URL.
pub fn decode_base64_image(raw: &str) -> Result<ImageInput, ImageError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ImageError::Missing);
    }

    let (declared_mime, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest.split_once(',').ok_or(ImageError::MalformedDataUrl)?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or(ImageError::MalformedDataUrl)?;
            (Some(mime.to_ascii_lowercase()), payload)
        }
        None => (None, raw),
    };

    // Browsers and some clients wrap long base64 lines.
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| ImageError::InvalidBase64)?;

    from_bytes_with_hint(bytes, declared_mime.as_deref(), Some(compact))
}

/// Build an image from raw upload bytes, e.g. a multipart file part.
pub fn from_bytes(bytes: Vec<u8>, content_type: Option<&str>) -> Result<ImageInput, ImageError> {
    from_bytes_with_hint(bytes, content_type, None)
}

fn from_bytes_with_hint(
    bytes: Vec<u8>,
    declared_mime: Option<&str>,
    encoded: Option<String>,
) -> Result<ImageInput, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Missing);
    }

    // Only recognized formats are accepted. The declared type is never
    // trusted, so the MIME type is always one of the sniffed constants.
    let mime_type = sniff_mime(&bytes)
        .ok_or_else(|| {
            ImageError::Unsupported(
                declared_mime
                    .map(|d| d.chars().take(64).collect())
                    .unwrap_or_else(|| "unknown".to_string()),
            )
        })?
        .to_string();

    let byte_len = bytes.len();
    let data_base64 = encoded.unwrap_or_else(|| STANDARD.encode(&bytes));

    Ok(ImageInput {
        mime_type,
        data_base64,
        byte_len,
    })
}
