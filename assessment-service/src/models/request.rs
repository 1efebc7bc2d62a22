//! Upload request shapes.

use serde::Deserialize;
use validator::Validate;

/// JSON body for the single-image endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssessRequest {
    /// Base64 image data, bare or as a `data:` URL.
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    #[validate(range(max = 130))]
    pub age: Option<u32>,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// JSON body for the batch endpoint. Images are ordered oldest first.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchAssessRequest {
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    #[validate(range(max = 130))]
    pub age: Option<u32>,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl BatchAssessRequest {
    /// Combined size of the encoded image strings as received.
    pub fn encoded_len(&self) -> usize {
        self.images.iter().map(String::len).sum()
    }
}

/// A decoded, provider-ready image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: String,
    /// Standard base64 without any `data:` prefix.
    pub data_base64: String,
    /// Size of the raw image in bytes.
    pub byte_len: usize,
}

impl ImageInput {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}
