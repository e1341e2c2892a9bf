//! Remote analysis client trait and photo payload.

use crate::error::Fault;
use crate::types::NutritionEstimate;
use async_trait::async_trait;
use base64::Engine;

/// Base64-encoded photo ready to send to a vision API.
#[derive(Debug, Clone)]
pub struct PhotoInput {
    /// Base64-encoded photo bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl PhotoInput {
    /// Encode raw photo bytes, sniffing the media type from the magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: sniff_media_type(bytes).to_string(),
        }
    }
}

fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else {
        if !bytes.starts_with(&[0xFF, 0xD8]) {
            tracing::warn!("Unrecognized photo signature, defaulting to image/jpeg");
        }
        "image/jpeg"
    }
}

/// A remote service that estimates nutrition from a meal photo.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (jobs hold an `Arc<dyn ExternalAnalysisClient>`).
#[async_trait]
pub trait ExternalAnalysisClient: Send + Sync {
    /// Client name for logging (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Analyze one photo.
    async fn analyze(&self, photo: &PhotoInput) -> Result<NutritionEstimate, Fault>;
}
