use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::geometry::{OverlayGeometry, PageSize};

pub const DEFAULT_OVERLAY_WIDTH: f64 = 150.0;
pub const DEFAULT_OVERLAY_HEIGHT: f64 = 100.0;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sig-{}", self.0)
    }
}

/// Raster content of a signature, kept as the data URL the capture widget
/// produced.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SignatureImage {
    data_url: String,
}

impl SignatureImage {
    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self {
            data_url: data_url.into(),
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn is_empty(&self) -> bool {
        self.data_url.trim().is_empty()
    }

    /// Decodes the base64 payload of a `data:image/png;base64,...` URL.
    pub fn png_bytes(&self) -> Result<Vec<u8>, String> {
        let trimmed = self.data_url.trim_start();
        if !trimmed.starts_with("data:") {
            return Err("Signature image is not a data URL".into());
        }
        let (header, payload) = trimmed
            .split_once(',')
            .ok_or_else(|| "Signature data URL has no payload".to_string())?;
        if !header.ends_with(";base64") {
            return Err(format!("Unsupported signature encoding: {header}"));
        }
        STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("Failed to decode signature image: {e}"))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SignatureOverlay {
    pub id: OverlayId,
    pub image: SignatureImage,
    pub page_index: usize,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SignatureOverlay {
    pub fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }

    pub fn geometry(&self) -> OverlayGeometry {
        OverlayGeometry {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
        }
    }
}
