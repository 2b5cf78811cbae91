use serde::{Deserialize, Serialize};

/// Backend settings a strategy resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preset {
    Standard {
        pdf_settings: String,
    },
    Forced {
        pdf_settings: String,
        resolution_dpi: u32,
    },
    Raster {
        device: String,
        resolution_dpi: u32,
        jpeg_quality: u8,
    },
}

impl Preset {
    /// Short human-readable form for logs and error messages.
    pub fn label(&self) -> String {
        match self {
            Preset::Standard { pdf_settings } => pdf_settings.clone(),
            Preset::Forced {
                pdf_settings,
                resolution_dpi,
            } => format!("{pdf_settings}@{resolution_dpi}dpi"),
            Preset::Raster {
                device,
                resolution_dpi,
                jpeg_quality,
            } => format!("{device}@{resolution_dpi}dpi/q{jpeg_quality}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDiag {
    pub exe: String,
    pub version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}
