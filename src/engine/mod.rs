pub mod ghostscript;
pub mod types;

use crate::error::Result;
use std::path::Path;

pub use types::{Preset, ToolDiag};

/// Lossy re-encode of a whole document under one preset.
pub trait CompressionBackend {
    fn compress(&self, input: &Path, preset: &Preset, output: &Path) -> Result<()>;
}

/// Last-resort path: render pages to bitmaps and rebuild a document from them.
pub trait Rasterizer {
    fn rasterize_and_reassemble(&self, input: &Path, preset: &Preset, output: &Path)
        -> Result<()>;
}
