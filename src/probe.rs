use crate::{
    config::Config,
    error::{EngineError, Result},
};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub path: String,
    pub file_bytes: u64,
    /// Starts with the `%PDF-` header.
    pub pdf_header: bool,
}

/// Stat the source before any trial runs.
pub fn probe_source(cfg: &Config, input: &Path) -> Result<SourceInfo> {
    let meta = std::fs::metadata(input).map_err(|e| {
        EngineError::InvalidParameter(format!("source {}: {e}", input.display()))
    })?;
    if !meta.is_file() {
        return Err(EngineError::InvalidParameter(format!(
            "source is not a file: {}",
            input.display()
        )));
    }
    let file_bytes = meta.len();
    if file_bytes == 0 {
        return Err(EngineError::InvalidParameter(format!(
            "source is empty: {}",
            input.display()
        )));
    }
    if file_bytes > cfg.limits.max_input_file_bytes {
        return Err(EngineError::InvalidParameter(format!(
            "source exceeds max_input_file_bytes: {file_bytes}"
        )));
    }

    let mut head = [0u8; 5];
    let pdf_header = std::fs::File::open(input)
        .and_then(|mut f| f.read_exact(&mut head))
        .map(|_| &head == b"%PDF-")
        .unwrap_or(false);

    Ok(SourceInfo {
        path: input.display().to_string(),
        file_bytes,
        pdf_header,
    })
}
