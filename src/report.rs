use crate::{orchestrator::CompressionResult, request::Mode, tier::Strategy, trial::Attempt};
use serde::Serialize;

/// What the caller gets back, plus the trial log.
#[derive(Debug, Clone, Serialize)]
pub struct CompressionReport {
    pub request_id: String,
    pub source: String,
    pub mode: Mode,
    pub file_path: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub tier_used: Option<Strategy>,
    pub target_bytes: Option<u64>,
    pub target_met: bool,
    pub source_kept: bool,
    pub sha256: String,
    pub started: String,
    pub finished: String,
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub request_id: String,
    pub file_path: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub tier_used: Option<Strategy>,
    pub target_met: bool,
}

impl CompressionReport {
    pub fn new(
        request_id: &str,
        source: &str,
        mode: Mode,
        result: &CompressionResult,
        sha256: String,
        started: String,
        finished: String,
    ) -> Self {
        Self {
            request_id: request_id.to_string(),
            source: source.to_string(),
            mode,
            file_path: result.final_artifact.display().to_string(),
            original_size: result.original_size_bytes,
            compressed_size: result.final_size_bytes,
            tier_used: result.tier_used,
            target_bytes: result.target_bytes,
            target_met: result.target_met,
            source_kept: result.source_kept,
            sha256,
            started,
            finished,
            attempts: result.attempts.clone(),
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            request_id: self.request_id.clone(),
            file_path: self.file_path.clone(),
            original_size: self.original_size,
            compressed_size: self.compressed_size,
            tier_used: self.tier_used,
            target_met: self.target_met,
        }
    }
}
