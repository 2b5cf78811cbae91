use crate::{
    config::Config,
    engine::{CompressionBackend, Rasterizer},
    error::{EngineError, Result},
    tier::{Strategy, preset_for},
};
use serde::Serialize;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output of one trial. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub strategy: Strategy,
    pub artifact: PathBuf,
    pub size_bytes: u64,
}

impl Candidate {
    /// Drop the candidate's file. Losers go as soon as they lose.
    pub fn discard(self) {
        if let Err(e) = std::fs::remove_file(&self.artifact) {
            debug!("discard {}: {e}", self.artifact.display());
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub strategy: Strategy,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Produced { size_bytes: u64 },
    /// Produced but not accepted (escalation step that did not improve).
    Rejected { size_bytes: u64 },
    Failed { error: String },
}

/// Runs one strategy against the source and measures what comes out.
pub struct TrialExecutor<'a> {
    cfg: &'a Config,
    backend: &'a dyn CompressionBackend,
    rasterizer: &'a dyn Rasterizer,
    scratch: &'a Path,
    seq: Cell<u32>,
}

impl<'a> TrialExecutor<'a> {
    pub fn new(
        cfg: &'a Config,
        backend: &'a dyn CompressionBackend,
        rasterizer: &'a dyn Rasterizer,
        scratch: &'a Path,
    ) -> Self {
        Self {
            cfg,
            backend,
            rasterizer,
            scratch,
            seq: Cell::new(0),
        }
    }

    pub fn execute(&self, source: &Path, strategy: Strategy) -> Result<Candidate> {
        let n = self.seq.get();
        self.seq.set(n + 1);
        let artifact = self
            .scratch
            .join(format!("trial-{n:02}-{}.pdf", strategy.to_string().to_ascii_lowercase()));
        let preset = preset_for(self.cfg, strategy);

        info!("trial {strategy} preset={} -> {}", preset.label(), artifact.display());
        let res = match strategy {
            Strategy::Rasterize => {
                self.rasterizer
                    .rasterize_and_reassemble(source, &preset, &artifact)
            }
            Strategy::Standard(_) | Strategy::Force => {
                self.backend.compress(source, &preset, &artifact)
            }
        };
        res.map_err(|e| relabel(e, strategy))?;

        let size_bytes = match std::fs::metadata(&artifact) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
            _ => {
                let _ = std::fs::remove_file(&artifact);
                return Err(EngineError::NoArtifactProduced {
                    tier: strategy.to_string(),
                    path: artifact,
                });
            }
        };

        info!("trial {strategy} size={size_bytes}");
        Ok(Candidate {
            strategy,
            artifact,
            size_bytes,
        })
    }
}

/// Backends only know the preset; errors surface under the strategy name.
fn relabel(err: EngineError, strategy: Strategy) -> EngineError {
    match err {
        EngineError::ExternalToolFailure { tool, detail, .. } => EngineError::ExternalToolFailure {
            tool,
            tier: strategy.to_string(),
            detail,
        },
        EngineError::NoArtifactProduced { path, .. } => EngineError::NoArtifactProduced {
            tier: strategy.to_string(),
            path,
        },
        other => other,
    }
}
