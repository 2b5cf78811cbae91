use crate::{
    cancel::RunControl,
    config::Config,
    engine::{CompressionBackend, Rasterizer},
    error::{EngineError, IoContext, Result},
    escalate::escalate,
    increase,
    probe,
    request::{CompressionRequest, Mode},
    select::select,
    tier::{Strategy, TierPlanner, escalation_steps},
    trial::{Attempt, TrialExecutor},
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct CompressionResult {
    pub final_artifact: PathBuf,
    pub original_size_bytes: u64,
    pub final_size_bytes: u64,
    /// `None` in Increase mode and when the source was kept.
    pub tier_used: Option<Strategy>,
    pub target_bytes: Option<u64>,
    pub target_met: bool,
    /// Every candidate came out larger than the source, so the source was kept.
    pub source_kept: bool,
    pub attempts: Vec<Attempt>,
}

struct Outcome {
    artifact: PathBuf,
    size_bytes: u64,
    tier_used: Option<Strategy>,
    source_kept: bool,
    attempts: Vec<Attempt>,
}

pub struct Orchestrator<E: CompressionBackend + Rasterizer> {
    cfg: Config,
    engine: E,
    planner: TierPlanner,
}

impl<E: CompressionBackend + Rasterizer> Orchestrator<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: cfg.clone(),
            planner: TierPlanner::from_config(cfg),
            engine,
        }
    }

    /// Run one request end to end.
    ///
    /// The winner lands at `<out_dir>/<id><artifact_suffix>`. Scratch space is
    /// a private directory under `work_dir` that is removed on every exit
    /// path, and nothing is written to `out_dir` unless the request succeeds.
    pub fn run(
        &self,
        id: &str,
        req: &CompressionRequest,
        control: &RunControl,
    ) -> Result<CompressionResult> {
        let started = Instant::now();
        if control.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let source = probe::probe_source(&self.cfg, &req.source)?;
        if !source.pdf_header {
            warn!("{} has no %PDF- header", source.path);
        }
        let original_size_bytes = source.file_bytes;

        let work_dir = PathBuf::from(&self.cfg.paths.work_dir);
        let out_dir = PathBuf::from(&self.cfg.paths.out_dir);
        std::fs::create_dir_all(&work_dir)
            .io_context(|| format!("create work_dir {}", work_dir.display()))?;
        std::fs::create_dir_all(&out_dir)
            .io_context(|| format!("create out_dir {}", out_dir.display()))?;

        let scratch = tempfile::Builder::new()
            .prefix(&format!("{id}-"))
            .tempdir_in(&work_dir)
            .io_context(|| "create scratch dir")?;
        info!(
            "request {id} mode={:?} target={:?} size={original_size_bytes} scratch={}",
            req.mode,
            req.target(),
            scratch.path().display()
        );

        let outcome = match req.mode {
            Mode::Reduce => self.reduce(req, original_size_bytes, scratch.path(), control)?,
            Mode::Increase => self.increase(req, scratch.path())?,
        };

        let dest = out_dir.join(format!("{id}{}", self.cfg.output.artifact_suffix));
        promote(&outcome.artifact, &dest)?;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!("removing scratch {}: {e}", scratch_path.display());
        }

        let target_bytes = req.target();
        let target_met = target_bytes.is_none_or(|t| match req.mode {
            Mode::Reduce => outcome.size_bytes <= t,
            Mode::Increase => outcome.size_bytes == t,
        });

        info!(
            "request {id} done: {original_size_bytes} -> {} tier={} target_met={target_met} in {:?}",
            outcome.size_bytes,
            outcome
                .tier_used
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into()),
            started.elapsed()
        );

        Ok(CompressionResult {
            final_artifact: dest,
            original_size_bytes,
            final_size_bytes: outcome.size_bytes,
            tier_used: outcome.tier_used,
            target_bytes,
            target_met,
            source_kept: outcome.source_kept,
            attempts: outcome.attempts,
        })
    }

    fn reduce(
        &self,
        req: &CompressionRequest,
        original_size: u64,
        scratch: &Path,
        control: &RunControl,
    ) -> Result<Outcome> {
        let target = req.target();
        let planner = match req.level {
            Some(level) => TierPlanner::new(level),
            None => self.planner.clone(),
        };
        let tiers = planner.plan(Mode::Reduce, target.is_some());
        debug!("planned tiers {:?}", tiers);

        let exec = TrialExecutor::new(&self.cfg, &self.engine, &self.engine, scratch);
        let selection = select(&exec, &req.source, &tiers, target, control)?;
        let mut attempts = selection.attempts;
        let mut best = selection.best;

        if let Some(t) = target {
            if best.size_bytes > t {
                let steps = escalation_steps(&self.cfg);
                best = escalate(&exec, &req.source, best, t, &steps, control, &mut attempts)?;
            }
        }

        if best.size_bytes > original_size {
            info!(
                "best candidate {} ({}) is larger than the source {}; keeping source",
                best.size_bytes, best.strategy, original_size
            );
            best.discard();
            let kept = scratch.join("source.pdf");
            std::fs::copy(&req.source, &kept).io_context(|| "copy source into scratch")?;
            return Ok(Outcome {
                artifact: kept,
                size_bytes: original_size,
                tier_used: None,
                source_kept: true,
                attempts,
            });
        }

        Ok(Outcome {
            artifact: best.artifact,
            size_bytes: best.size_bytes,
            tier_used: Some(best.strategy),
            source_kept: false,
            attempts,
        })
    }

    fn increase(&self, req: &CompressionRequest, scratch: &Path) -> Result<Outcome> {
        let target = req.target().ok_or_else(|| {
            EngineError::InvalidParameter("increase mode requires target_bytes".into())
        })?;
        let padded = increase::increase(
            scratch,
            &req.source,
            target,
            self.cfg.increase.verify_structure,
        )?;
        Ok(Outcome {
            artifact: padded.artifact,
            size_bytes: padded.size_bytes,
            tier_used: None,
            source_kept: padded.padded_bytes == 0,
            attempts: Vec::new(),
        })
    }
}

/// Move the winner out of scratch. `dest` either holds the full artifact or
/// does not exist.
fn promote(artifact: &Path, dest: &Path) -> Result<()> {
    if std::fs::rename(artifact, dest).is_ok() {
        return Ok(());
    }
    // Different filesystem: copy next to the destination, then rename.
    let mut partial = dest.as_os_str().to_os_string();
    partial.push(".partial");
    let partial = PathBuf::from(partial);
    let res = std::fs::copy(artifact, &partial)
        .and_then(|_| std::fs::rename(&partial, dest))
        .io_context(|| format!("promote to {}", dest.display()));
    if res.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    res
}
