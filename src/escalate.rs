use crate::{
    cancel::RunControl,
    error::{EngineError, Result},
    tier::Strategy,
    trial::{Attempt, AttemptOutcome, Candidate, TrialExecutor},
};
use std::path::Path;
use tracing::{info, warn};

/// Try the escalation steps in order until the best candidate fits `target`.
///
/// A step replaces the best only when strictly smaller. Step failures are
/// logged and skipped; the only error returned is [`EngineError::Cancelled`].
/// An expired deadline ends the chain with whatever is best so far.
pub fn escalate(
    exec: &TrialExecutor<'_>,
    source: &Path,
    mut best: Candidate,
    target: u64,
    steps: &[Strategy],
    control: &RunControl,
    attempts: &mut Vec<Attempt>,
) -> Result<Candidate> {
    for &step in steps {
        if best.size_bytes <= target {
            break;
        }
        if control.is_cancelled() {
            best.discard();
            return Err(EngineError::Cancelled);
        }
        if control.deadline_passed() {
            warn!("deadline passed; skipping escalation from {step} on");
            break;
        }

        info!(
            "escalating to {step}: best={} ({}) target={target}",
            best.size_bytes, best.strategy
        );
        match exec.execute(source, step) {
            Ok(cand) if cand.size_bytes < best.size_bytes => {
                attempts.push(Attempt {
                    strategy: step,
                    outcome: AttemptOutcome::Produced {
                        size_bytes: cand.size_bytes,
                    },
                });
                best.discard();
                best = cand;
            }
            Ok(cand) => {
                info!(
                    "{step} did not improve ({} >= {}); keeping {}",
                    cand.size_bytes, best.size_bytes, best.strategy
                );
                attempts.push(Attempt {
                    strategy: step,
                    outcome: AttemptOutcome::Rejected {
                        size_bytes: cand.size_bytes,
                    },
                });
                cand.discard();
            }
            Err(e) => {
                warn!("{step} failed, keeping {}: {e}", best.strategy);
                attempts.push(Attempt {
                    strategy: step,
                    outcome: AttemptOutcome::Failed {
                        error: e.to_string(),
                    },
                });
            }
        }
    }
    Ok(best)
}
