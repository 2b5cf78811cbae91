use crate::{
    cancel::RunControl,
    error::{EngineError, Result},
    tier::{Strategy, Tier},
    trial::{Attempt, AttemptOutcome, Candidate, TrialExecutor},
};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Selection {
    pub best: Candidate,
    /// `true` when there is no target to miss.
    pub target_met: bool,
    pub attempts: Vec<Attempt>,
}

/// Walk the planned tiers in order.
///
/// With a target, the first candidate at or under budget wins on the spot, so
/// the least aggressive passing tier is kept. If none passes, the smallest
/// candidate wins, earlier tier on a tie. A failing tier only matters when
/// every tier fails.
pub fn select(
    exec: &TrialExecutor<'_>,
    source: &Path,
    tiers: &[Tier],
    target: Option<u64>,
    control: &RunControl,
) -> Result<Selection> {
    if tiers.is_empty() {
        return Err(EngineError::InvalidParameter("no tiers planned".into()));
    }

    let mut best: Option<Candidate> = None;
    let mut attempts = Vec::with_capacity(tiers.len());
    let mut last_err: Option<EngineError> = None;

    for &tier in tiers {
        if control.is_cancelled() {
            if let Some(b) = best.take() {
                b.discard();
            }
            return Err(EngineError::Cancelled);
        }
        if control.deadline_passed() {
            warn!("deadline passed; skipping tiers from {tier} on");
            break;
        }

        let strategy = Strategy::Standard(tier);
        let cand = match exec.execute(source, strategy) {
            Ok(c) => c,
            Err(e) => {
                warn!("tier {tier} failed: {e}");
                attempts.push(Attempt {
                    strategy,
                    outcome: AttemptOutcome::Failed {
                        error: e.to_string(),
                    },
                });
                last_err = Some(e);
                continue;
            }
        };
        attempts.push(Attempt {
            strategy,
            outcome: AttemptOutcome::Produced {
                size_bytes: cand.size_bytes,
            },
        });

        let meets = target.is_some_and(|t| cand.size_bytes <= t);
        best = Some(match best.take() {
            Some(prev) if prev.size_bytes <= cand.size_bytes => {
                cand.discard();
                prev
            }
            Some(prev) => {
                prev.discard();
                cand
            }
            None => cand,
        });

        if meets {
            info!("tier {tier} meets target; stopping");
            break;
        }
    }

    let Some(best) = best else {
        return Err(last_err.unwrap_or(EngineError::DeadlineExceeded));
    };
    let target_met = target.is_none_or(|t| best.size_bytes <= t);
    Ok(Selection {
        best,
        target_met,
        attempts,
    })
}
