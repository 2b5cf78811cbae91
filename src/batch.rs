use crate::{
    cancel::{CancelToken, RunControl},
    engine::{CompressionBackend, Rasterizer},
    error::{EngineError, Result},
    orchestrator::{CompressionResult, Orchestrator},
    request::CompressionRequest,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct Job {
    pub id: String,
    pub request: CompressionRequest,
}

/// Run independent requests on up to `workers` threads.
///
/// Each request gets its own deadline of `timeout_seconds` (0 = none), counted
/// from when a worker picks it up. Results are returned in input order.
pub fn run_all<E>(
    orch: &Orchestrator<E>,
    jobs: Vec<Job>,
    workers: usize,
    cancel: &CancelToken,
    timeout_seconds: u64,
) -> Vec<Result<CompressionResult>>
where
    E: CompressionBackend + Rasterizer + Sync,
{
    let total = jobs.len();
    let queue: Mutex<VecDeque<(usize, Job)>> = Mutex::new(jobs.into_iter().enumerate().collect());
    let results: Mutex<Vec<Option<Result<CompressionResult>>>> =
        Mutex::new((0..total).map(|_| None).collect());
    let workers = workers.clamp(1, total.max(1));

    std::thread::scope(|s| {
        for w in 0..workers {
            let queue = &queue;
            let results = &results;
            s.spawn(move || {
                loop {
                    let next = match queue.lock() {
                        Ok(mut q) => q.pop_front(),
                        Err(_) => {
                            warn!("worker {w}: queue lock poisoned");
                            return;
                        }
                    };
                    let Some((idx, job)) = next else {
                        return;
                    };
                    debug!("worker {w} picked request {}", job.id);
                    let control = RunControl::with_timeout_seconds(cancel.clone(), timeout_seconds);
                    let res = orch.run(&job.id, &job.request, &control);
                    store(results, idx, res);
                }
            });
        }
    });

    results
        .into_inner()
        .unwrap_or_else(|p| p.into_inner())
        .into_iter()
        .map(|r| r.unwrap_or(Err(EngineError::Cancelled)))
        .collect()
}

/// Fill `slots[idx]`, recovering the guard if another worker panicked.
fn store<T>(slots: &Mutex<Vec<Option<T>>>, idx: usize, value: T) {
    let mut guard = slots.lock().unwrap_or_else(|p| p.into_inner());
    guard[idx] = Some(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_survives_a_poisoned_lock() {
        let slots: Mutex<Vec<Option<u32>>> = Mutex::new(vec![None, None]);
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = slots.lock().unwrap();
                panic!("worker died holding the lock");
            })
            .join()
        });
        assert!(slots.is_poisoned());

        store(&slots, 1, 7);
        let slots = slots.into_inner().unwrap_or_else(|p| p.into_inner());
        assert_eq!(slots, vec![None, Some(7)]);
    }
}
