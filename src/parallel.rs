//! Fixed-size worker pool shared by the two parallel phases (kernel rows
//! and the parameter sweep).
//!
//! Tasks are independent and read only shared, already-built inputs.
//! Results come back in task order regardless of completion order, and the
//! first failing task fails the whole batch.
use crate::error::{CosegError, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Resolve a configured worker count; `0` means available parallelism.
pub fn resolve_workers(workers: usize) -> usize {
    if workers > 0 {
        return workers;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Run `f` over `tasks` on a pool of `workers` threads, preserving task order.
#[cfg(feature = "parallel")]
pub fn run_tasks<T, R, F>(workers: usize, tasks: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync + Send,
{
    let workers = resolve_workers(workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| CosegError::Worker {
            task: "thread pool".to_string(),
            reason: e.to_string(),
        })?;
    pool.install(|| tasks.par_iter().map(&f).collect())
}

/// Sequential fallback used when the `parallel` feature is disabled.
#[cfg(not(feature = "parallel"))]
pub fn run_tasks<T, R, F>(_workers: usize, tasks: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync + Send,
{
    tasks.iter().map(f).collect()
}

/// Wraps a task error with the task's label so the batch failure names it.
pub(crate) fn task_error(task: impl Into<String>, err: CosegError) -> CosegError {
    match err {
        CosegError::Worker { .. } => err,
        other => CosegError::Worker {
            task: task.into(),
            reason: other.to_string(),
        },
    }
}
