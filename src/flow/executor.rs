//! Where step work runs: inline, or fanned out over a thread pool.
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;

/// Execution backend handed to every step.
///
/// Plain steps run their whole body on the caller's thread either way; the
/// mapped steps route per-item work through [`Executor::map`], which is where
/// the pool pays off.
pub enum Executor {
    Serial,
    Pool { pool: rayon::ThreadPool, workers: usize },
}

impl Executor {
    /// Run everything on the calling thread.
    pub fn serial() -> Self {
        Executor::Serial
    }

    /// Build a dedicated pool with `workers` threads.
    pub fn pool(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(anyhow!("worker pool needs at least one worker"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("build worker pool")?;
        Ok(Executor::Pool { pool, workers })
    }

    /// Short label for transcripts.
    pub fn describe(&self) -> String {
        match self {
            Executor::Serial => "serial".to_string(),
            Executor::Pool { workers, .. } => format!("pool({workers})"),
        }
    }

    /// Apply `op` to every item and gather the results in input order.
    ///
    /// The first failing item aborts the map and its error is returned.
    pub fn map<I, O, F>(&self, items: Vec<I>, op: F) -> Result<Vec<O>>
    where
        I: Send,
        O: Send,
        F: Fn(I) -> Result<O> + Send + Sync,
    {
        match self {
            Executor::Serial => items.into_iter().map(op).collect(),
            Executor::Pool { pool, .. } => {
                pool.install(|| items.into_par_iter().map(&op).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_map_preserves_input_order() {
        let out = Executor::serial()
            .map(vec![1, 2, 3], |n| Ok(n * 10))
            .expect("map");
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[test]
    fn pool_map_preserves_input_order() {
        let executor = Executor::pool(4).expect("build pool");
        let items: Vec<usize> = (0..64).collect();
        let out = executor.map(items.clone(), |n| Ok(n + 1)).expect("map");
        let expected: Vec<usize> = items.iter().map(|n| n + 1).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn one_failure_fails_the_whole_map() {
        let executor = Executor::pool(2).expect("build pool");
        let err = executor
            .map(vec![0, 1, 2], |n| {
                if n == 1 {
                    Err(anyhow!("item {n} refused"))
                } else {
                    Ok(n)
                }
            })
            .expect_err("map fails");
        assert!(err.to_string().contains("item 1 refused"));
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(Executor::pool(0).is_err());
    }
}
