//! Worker pool for batch dumps.
//! Each translation unit is still walked by exactly one worker.

use anyhow::Result;

/// Default worker count: half of the available cores, at least 1.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Build a dedicated rayon pool; `jobs = None` or `Some(0)` picks the default.
pub fn build_thread_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool> {
    let workers = match jobs {
        Some(n) if n > 0 => n,
        _ => default_workers(),
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("ast-dump-{}", i))
        .build()?;

    tracing::info!(
        "Initialized thread pool: {} workers (system has {} cores)",
        workers,
        num_cpus::get()
    );

    Ok(pool)
}
