//! Per-file worker pool. Results come back in input order.

use std::num::NonZeroUsize;

/// Apply `work` to every item on up to `jobs` scoped threads.
/// `jobs == 0` means the available parallelism. Output order matches `items`.
pub fn run<T, R, F>(items: &[T], jobs: usize, work: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = worker_count(jobs).min(items.len());
    if workers <= 1 {
        return items.iter().map(&work).collect();
    }

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, &T)>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, R)>();
    for job in items.iter().enumerate() {
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let work = &work;
            scope.spawn(move || {
                for (index, item) in jobs {
                    let _ = results.send((index, work(item)));
                }
            });
        }
    });
    drop(result_tx);

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| return None).take(items.len()).collect();
    for (index, result) in result_rx {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(result);
        }
    }
    return slots.into_iter().flatten().collect();
}

/// Effective worker count for a `jobs` setting.
fn worker_count(jobs: usize) -> usize {
    if jobs > 0 {
        return jobs;
    }
    return std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
}
