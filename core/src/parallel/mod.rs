//! Parallel helpers

mod atomic_float;

// Re-export.
pub use atomic_float::*;

use std::panic;
use std::thread::ScopedJoinHandle;

/// Returns the number of worker threads to use. `0` selects all logical CPUs.
///
/// * `requested` - Requested number of threads.
pub fn worker_count(requested: usize) -> usize {
    let max_threads = num_cpus::get();
    match requested {
        0 => max_threads,
        n if n > max_threads => {
            warn!("Num threads {n} > max logical CPUs {max_threads}");
            max_threads
        }
        n => n,
    }
}

/// Joins scoped workers and returns their results. If a worker panicked, the
/// first panic is raised again with its original payload once all workers
/// have finished.
///
/// * `handles` - Handles of the spawned workers.
pub fn join_workers<T>(handles: Vec<ScopedJoinHandle<'_, T>>) -> Vec<T> {
    let mut results = Vec::with_capacity(handles.len());
    let mut failure = None;
    for handle in handles {
        match handle.join() {
            Ok(result) => results.push(result),
            Err(payload) => {
                failure.get_or_insert(payload);
            }
        }
    }
    if let Some(payload) = failure {
        panic::resume_unwind(payload);
    }
    results
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn zero_requests_all_cpus() {
        assert_eq!(worker_count(0), num_cpus::get());
        assert_eq!(worker_count(1), 1);
    }

    #[test]
    fn worker_panic_keeps_its_payload() {
        let caught = panic::catch_unwind(|| {
            thread::scope(|scope| {
                let handles = (0..3)
                    .map(|i| {
                        scope.spawn(move || {
                            if i == 1 {
                                panic!("worker {i} failed");
                            }
                            i
                        })
                    })
                    .collect();
                join_workers(handles)
            })
        });
        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "worker 1 failed");
    }
}
