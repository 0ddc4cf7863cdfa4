// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scoped worker pool where the first error wins.

use std::panic;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

/// Number of workers for `items` work items on `threads` requested threads.
pub(crate) fn pool_size(threads: usize, items: usize) -> usize {
    threads.min(items).max(1)
}

/// Apply `work` to every item on up to `threads` workers.
///
/// Items are claimed through a shared counter. Once any call fails, workers stop
/// claiming new items, and the first recorded error is returned after every worker
/// has joined. On success, results come back in item order.
///
/// A panicking worker is re-raised on the calling thread.
pub(crate) fn run<T, R, E, F>(items: &[T], threads: usize, work: F) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(usize, &T) -> Result<R, E> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let next = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let first_error: Mutex<Option<E>> = Mutex::new(None);

    let mut done: Vec<(usize, R)> = Vec::with_capacity(items.len());
    thread::scope(|s| {
        let workers = pool_size(threads, items.len());
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(s.spawn(|| {
                let mut local = Vec::new();
                while !failed.load(Ordering::Relaxed) {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(i) else { break };
                    match work(i, item) {
                        Ok(r) => local.push((i, r)),
                        Err(e) => {
                            failed.store(true, Ordering::Relaxed);
                            let mut slot =
                                first_error.lock().unwrap_or_else(PoisonError::into_inner);
                            slot.get_or_insert(e);
                            break;
                        }
                    }
                }
                local
            }));
        }
        for h in handles {
            match h.join() {
                Ok(local) => done.extend(local),
                Err(payload) => panic::resume_unwind(payload),
            }
        }
    });

    if let Some(e) = first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        return Err(e);
    }
    done.sort_unstable_by_key(|(i, _)| *i);
    Ok(done.into_iter().map(|(_, r)| r).collect())
}
