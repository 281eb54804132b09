use crossbeam_channel::{unbounded, RecvTimeoutError};
use tracing::{debug, warn};

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

/// Splits `items` into chunks, processes each chunk on its own thread and collects the results in
/// the original item order.
///
/// Once `deadline` has elapsed without every item having been processed, `on_deadline` is invoked
/// exactly once from the calling thread. It is expected to signal the workers to wind down (e.g.
/// by setting a shared cancellation flag); the pool keeps collecting results until every worker
/// has reported back.
///
/// # Panics
///
/// If `f` panics on any item, the panic is resumed on the calling thread once every worker has
/// stopped, so a returned vector always holds exactly one result per item.
///
/// ```
/// use sleipnir_common::utils::threading::deadline_pool;
/// use std::time::Duration;
///
/// let results = deadline_pool(vec![1, 2, 3, 4, 5], 2, Duration::from_secs(10), || {}, |x| x * 2);
/// assert_eq!(results, vec![2, 4, 6, 8, 10]);
/// ```
pub fn deadline_pool<T, R, F, C>(
    items: Vec<T>,
    num_threads: usize,
    deadline: Duration,
    on_deadline: C,
    f: F,
) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
    C: FnOnce(),
{
    if items.is_empty() {
        return Vec::new();
    }

    let total = items.len();
    let (tx, rx) = unbounded::<(usize, R)>();
    let mut handles = Vec::new();

    // split items into one chunk per thread, remembering each item's position
    let chunk_size = total.div_ceil(num_threads.max(1));
    let mut indexed = items.into_iter().enumerate().peekable();
    let shared_f = Arc::new(f);

    while indexed.peek().is_some() {
        let chunk: Vec<(usize, T)> = indexed.by_ref().take(chunk_size).collect();
        let tx = tx.clone();
        let shared_f = Arc::clone(&shared_f);
        handles.push(thread::spawn(move || {
            for (index, item) in chunk {
                if tx.send((index, shared_f(item))).is_err() {
                    return;
                }
            }
        }));
    }
    drop(tx);

    let started = Instant::now();
    let mut on_deadline = Some(on_deadline);
    let mut results: Vec<Option<R>> = (0..total).map(|_| None).collect();
    let mut received = 0;

    while received < total {
        let message = if on_deadline.is_some() {
            match rx.recv_timeout(deadline.saturating_sub(started.elapsed())) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => {
                    debug!(elapsed = ?started.elapsed(), pending = total - received, "deadline reached");
                    if let Some(callback) = on_deadline.take() {
                        callback();
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => None,
            }
        } else {
            rx.recv().ok()
        };

        match message {
            Some((index, result)) => {
                results[index] = Some(result);
                received += 1;
            }
            // every worker has exited
            None => break,
        }
    }

    let mut panicked = None;
    for handle in handles {
        if let Err(payload) = handle.join() {
            warn!("worker thread panicked");
            panicked.get_or_insert(payload);
        }
    }
    if let Some(payload) = panicked {
        std::panic::resume_unwind(payload);
    }

    results.into_iter().flatten().collect()
}
