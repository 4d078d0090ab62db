use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// A lazily computed value with single-flight initialization.
///
/// The lock is held while the value is computed, so when several threads
/// ask for it at once exactly one runs the computation and the rest block
/// until its result is published. A failed computation publishes nothing;
/// the next caller retries.
#[derive(Debug)]
pub struct Memo<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let mut slot = self.slot.lock();
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        debug!("computing memoized value");
        let value = Arc::new(init()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Drop the published value; the next `get_or_try_init` recomputes.
    pub fn invalidate(&self) {
        self.slot.lock().take();
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn concurrent_first_access_computes_once() {
        let memo = Arc::new(Memo::<u64>::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let memo = Arc::clone(&memo);
                let runs = Arc::clone(&runs);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    memo.get_or_try_init(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Ok::<_, ()>(42)
                    })
                })
            })
            .collect();

        for handle in handles {
            let value = handle.join().unwrap().unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_not_cached() {
        let memo = Memo::<u32>::new();
        assert_eq!(memo.get_or_try_init(|| Err("boom")).unwrap_err(), "boom");
        assert_eq!(*memo.get_or_try_init(|| Ok::<_, &str>(7)).unwrap(), 7);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let memo = Memo::new();
        let first = memo.get_or_try_init(|| Ok::<_, ()>(1)).unwrap();
        memo.invalidate();
        let second = memo.get_or_try_init(|| Ok::<_, ()>(2)).unwrap();
        assert_eq!((*first, *second), (1, 2));
    }
}
