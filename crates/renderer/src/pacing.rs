//! Bounds the number of frames the GPU has not finished yet.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct Permits {
    available: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
}

impl Permits {
    fn release(&self) {
        let mut available = self.available.lock();
        debug_assert!(*available < self.capacity);
        *available += 1;
        self.freed.notify_one();
    }
}

/// Counting semaphore handing out [`InFlightPermit`]s.
#[derive(Clone)]
pub struct FramePacer {
    permits: Arc<Permits>,
}

impl FramePacer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "frame pacer needs at least one permit");
        Self {
            permits: Arc::new(Permits {
                available: Mutex::new(capacity),
                freed: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Block until a permit is free.
    pub fn acquire(&self) -> InFlightPermit {
        let mut available = self.permits.available.lock();
        while *available == 0 {
            self.permits.freed.wait(&mut available);
        }
        *available -= 1;
        InFlightPermit {
            permits: Arc::clone(&self.permits),
        }
    }

    pub fn try_acquire(&self) -> Option<InFlightPermit> {
        let mut available = self.permits.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(InFlightPermit {
            permits: Arc::clone(&self.permits),
        })
    }

    pub fn available(&self) -> usize {
        *self.permits.available.lock()
    }
}

/// One frame's claim on the pacer. Released on drop.
pub struct InFlightPermit {
    permits: Arc<Permits>,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.permits.release();
    }
}

impl std::fmt::Debug for InFlightPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightPermit").finish_non_exhaustive()
    }
}

/// Markers of the most recent submissions, oldest first, so a blocked frame
/// can wait for exactly the oldest one instead of draining the queue.
#[derive(Debug)]
pub struct InFlightSubmissions<T> {
    pending: VecDeque<T>,
    capacity: usize,
}

impl<T> InFlightSubmissions<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a submission. Beyond `capacity`, the oldest marker is
    /// forgotten: its frame is necessarily complete by then.
    pub fn push(&mut self, marker: T) {
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(marker);
    }

    pub fn take_oldest(&mut self) -> Option<T> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
