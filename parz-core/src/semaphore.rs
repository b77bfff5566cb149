use std::sync::{Condvar, Mutex, PoisonError};

/// Counting semaphore used for worker admission only.
pub struct Semaphore {
    permits: Mutex<usize>,
    cvar: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self { permits: Mutex::new(permits), cvar: Condvar::new() }
    }

    /// Block until a slot is free. The slot returns when the permit drops.
    pub fn acquire(&self) -> Permit<'_> {
        let mut n = self.permits.lock().unwrap_or_else(PoisonError::into_inner);
        while *n == 0 {
            n = self.cvar.wait(n).unwrap_or_else(PoisonError::into_inner);
        }
        *n -= 1;
        Permit { sem: self }
    }

    pub fn available(&self) -> usize {
        *self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        *self.permits.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.cvar.notify_one();
    }
}

pub struct Permit<'a> {
    sem: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
