use std::sync::atomic::{AtomicBool, Ordering};

/// Single-pass latch. At most one [`RunPermit`] exists at a time.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another permit is alive.
    pub fn try_acquire(&self) -> Option<RunPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears the latch when dropped, on every exit path including unwinding.
#[derive(Debug)]
pub struct RunPermit<'a> {
    guard: &'a RunGuard,
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}
