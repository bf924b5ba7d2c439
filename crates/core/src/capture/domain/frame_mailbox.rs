use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::shared::frame::Frame;

/// Single-slot relay between the capture delivery thread and the consumer.
///
/// `publish` overwrites whatever is stored; there is no queue and the
/// producer never waits on the reader. The lock only guards a pointer swap,
/// and the displaced frame is dropped after the lock is released.
#[derive(Debug, Default)]
pub struct FrameMailbox {
    slot: Mutex<Option<Arc<Frame>>>,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);
        let previous = self.lock().replace(frame);
        drop(previous);
    }

    /// Returns the most recently published frame without consuming it.
    pub fn peek_latest(&self) -> Option<Arc<Frame>> {
        self.lock().clone()
    }

    /// Drops the stored frame.
    pub fn clear(&self) {
        let previous = self.lock().take();
        drop(previous);
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Frame>>> {
        // The slot holds no invariant a panicking holder could break.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
