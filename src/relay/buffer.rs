//! Single-slot frame store shared by the capture and broadcast loops.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::video::Frame;

/// Holds exactly one frame. Writers replace it whole; readers get a shared
/// snapshot that later writes never touch.
#[derive(Debug)]
pub struct FrameBuffer {
    slot: Mutex<Arc<Frame>>,
}

impl FrameBuffer {
    pub fn new(initial: Frame) -> Self {
        Self {
            slot: Mutex::new(Arc::new(initial)),
        }
    }

    /// Replace the stored frame. No queueing: the previous frame is discarded.
    pub fn write(&self, frame: Frame) {
        let frame = Arc::new(frame);
        let previous = std::mem::replace(&mut *self.lock(), frame);
        // Free the old pixels outside the lock.
        drop(previous);
    }

    /// Snapshot of the current frame.
    pub fn read(&self) -> Arc<Frame> {
        Arc::clone(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Frame>> {
        // A panicking writer cannot leave a partial frame behind: the slot is
        // only ever assigned a complete Arc.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
