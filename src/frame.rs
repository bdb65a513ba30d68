//! Cancellable self-rescheduling frame loop.

use tracing::debug;

use crate::error::Result;


/// What a frame callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Stop,
}


/// Something that can call back once per display refresh, e.g. `requestAnimationFrame`.
pub trait FrameScheduler {
    type Handle: Copy;

    fn request_frame(&mut self) -> Result<Self::Handle>;

    fn cancel_frame(&mut self, handle: Self::Handle);
}


/// Keeps at most one frame request pending and knows how to cancel it.
pub struct FrameLoop<S: FrameScheduler> {
    scheduler: S,
    pending: Option<S::Handle>,
    frames: u64,
}

impl<S: FrameScheduler> FrameLoop<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            pending: None,
            frames: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Requests the first frame. Does nothing if a frame is already pending.
    pub fn start(&mut self) -> Result<()> {
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.request_frame()?);
            debug!("FrameLoop::start()");
        }
        Ok(())
    }

    /// Bookkeeping for a frame that just fired: reschedules on [FrameControl::Continue].
    pub fn on_frame(&mut self, control: FrameControl) -> Result<()> {
        self.pending = None;
        self.frames += 1;
        if control == FrameControl::Continue {
            self.pending = Some(self.scheduler.request_frame()?);
        }
        Ok(())
    }

    /// Cancels the pending frame, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
            debug!("FrameLoop::cancel(): stopped after {} frames", self.frames);
        }
    }
}
