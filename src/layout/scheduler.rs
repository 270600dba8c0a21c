//! "Call me on the next frame" abstraction used by the drag controller to coalesce
//! pointer input into at most one geometry update per rendered frame.

/// Identifies one frame request so it can be cancelled, and so stale callbacks can be
/// told apart from the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(u64);

impl FrameToken {
    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

pub trait FrameScheduler {
    /// Ask the host to call back on its next frame.
    fn request_frame(&mut self) -> FrameToken;

    /// Withdraw an earlier request. Cancelling an unknown or already-fired token is a no-op.
    fn cancel_frame(&mut self, token: FrameToken);
}

/// A scheduler the host drives by hand: it records requests, and the host later drains
/// them and feeds each token to [`super::DragController::on_frame`].
///
/// Used for tests and for hosts that run their own frame loop.
#[derive(Debug, Default)]
pub struct ManualFrameScheduler {
    next: u64,
    pending: Vec<FrameToken>,
    cancelled: usize,
}

impl ManualFrameScheduler {
    pub fn pending(&self) -> &[FrameToken] {
        &self.pending
    }

    pub fn take_pending(&mut self) -> Vec<FrameToken> {
        std::mem::take(&mut self.pending)
    }

    /// How many requests were withdrawn before they fired.
    pub fn cancelled_count(&self) -> usize {
        self.cancelled
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&mut self) -> FrameToken {
        self.next += 1;
        let token = FrameToken(self.next);
        self.pending.push(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        let before = self.pending.len();
        self.pending.retain(|&t| t != token);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }
}

/// Scheduler for egui hosts: requests a repaint, and the host polls
/// [`super::DragController::pending_frame`] once per frame.
#[derive(Clone, Debug)]
pub struct RepaintScheduler {
    ctx: egui::Context,
    next: u64,
}

impl RepaintScheduler {
    pub fn new(ctx: egui::Context) -> Self {
        Self { ctx, next: 0 }
    }
}

impl FrameScheduler for RepaintScheduler {
    fn request_frame(&mut self) -> FrameToken {
        self.next += 1;
        self.ctx.request_repaint();
        FrameToken(self.next)
    }

    fn cancel_frame(&mut self, _token: FrameToken) {
        // A repaint that already got requested is harmless: the controller ignores
        // tokens it no longer waits for.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_removes_only_that_request() {
        let mut scheduler = ManualFrameScheduler::default();
        let a = scheduler.request_frame();
        let b = scheduler.request_frame();
        scheduler.cancel_frame(a);
        scheduler.cancel_frame(a);
        assert_eq!(scheduler.pending(), &[b]);
        assert_eq!(scheduler.cancelled_count(), 1);
    }
}
