/// Handle for one scheduled frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameTicket(u64);

/// Cancellable chain of frame callbacks.
///
/// At most one frame is pending at a time. The host fires it with [`FrameLoop::take`]; the
/// frame handler re-requests only while playback continues, and [`FrameLoop::cancel`] leaves
/// nothing pending.
#[derive(Debug, Default)]
pub struct FrameLoop {
    pending: Option<FrameTicket>,
    issued: u64,
}

impl FrameLoop {
    /// Create an idle loop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the next frame. Returns the already pending ticket if there is one.
    pub fn request(&mut self) -> FrameTicket {
        if let Some(t) = self.pending {
            return t;
        }
        self.issued += 1;
        let t = FrameTicket(self.issued);
        self.pending = Some(t);
        t
    }

    /// Consume the pending frame, if any.
    pub fn take(&mut self) -> Option<FrameTicket> {
        self.pending.take()
    }

    /// Drop the pending frame. Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Return `true` while a frame is pending.
    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }
}
