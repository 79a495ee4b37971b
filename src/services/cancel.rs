//! Cooperative cancellation for simulation and batch runs.
//!
//! Cancellation is observed between rounds only: a round that has started is
//! allowed to finish and be recorded.

use tokio::sync::watch;

/// Owner side; dropping it does not cancel.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observer side, cloned into every run that should stop on cancel.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelSignal { rx })
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = CancelHandle::new();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_reaches_every_signal() {
        let (handle, first) = CancelHandle::new();
        let second = first.clone();
        let third = handle.signal();
        assert!(!first.is_cancelled());

        handle.cancel();
        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
        assert!(third.is_cancelled());
    }

    #[test]
    fn test_never_stays_clear() {
        let signal = CancelSignal::never();
        assert!(!signal.is_cancelled());
    }
}
