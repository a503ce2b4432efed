/// ----- SHUTDOWN MODULE -----
/// A process-wide stop signal. Nothing is ever sent on the channel; the
/// trigger drops the only sender, so every clone of the receiver observes
/// the disconnect at once, whether it is blocked in `select!` or in a backoff.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

#[derive(Clone)]
pub struct Shutdown {
    rx: Receiver<()>,
}

#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = bounded(0);
    (ShutdownTrigger { tx: Arc::new(Mutex::new(Some(tx))) }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.lock().take();
    }
}

impl Shutdown {
    /// For use as a `recv` arm in `select!`; it fires once shutdown is requested.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    pub fn is_requested(&self) -> bool {
        matches!(self.rx.try_recv(), Err(crossbeam_channel::TryRecvError::Disconnected))
    }

    /// Sleeps for `duration`. Returns `true` if shutdown cut the wait short.
    pub fn wait(&self, duration: Duration) -> bool {
        match self.rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => false,
            _ => true,
        }
    }
}
