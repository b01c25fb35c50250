//! Abandonment timers for stalled transfers.
//!
//! A timer never touches transfer state itself. When it fires it enqueues a
//! [`TimerExpired`] carrying the generation it was armed with; the protocol
//! loop hands that to the owning handler, which compares it against its
//! current generation. An expiry that raced with a reset (or with a newer
//! transfer) is therefore a no-op.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long an active transfer may go without a new block.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Identifies a registered resource handler on the protocol loop.
pub type ResourceId = u64;

/// A timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    pub resource: ResourceId,
    pub generation: u64,
}

/// Where one resource's timers deliver their expiries.
#[derive(Debug, Clone)]
pub struct TimerBinding {
    resource: ResourceId,
    tx: mpsc::UnboundedSender<TimerExpired>,
}

impl TimerBinding {
    pub fn new(resource: ResourceId, tx: mpsc::UnboundedSender<TimerExpired>) -> Self {
        Self { resource, tx }
    }

    /// A binding with its own queue, for driving a handler outside an endpoint.
    pub fn channel(resource: ResourceId) -> (Self, mpsc::UnboundedReceiver<TimerExpired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(resource, tx), rx)
    }

    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    fn fire(&self, generation: u64) {
        let expired = TimerExpired {
            resource: self.resource,
            generation,
        };
        if self.tx.send(expired).is_err() {
            tracing::debug!(resource = self.resource, "timer fired after protocol loop closed");
        }
    }
}

/// Cancelable single-shot timer.
///
/// Arming replaces any timer already armed; dropping cancels.
#[derive(Debug, Default)]
pub struct TransferTimer {
    binding: Option<TimerBinding>,
    armed: Option<JoinHandle<()>>,
}

impl TransferTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, binding: TimerBinding) {
        self.cancel();
        self.binding = Some(binding);
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Arm for `duration`, cancelling the previous timer first.
    ///
    /// Must be called from within a tokio runtime. An unbound timer never
    /// fires.
    pub fn arm(&mut self, duration: Duration, generation: u64) {
        self.cancel();
        let Some(binding) = self.binding.clone() else {
            tracing::trace!(generation, "transfer timer not bound, expiry disabled");
            return;
        };
        self.armed = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            binding.fire(generation);
        }));
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.armed.take() {
            handle.abort();
        }
    }

    /// Armed and not yet fired.
    pub fn is_armed(&self) -> bool {
        self.armed.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TransferTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
