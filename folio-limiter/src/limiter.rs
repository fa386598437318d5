//! Connection-slot limiter with a FIFO wait queue.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use folio_core::constants::{DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_MAX_CONNECTIONS};
use folio_core::error::{FolioError, Result};

/// Limiter configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum number of concurrently held slots
    pub max_slots: usize,
    /// How long a queued request waits before failing, in milliseconds
    pub acquire_timeout_ms: u64,
}

impl LimiterConfig {
    /// Acquire timeout as a `Duration`.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Rejects a zero capacity.
    pub fn validate(&self) -> Result<()> {
        if self.max_slots == 0 {
            return Err(FolioError::ConfigError(
                "connection limiter needs at least one slot".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_slots: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
        }
    }
}

/// Point-in-time view of the limiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LimiterStatus {
    /// Slots currently held
    pub active: usize,
    /// Requests waiting for a slot
    pub queued: usize,
    /// Capacity
    pub max_slots: usize,
}

/// A queued acquire request.
struct Waiter {
    ticket: u64,
    grant: oneshot::Sender<()>,
}

struct LimiterState {
    active: usize,
    queue: VecDeque<Waiter>,
    next_ticket: u64,
}

/// Bounds concurrent access to the backing store.
///
/// Up to `max_slots` callers hold a slot at once. Further callers queue in
/// arrival order; each `release` hands the freed slot to the head of the queue.
/// A queued caller that is not served within the acquire timeout is removed
/// from the queue and gets [`FolioError::ConnectionTimeout`].
///
/// Every successful [`acquire`](Self::acquire) must be paired with exactly one
/// [`release`](Self::release). Prefer [`slot`](Self::slot) or [`run`](Self::run),
/// which release on every exit path.
///
/// Grant, timeout, and cancellation are all decided under one lock, so a
/// queued request is resolved exactly once.
pub struct ConnectionLimiter {
    state: Mutex<LimiterState>,
    config: LimiterConfig,
}

impl ConnectionLimiter {
    /// Creates a limiter from a validated configuration.
    pub fn new(config: LimiterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(LimiterState {
                active: 0,
                queue: VecDeque::new(),
                next_ticket: 0,
            }),
            config,
        })
    }

    /// Creates a limiter with `max_slots` capacity and the default timeout.
    pub fn with_max_slots(max_slots: usize) -> Result<Self> {
        Self::new(LimiterConfig {
            max_slots,
            ..LimiterConfig::default()
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Takes a slot, waiting in line if none is free.
    ///
    /// Fails with `ConnectionTimeout` if the request is still queued when the
    /// acquire timeout elapses. Dropping the returned future while it waits
    /// removes the request from the queue.
    pub async fn acquire(&self) -> Result<()> {
        let (ticket, mut granted) = {
            let mut state = self.state.lock();
            if state.active < self.config.max_slots {
                state.active += 1;
                trace!(active = state.active, "slot acquired");
                return Ok(());
            }

            let ticket = state.next_ticket;
            state.next_ticket += 1;
            let (tx, rx) = oneshot::channel();
            state.queue.push_back(Waiter { ticket, grant: tx });
            debug!(ticket, queued = state.queue.len(), "all slots busy, queueing");
            (ticket, rx)
        };

        let started = Instant::now();
        let mut pending = PendingAcquire {
            limiter: self,
            ticket,
            armed: true,
        };

        let outcome = tokio::time::timeout(self.config.acquire_timeout(), &mut granted).await;
        pending.armed = false;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(FolioError::InternalError(format!(
                "grant channel for ticket {} closed without a slot",
                ticket
            ))),
            Err(_) => {
                if self.withdraw(ticket) {
                    let waited_ms = started.elapsed().as_millis() as u64;
                    warn!(ticket, waited_ms, "timed out waiting for a connection slot");
                    Err(FolioError::ConnectionTimeout { waited_ms })
                } else if granted.try_recv().is_ok() {
                    // Granted after the deadline but before we took the lock
                    Ok(())
                } else {
                    Err(FolioError::InternalError(format!(
                        "ticket {} left the queue without a grant",
                        ticket
                    )))
                }
            }
        }
    }

    /// Takes a slot only if one is free right now. Never queues.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.active < self.config.max_slots {
            state.active += 1;
            true
        } else {
            false
        }
    }

    /// Returns a slot and hands it to the longest-waiting request, if any.
    ///
    /// Calling this with no slot held is a no-op (logged at `warn`).
    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.active == 0 {
            warn!("release() without a held slot, ignoring");
            return;
        }
        state.active -= 1;
        trace!(active = state.active, "slot released");
        Self::grant_next(&mut state, self.config.max_slots);
    }

    /// Acquires a slot wrapped in a guard that releases it on drop.
    pub async fn slot(&self) -> Result<ConnectionSlot<'_>> {
        self.acquire().await?;
        Ok(ConnectionSlot { limiter: self })
    }

    /// Runs `f` while holding a slot.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _slot = self.slot().await?;
        f().await
    }

    /// Returns a snapshot of held slots and queued requests.
    pub fn status(&self) -> LimiterStatus {
        let state = self.state.lock();
        LimiterStatus {
            active: state.active,
            queued: state.queue.len(),
            max_slots: self.config.max_slots,
        }
    }

    fn grant_next(state: &mut LimiterState, max_slots: usize) {
        while state.active < max_slots {
            let waiter = match state.queue.pop_front() {
                Some(waiter) => waiter,
                None => break,
            };
            state.active += 1;
            if waiter.grant.send(()).is_ok() {
                debug!(ticket = waiter.ticket, active = state.active, "slot granted to queued request");
                break;
            }
            // Receiver vanished without withdrawing; try the next one
            state.active -= 1;
        }
    }

    /// Removes `ticket` from the queue. Returns false if it was already granted.
    fn withdraw(&self, ticket: u64) -> bool {
        let mut state = self.state.lock();
        match state.queue.iter().position(|w| w.ticket == ticket) {
            Some(index) => {
                state.queue.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Cleans up a queued request whose `acquire` future is dropped mid-wait.
struct PendingAcquire<'a> {
    limiter: &'a ConnectionLimiter,
    ticket: u64,
    armed: bool,
}

impl Drop for PendingAcquire<'_> {
    fn drop(&mut self) {
        if self.armed && !self.limiter.withdraw(self.ticket) {
            // A grant reached a caller that is gone; hand the slot on
            debug!(ticket = self.ticket, "returning slot granted to cancelled request");
            self.limiter.release();
        }
    }
}

/// A held slot. Released when dropped.
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct ConnectionSlot<'a> {
    limiter: &'a ConnectionLimiter,
}

impl Drop for ConnectionSlot<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
