//! Scheduling seam between the session state machine and a time source.
//!
//! The state machine never sleeps. It asks a `Scheduler` to deliver a
//! `TimerToken` after a delay and treats every delivered token as an ordinary
//! event. Tokens carry the session epoch they were armed in, so a token that
//! outlives its question is recognised as stale even if cancellation raced.

use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerRole {
    /// One-second countdown step.
    Tick,
    /// Delay between a resolution and the next question (or the end).
    Advance,
    /// Delay between termination and the completion handoff.
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    role: TimerRole,
    epoch: u64,
}

impl TimerToken {
    #[must_use]
    pub fn new(role: TimerRole, epoch: u64) -> Self {
        Self { role, epoch }
    }

    #[must_use]
    pub fn role(&self) -> TimerRole {
        self.role
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Opaque identifier of a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Delivers tokens back to the session after a delay.
pub trait Scheduler: Send {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle;

    /// Cancelling an unknown or already fired handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

//
// ─── TIMER SLOTS ──────────────────────────────────────────────────────────────
//

/// At most one live handle per `TimerRole`.
#[derive(Debug, Default)]
pub struct TimerSlots {
    armed: BTreeMap<TimerRole, (TimerHandle, TimerToken)>,
}

impl TimerSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `token`, cancelling whatever was armed for the same role.
    pub fn arm(
        &mut self,
        scheduler: &mut dyn Scheduler,
        delay: Duration,
        token: TimerToken,
    ) -> TimerHandle {
        self.disarm(scheduler, token.role());
        let handle = scheduler.schedule(delay, token);
        self.armed.insert(token.role(), (handle, token));
        handle
    }

    pub fn disarm(&mut self, scheduler: &mut dyn Scheduler, role: TimerRole) {
        if let Some((handle, _)) = self.armed.remove(&role) {
            scheduler.cancel(handle);
        }
    }

    pub fn disarm_all(&mut self, scheduler: &mut dyn Scheduler) {
        for (_, (handle, _)) in std::mem::take(&mut self.armed) {
            scheduler.cancel(handle);
        }
    }

    /// Accept a delivered token if it is the one currently armed for its role.
    ///
    /// The slot is cleared on acceptance. Returns `false` for stale tokens.
    pub fn take_fired(&mut self, token: TimerToken) -> bool {
        match self.armed.get(&token.role()) {
            Some((_, armed)) if *armed == token => {
                self.armed.remove(&token.role());
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_armed(&self, role: TimerRole) -> bool {
        self.armed.contains_key(&role)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

//
// ─── MANUAL SCHEDULER ─────────────────────────────────────────────────────────
//

/// Virtual-time scheduler: nothing fires until the owner asks.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerHandle, (Duration, TimerToken)>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    /// Tokens still waiting to fire, earliest first.
    #[must_use]
    pub fn pending_tokens(&self) -> Vec<TimerToken> {
        let mut entries: Vec<_> = self.pending.iter().collect();
        entries.sort_by_key(|(handle, (due, _))| (*due, **handle));
        entries.into_iter().map(|(_, (_, token))| *token).collect()
    }

    /// Remove the earliest pending timer and move virtual time to its due instant.
    pub fn fire_next(&mut self) -> Option<TimerToken> {
        let handle = self
            .pending
            .iter()
            .min_by_key(|(handle, (due, _))| (*due, **handle))
            .map(|(handle, _)| *handle)?;
        let (due, token) = self.pending.remove(&handle)?;
        self.now = self.now.max(due);
        Some(token)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle::new(self.next_id);
        self.pending.insert(handle, (self.now + delay, token));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.remove(&handle);
    }
}
