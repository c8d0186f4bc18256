// Autosave scheduling for the session controller.
//
// At most one save is pending at a time. Scheduling again replaces the
// previous deadline, so a burst of edits collapses into a single save
// `delay` after the last one.

use std::time::Duration;

use tokio::time::Instant;

/// Default quiet period before an autosave fires.
pub const DEFAULT_AUTOSAVE_MS: u64 = 2000;
/// Minimum allowed quiet period.
const MIN_AUTOSAVE_MS: u64 = 250;
/// Maximum allowed quiet period.
const MAX_AUTOSAVE_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub delay: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { delay: Duration::from_millis(DEFAULT_AUTOSAVE_MS) }
    }
}

impl AutosaveConfig {
    /// Create a config with the given delay in milliseconds, clamped to [250, 60000].
    pub fn with_millis(ms: u64) -> Self {
        Self { delay: Duration::from_millis(ms.clamp(MIN_AUTOSAVE_MS, MAX_AUTOSAVE_MS)) }
    }
}

/// Identifies one scheduled save. A fresh handle is issued on every
/// schedule, so a stale handle never matches the pending one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AutosaveHandle(u64);

#[derive(Debug, Clone, Copy)]
struct Pending {
    handle: AutosaveHandle,
    deadline: Instant,
}

#[derive(Debug)]
pub struct AutosaveTimer {
    config: AutosaveConfig,
    pending: Option<Pending>,
    next_handle: u64,
}

impl AutosaveTimer {
    pub fn new(config: AutosaveConfig) -> Self {
        Self { config, pending: None, next_handle: 0 }
    }

    pub fn config(&self) -> AutosaveConfig {
        self.config
    }

    /// Schedule a save `delay` from now, replacing any pending one.
    pub fn schedule(&mut self) -> AutosaveHandle {
        self.schedule_at(Instant::now())
    }

    /// Like `schedule` but with a specific timestamp.
    pub fn schedule_at(&mut self, now: Instant) -> AutosaveHandle {
        self.next_handle += 1;
        let handle = AutosaveHandle(self.next_handle);
        self.pending = Some(Pending { handle, deadline: now + self.config.delay });
        handle
    }

    /// Drop the pending save, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn pending(&self) -> Option<AutosaveHandle> {
        self.pending.map(|p| p.handle)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Take the pending save if its deadline has passed.
    pub fn take_due_at(&mut self, now: Instant) -> Option<AutosaveHandle> {
        match self.pending {
            Some(p) if now >= p.deadline => {
                self.pending = None;
                Some(p.handle)
            }
            _ => None,
        }
    }

    /// Take the pending save regardless of its deadline.
    pub fn take(&mut self) -> Option<AutosaveHandle> {
        self.pending.take().map(|p| p.handle)
    }
}
