use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Session settings the operator can change while probes run.
///
/// Each field is its own atomic. Readers may see a change one cycle late.
#[derive(Debug)]
pub struct ControlState {
    running: AtomicBool,
    paused: AtomicBool,
    verbose: AtomicBool,
    debug: AtomicBool,
    lost_only: AtomicBool,
    extra_sleep: AtomicU32,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            verbose: AtomicBool::new(false),
            debug: AtomicBool::new(false),
            lost_only: AtomicBool::new(false),
            extra_sleep: AtomicU32::new(0),
        }
    }

    pub fn with_verbose(self, verbose: bool) -> Self {
        self.verbose.store(verbose, Ordering::Relaxed);
        self
    }

    pub fn with_lost_only(self, lost_only: bool) -> Self {
        self.lost_only.store(lost_only, Ordering::Relaxed);
        self
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn lost_only(&self) -> bool {
        self.lost_only.load(Ordering::Relaxed)
    }

    /// Returns the new value.
    pub fn toggle_verbose(&self) -> bool {
        !self.verbose.fetch_xor(true, Ordering::Relaxed)
    }

    /// Returns the new value.
    pub fn toggle_debug(&self) -> bool {
        !self.debug.fetch_xor(true, Ordering::Relaxed)
    }

    /// Returns the new value.
    pub fn toggle_lost_only(&self) -> bool {
        !self.lost_only.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn extra_sleep(&self) -> u32 {
        self.extra_sleep.load(Ordering::Relaxed)
    }

    pub fn set_extra_sleep(&self, seconds: u32) {
        self.extra_sleep.store(seconds, Ordering::Relaxed);
    }

    pub fn increase_extra_sleep(&self) -> u32 {
        self.adjust_extra_sleep(|secs| secs.saturating_add(1))
    }

    /// Never goes below zero.
    pub fn decrease_extra_sleep(&self) -> u32 {
        self.adjust_extra_sleep(|secs| secs.saturating_sub(1))
    }

    fn adjust_extra_sleep(&self, f: impl Fn(u32) -> u32) -> u32 {
        let previous = self
            .extra_sleep
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |secs| Some(f(secs)))
            .unwrap_or_else(|current| current);
        f(previous)
    }
}
