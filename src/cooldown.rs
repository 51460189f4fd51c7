//! Timer-based rate limiter shared by every capture trigger.
//!
//! A trigger that wins [`Cooldown::try_begin`] holds the window for its full
//! duration whether or not the capture succeeds. Only the holder can end the
//! window early, through its token.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Proof of having started the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownToken(u64);

#[derive(Debug, Default)]
struct Window {
    until: Option<Instant>,
    generation: u64,
}

#[derive(Debug)]
pub struct Cooldown {
    duration: Duration,
    window: Mutex<Window>,
}

impl Cooldown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            window: Mutex::new(Window::default()),
        }
    }

    /// Start a new window unless one is running.
    pub fn try_begin(&self) -> Option<CooldownToken> {
        let now = Instant::now();
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());

        if window.until.is_some_and(|until| now < until) {
            return None;
        }

        window.generation = window.generation.wrapping_add(1);
        window.until = Some(now + self.duration);
        Some(CooldownToken(window.generation))
    }

    /// End the window now. Ignored if `token` no longer owns the window.
    pub fn release_early(&self, token: CooldownToken) -> bool {
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        if window.generation != token.0 || window.until.is_none() {
            return false;
        }
        window.until = None;
        true
    }

    pub fn is_active(&self) -> bool {
        let window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        window.until.is_some_and(|until| Instant::now() < until)
    }
}
