//! Entry points for the two capture inputs.
//!
//! Both inputs share one [`Cooldown`]; whichever fires first inside a window
//! wins and the other is suppressed.

use std::sync::Arc;

use log::{debug, info};

use crate::capture::{CaptureJob, JobDispatcher, TriggerSource};
use crate::cooldown::Cooldown;
use crate::hotkey::HotkeyEvent;

/// Mouse buttons as seen by the trigger. Side buttons carry their platform code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A capture job was queued
    Dispatched,
    /// Qualifying input inside the cooldown window
    CoolingDown,
    /// Queue refused the job; the cooldown was handed back
    Rejected,
    /// Not a capture input
    Ignored,
}

pub struct CaptureTrigger {
    cooldown: Arc<Cooldown>,
    dispatcher: Arc<dyn JobDispatcher>,
    capture_button: u8,
}

impl CaptureTrigger {
    pub fn new(cooldown: Arc<Cooldown>, dispatcher: Arc<dyn JobDispatcher>, capture_button: u8) -> Self {
        Self {
            cooldown,
            dispatcher,
            capture_button,
        }
    }

    pub fn on_hotkey(&self, event: HotkeyEvent) -> TriggerOutcome {
        match event {
            HotkeyEvent::CapturePressed => self.fire(TriggerSource::Hotkey),
            HotkeyEvent::CaptureReleased => TriggerOutcome::Ignored,
        }
    }

    /// Only the press transition of the configured side button qualifies.
    pub fn on_mouse_button(&self, button: MouseButton, pressed: bool) -> TriggerOutcome {
        if !pressed || button != MouseButton::Other(self.capture_button) {
            return TriggerOutcome::Ignored;
        }
        self.fire(TriggerSource::MouseButton)
    }

    fn fire(&self, source: TriggerSource) -> TriggerOutcome {
        let Some(token) = self.cooldown.try_begin() else {
            debug!("{:?} trigger suppressed by cooldown", source);
            return TriggerOutcome::CoolingDown;
        };

        if self.dispatcher.dispatch(CaptureJob { token, source }) {
            info!("📸 {:?} trigger - capturing screen under cursor...", source);
            TriggerOutcome::Dispatched
        } else {
            self.cooldown.release_early(token);
            TriggerOutcome::Rejected
        }
    }
}
