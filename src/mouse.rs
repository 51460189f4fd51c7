//! Global mouse listener: feeds side-button presses to the trigger and keeps
//! the tracked cursor position current.
//!
//! rdev's `listen` never returns while the hook is alive, so it runs on its
//! own thread and is left to die with the process.
//!
//! Captures ask the OS for the cursor through [`SystemCursor`]; the tracked
//! position only stands in when that query fails.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use enigo::{Enigo, Mouse, Settings};
use log::{debug, error, info};
use rdev::{listen, Button, Event, EventType};

use crate::display::{CursorSource, LocateError, TrackedCursor};
use crate::trigger::{CaptureTrigger, MouseButton};

impl From<Button> for MouseButton {
    fn from(button: Button) -> Self {
        match button {
            Button::Left => MouseButton::Left,
            Button::Right => MouseButton::Right,
            Button::Middle => MouseButton::Middle,
            Button::Unknown(code) => MouseButton::Other(code),
        }
    }
}

fn handle_event(event: &Event, trigger: &CaptureTrigger, cursor: &TrackedCursor) {
    match event.event_type {
        EventType::MouseMove { x, y } => cursor.update(x, y),
        EventType::ButtonPress(button) => {
            trigger.on_mouse_button(button.into(), true);
        }
        EventType::ButtonRelease(button) => {
            trigger.on_mouse_button(button.into(), false);
        }
        _ => {}
    }
}

type PositionQuery = fn() -> Result<(i32, i32), String>;

fn query_os_cursor() -> Result<(i32, i32), String> {
    let enigo = Enigo::new(&Settings::default()).map_err(|e| e.to_string())?;
    enigo.location().map_err(|e| e.to_string())
}

/// Cursor position read from the OS at capture time.
pub struct SystemCursor {
    query: PositionQuery,
    fallback: Arc<TrackedCursor>,
}

impl SystemCursor {
    pub fn new(fallback: Arc<TrackedCursor>) -> Self {
        Self::with_query(query_os_cursor, fallback)
    }

    fn with_query(query: PositionQuery, fallback: Arc<TrackedCursor>) -> Self {
        Self { query, fallback }
    }
}

impl CursorSource for SystemCursor {
    fn position(&self) -> Result<(i32, i32), LocateError> {
        match (self.query)() {
            Ok(position) => Ok(position),
            Err(e) => {
                debug!("OS cursor query failed ({}), using last tracked position", e);
                self.fallback.position()
            }
        }
    }
}

pub fn spawn_listener(trigger: Arc<CaptureTrigger>, cursor: Arc<TrackedCursor>) -> Result<()> {
    thread::Builder::new()
        .name("mouse-listener".to_string())
        .spawn(move || {
            info!("🖱️  Listening for the capture mouse button...");
            if let Err(e) = listen(move |event| handle_event(&event, &trigger, &cursor)) {
                error!("❌ Mouse listener stopped: {:?}", e);
            }
        })
        .context("Failed to spawn mouse listener thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureJob, JobDispatcher};
    use crate::cooldown::Cooldown;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};

    #[derive(Default)]
    struct CountingDispatcher(AtomicUsize);

    impl JobDispatcher for CountingDispatcher {
        fn dispatch(&self, _job: CaptureJob) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn event(event_type: EventType) -> Event {
        Event { time: SystemTime::now(), name: None, event_type }
    }

    #[test]
    fn test_button_mapping() {
        assert_eq!(MouseButton::from(Button::Unknown(9)), MouseButton::Other(9));
        assert_eq!(MouseButton::from(Button::Middle), MouseButton::Middle);
    }

    #[test]
    fn test_events_reach_trigger_and_cursor() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let trigger = CaptureTrigger::new(
            Arc::new(Cooldown::new(Duration::from_secs(60))),
            dispatcher.clone(),
            9,
        );
        let cursor = TrackedCursor::new();

        handle_event(&event(EventType::MouseMove { x: 300.0, y: 40.5 }), &trigger, &cursor);
        handle_event(&event(EventType::ButtonRelease(Button::Unknown(9))), &trigger, &cursor);
        handle_event(&event(EventType::ButtonPress(Button::Left)), &trigger, &cursor);
        assert_eq!(dispatcher.0.load(Ordering::SeqCst), 0);

        handle_event(&event(EventType::ButtonPress(Button::Unknown(9))), &trigger, &cursor);
        assert_eq!(dispatcher.0.load(Ordering::SeqCst), 1);
        assert_eq!(cursor.position().unwrap(), (300, 40));
    }

    #[test]
    fn test_os_position_wins_before_any_movement() {
        let tracked = Arc::new(TrackedCursor::new());
        let cursor = SystemCursor::with_query(|| Ok((1500, 20)), tracked);
        assert_eq!(cursor.position().unwrap(), (1500, 20));
    }

    #[test]
    fn test_falls_back_to_tracked_position() {
        let tracked = Arc::new(TrackedCursor::new());
        let cursor = SystemCursor::with_query(|| Err("no display connection".to_string()), tracked.clone());
        assert!(matches!(cursor.position(), Err(LocateError::CursorUnavailable(_))));

        tracked.update(64.9, 12.0);
        assert_eq!(cursor.position().unwrap(), (64, 12));
    }
}
