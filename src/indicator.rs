//! Status indicator state and the commands that drive it.
//!
//! Pipeline threads never touch the tray directly. They hold an
//! [`IndicatorHandle`] that posts [`IndicatorCommand`]s to the event loop,
//! which applies them to the [`StatusIndicator`] it owns.

use std::sync::mpsc::{channel, Receiver, Sender};

use log::{info, warn};

use crate::constants::indicator::{
    IDLE_LABEL, IDLE_TOOLTIP, NINJA_TOOLTIP, PROCESSING_LABEL, PROCESSING_TOOLTIP,
};
use crate::icon::IconFace;
use crate::shutdown::ShutdownSignal;

/// Status updates the answer pipeline can issue from any thread.
pub trait StatusSink: Send + Sync {
    fn show_processing(&self);
    fn show_answer(&self, text: &str);
    fn reset(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorCommand {
    ShowProcessing,
    ShowAnswer(String),
    Reset,
}

/// Cloneable sender side of the indicator channel.
#[derive(Debug, Clone)]
pub struct IndicatorHandle {
    tx: Sender<IndicatorCommand>,
}

pub fn channel_pair() -> (IndicatorHandle, Receiver<IndicatorCommand>) {
    let (tx, rx) = channel();
    (IndicatorHandle { tx }, rx)
}

impl IndicatorHandle {
    fn post(&self, command: IndicatorCommand) {
        if self.tx.send(command).is_err() {
            warn!("⚠️  Indicator event loop is gone, dropping status update");
        }
    }
}

impl StatusSink for IndicatorHandle {
    fn show_processing(&self) {
        self.post(IndicatorCommand::ShowProcessing);
    }

    fn show_answer(&self, text: &str) {
        self.post(IndicatorCommand::ShowAnswer(text.to_string()));
    }

    fn reset(&self) {
        self.post(IndicatorCommand::Reset);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Idle,
    Processing,
    Answer,
}

/// What the tray should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendering {
    pub face: IconFace,
    pub tooltip: String,
}

/// Latest answer plus display mode. Pure data, no UI.
#[derive(Debug, Clone)]
pub struct AnswerState {
    view: View,
    answer: Option<String>,
    ninja: bool,
}

impl AnswerState {
    pub fn new(ninja: bool) -> Self {
        Self {
            view: View::Idle,
            answer: None,
            ninja,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn show_processing(&mut self) {
        self.view = View::Processing;
    }

    /// Blank answers are ignored so the icon never goes empty.
    pub fn show_answer(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.answer = Some(text.to_string());
        self.view = View::Answer;
        true
    }

    pub fn reset(&mut self) {
        self.answer = None;
        self.view = View::Idle;
    }

    pub fn toggle_ninja(&mut self) -> bool {
        self.ninja = !self.ninja;
        self.ninja
    }

    pub fn render(&self) -> Rendering {
        match (self.view, self.ninja) {
            (View::Idle, _) => Rendering {
                face: IconFace::Label(IDLE_LABEL.to_string()),
                tooltip: IDLE_TOOLTIP.to_string(),
            },
            (View::Processing, false) => Rendering {
                face: IconFace::Label(PROCESSING_LABEL.to_string()),
                tooltip: PROCESSING_TOOLTIP.to_string(),
            },
            (View::Processing, true) => Rendering {
                face: IconFace::dots(self.answer.as_deref().unwrap_or(""), true),
                tooltip: NINJA_TOOLTIP.to_string(),
            },
            (View::Answer, false) => {
                let answer = self.answer.clone().unwrap_or_default();
                Rendering {
                    face: IconFace::Label(answer.clone()),
                    tooltip: answer,
                }
            }
            (View::Answer, true) => Rendering {
                face: IconFace::dots(self.answer.as_deref().unwrap_or(""), false),
                tooltip: NINJA_TOOLTIP.to_string(),
            },
        }
    }
}

/// Whatever actually shows a [`Rendering`] (the tray, or a test double).
pub trait Surface {
    fn present(&mut self, rendering: &Rendering);
    fn set_ninja_checked(&mut self, _checked: bool) {}
}

/// The single on-screen indicator, owned by the event loop thread.
pub struct StatusIndicator<S: Surface> {
    state: AnswerState,
    surface: S,
    shutdown: ShutdownSignal,
}

impl<S: Surface> StatusIndicator<S> {
    pub fn new(surface: S, ninja: bool, shutdown: ShutdownSignal) -> Self {
        let mut indicator = Self {
            state: AnswerState::new(ninja),
            surface,
            shutdown,
        };
        indicator.surface.set_ninja_checked(ninja);
        indicator.redraw();
        indicator
    }

    pub fn state(&self) -> &AnswerState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn apply(&mut self, command: IndicatorCommand) {
        match command {
            IndicatorCommand::ShowProcessing => self.show_processing(),
            IndicatorCommand::ShowAnswer(text) => self.show_answer(&text),
            IndicatorCommand::Reset => self.reset(),
        }
    }

    pub fn show_processing(&mut self) {
        self.state.show_processing();
        self.redraw();
    }

    pub fn show_answer(&mut self, text: &str) {
        if self.state.show_answer(text) {
            info!("✅ Answer: {}", text.trim());
            self.redraw();
        } else {
            warn!("⚠️  Empty answer, indicator left unchanged");
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.redraw();
    }

    /// Flip ninja mode and redraw whatever is currently shown.
    pub fn toggle_obfuscation_mode(&mut self) {
        let ninja = self.state.toggle_ninja();
        info!("Ninja mode {}", if ninja { "on" } else { "off" });
        self.surface.set_ninja_checked(ninja);
        self.redraw();
    }

    /// Signal process-wide shutdown; the event loop exits on its next tick.
    pub fn request_exit(&mut self) {
        info!("Exit requested from the tray menu");
        self.shutdown.trigger();
    }

    fn redraw(&mut self) {
        let rendering = self.state.render();
        self.surface.present(&rendering);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::DotCell;

    #[derive(Default)]
    struct RecordingSurface {
        frames: Vec<Rendering>,
        ninja_checked: Option<bool>,
    }

    impl Surface for RecordingSurface {
        fn present(&mut self, rendering: &Rendering) {
            self.frames.push(rendering.clone());
        }

        fn set_ninja_checked(&mut self, checked: bool) {
            self.ninja_checked = Some(checked);
        }
    }

    fn indicator(ninja: bool) -> StatusIndicator<RecordingSurface> {
        StatusIndicator::new(RecordingSurface::default(), ninja, ShutdownSignal::new())
    }

    #[test]
    fn test_starts_idle() {
        let indicator = indicator(false);
        assert_eq!(indicator.surface().frames.len(), 1);
        assert_eq!(
            indicator.surface().frames[0].face,
            IconFace::Label(IDLE_LABEL.to_string())
        );
    }

    #[test]
    fn test_answer_is_trimmed() {
        let mut indicator = indicator(false);
        indicator.apply(IndicatorCommand::ShowAnswer(" AC\n".to_string()));

        let last = indicator.surface().frames.last().unwrap();
        assert_eq!(last.face, IconFace::Label("AC".to_string()));
        assert_eq!(last.tooltip, "AC");
    }

    #[test]
    fn test_blank_answer_does_not_redraw() {
        let mut indicator = indicator(false);
        indicator.show_answer("   ");
        assert_eq!(indicator.surface().frames.len(), 1);
        assert_eq!(indicator.state().view(), View::Idle);
    }

    #[test]
    fn test_processing_in_normal_mode() {
        let mut indicator = indicator(false);
        indicator.show_processing();
        assert_eq!(
            indicator.surface().frames.last().unwrap().face,
            IconFace::Label(PROCESSING_LABEL.to_string())
        );
    }

    #[test]
    fn test_processing_in_ninja_mode_keeps_previous_dots() {
        let mut indicator = indicator(true);
        indicator.show_answer("B");
        indicator.show_processing();

        match &indicator.surface().frames.last().unwrap().face {
            IconFace::Dots { lit, marker } => {
                assert_eq!(lit, &vec![DotCell { col: 1, row: 0 }]);
                assert!(*marker);
            }
            other => panic!("Expected dots, got {:?}", other),
        }
    }

    #[test]
    fn test_reset_clears_answer() {
        let mut indicator = indicator(false);
        indicator.show_answer("D");
        indicator.apply(IndicatorCommand::Reset);

        assert_eq!(indicator.state().answer(), None);
        assert_eq!(
            indicator.surface().frames.last().unwrap().tooltip,
            IDLE_TOOLTIP
        );
    }

    #[test]
    fn test_toggle_rerenders_current_answer() {
        let mut indicator = indicator(false);
        indicator.show_answer("AC");
        let frames_before = indicator.surface().frames.len();

        indicator.toggle_obfuscation_mode();

        assert_eq!(indicator.surface().frames.len(), frames_before + 1);
        assert_eq!(indicator.surface().ninja_checked, Some(true));
        assert_eq!(indicator.state().answer(), Some("AC"));
        match &indicator.surface().frames.last().unwrap().face {
            IconFace::Dots { lit, marker } => {
                assert_eq!(lit.len(), 2);
                assert!(!marker);
            }
            other => panic!("Expected dots, got {:?}", other),
        }
        assert_eq!(indicator.surface().frames.last().unwrap().tooltip, NINJA_TOOLTIP);

        indicator.toggle_obfuscation_mode();
        assert_eq!(
            indicator.surface().frames.last().unwrap().face,
            IconFace::Label("AC".to_string())
        );
    }

    #[test]
    fn test_toggle_while_idle_stays_idle() {
        let mut indicator = indicator(false);
        indicator.toggle_obfuscation_mode();
        assert_eq!(
            indicator.surface().frames.last().unwrap().face,
            IconFace::Label(IDLE_LABEL.to_string())
        );
    }

    #[test]
    fn test_request_exit_sets_shutdown() {
        let shutdown = ShutdownSignal::new();
        let mut indicator =
            StatusIndicator::new(RecordingSurface::default(), false, shutdown.clone());
        indicator.request_exit();
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_handle_posts_commands() {
        let (handle, rx) = channel_pair();
        handle.show_processing();
        handle.show_answer("B");
        handle.reset();

        let commands: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            commands,
            vec![
                IndicatorCommand::ShowProcessing,
                IndicatorCommand::ShowAnswer("B".to_string()),
                IndicatorCommand::Reset,
            ]
        );
    }
}
