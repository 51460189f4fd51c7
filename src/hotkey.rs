use anyhow::{bail, Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    CapturePressed,
    CaptureReleased,
}

const LETTERS: [Code; 26] = [
    Code::KeyA, Code::KeyB, Code::KeyC, Code::KeyD, Code::KeyE, Code::KeyF, Code::KeyG,
    Code::KeyH, Code::KeyI, Code::KeyJ, Code::KeyK, Code::KeyL, Code::KeyM, Code::KeyN,
    Code::KeyO, Code::KeyP, Code::KeyQ, Code::KeyR, Code::KeyS, Code::KeyT, Code::KeyU,
    Code::KeyV, Code::KeyW, Code::KeyX, Code::KeyY, Code::KeyZ,
];

const DIGITS: [Code; 10] = [
    Code::Digit0, Code::Digit1, Code::Digit2, Code::Digit3, Code::Digit4,
    Code::Digit5, Code::Digit6, Code::Digit7, Code::Digit8, Code::Digit9,
];

const FUNCTION_KEYS: [Code; 12] = [
    Code::F1, Code::F2, Code::F3, Code::F4, Code::F5, Code::F6,
    Code::F7, Code::F8, Code::F9, Code::F10, Code::F11, Code::F12,
];

/// Registers the capture hotkey and filters its events.
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    capture_hotkey: HotKey,
}

impl HotkeyManager {
    pub fn new(hotkey: &str) -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .context("Failed to create global hotkey manager")?;

        let capture_hotkey = parse_hotkey(hotkey)
            .context("Failed to parse capture hotkey")?;
        manager.register(capture_hotkey)
            .context("Failed to register capture hotkey")?;

        info!("Registered capture hotkey: {}", hotkey);

        Ok(HotkeyManager {
            manager,
            capture_hotkey,
        })
    }

    /// Next event for the capture hotkey; events of other hotkeys are dropped.
    pub fn poll_event(&self) -> Option<HotkeyEvent> {
        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            if event.id != self.capture_hotkey.id() {
                continue;
            }
            return Some(match event.state {
                HotKeyState::Pressed => HotkeyEvent::CapturePressed,
                HotKeyState::Released => HotkeyEvent::CaptureReleased,
            });
        }
        None
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        let _ = self.manager.unregister(self.capture_hotkey);
    }
}

/// Parse strings like `F2`, `Ctrl+Shift+A` or `Cmd+9`.
pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    let mut modifiers = Modifiers::empty();
    let mut key_code = None;

    for part in hotkey_str.split('+').map(str::trim).filter(|p| !p.is_empty()) {
        match part.to_lowercase().as_str() {
            "cmd" | "command" | "super" => modifiers |= Modifiers::SUPER,
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" | "option" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            key => {
                if key_code.is_some() {
                    bail!("Hotkey '{}' names more than one key", hotkey_str);
                }
                key_code = Some(parse_key_code(key)?);
            }
        }
    }

    let code = key_code.context("No key code found in hotkey string")?;
    let modifiers = (!modifiers.is_empty()).then_some(modifiers);
    Ok(HotKey::new(modifiers, code))
}

fn parse_key_code(key: &str) -> Result<Code> {
    let upper = key.to_uppercase();
    let mut chars = upper.chars();

    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_uppercase() {
            return Ok(LETTERS[(c as u8 - b'A') as usize]);
        }
        if let Some(d) = c.to_digit(10) {
            return Ok(DIGITS[d as usize]);
        }
    }

    if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<usize>().ok()) {
        if (1..=FUNCTION_KEYS.len()).contains(&n) {
            return Ok(FUNCTION_KEYS[n - 1]);
        }
    }

    match upper.as_str() {
        "SPACE" => Ok(Code::Space),
        "ENTER" | "RETURN" => Ok(Code::Enter),
        "TAB" => Ok(Code::Tab),
        "ESCAPE" | "ESC" => Ok(Code::Escape),
        "PRINTSCREEN" | "PRTSC" => Ok(Code::PrintScreen),
        "PAUSE" => Ok(Code::Pause),
        _ => bail!("Unknown key code: {}", key),
    }
}
