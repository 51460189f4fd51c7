/// Application-wide constants for capture, inference and the tray indicator

pub mod capture {
    /// Folder (relative to the working directory) that receives captures
    pub const DEFAULT_FOLDER: &str = "capturas";

    /// Suppression window after a trigger fires
    pub const DEFAULT_COOLDOWN_MS: u64 = 2000;

    /// Time given to the writer to flush a new file before it is read
    pub const DEFAULT_STABILITY_DELAY_MS: u64 = 500;

    pub const FILE_PREFIX: &str = "capture_";

    /// chrono format for capture names, microsecond resolution
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

    /// Extensions the watcher hands to the pipeline (compared case-insensitively)
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

    pub const DEFAULT_HOTKEY: &str = "F2";

    /// Platform button code of the "forward" side button as reported by rdev
    #[cfg(target_os = "windows")]
    pub const DEFAULT_MOUSE_BUTTON: u8 = 2;
    #[cfg(target_os = "macos")]
    pub const DEFAULT_MOUSE_BUTTON: u8 = 4;
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    pub const DEFAULT_MOUSE_BUTTON: u8 = 9;
}

pub mod worker {
    /// Maximum number of capture jobs waiting for the capture thread.
    /// The cooldown already rate-limits triggers, so this only absorbs bursts.
    pub const MAX_PENDING_CAPTURES: usize = 2;
}

pub mod inference {
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

    pub const ENDPOINT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

    /// Delimiter the prompt asks the model to wrap its letters in
    pub const ANSWER_DELIMITER: char = '#';

    pub const PROMPT: &str = "Analyze the question and the answer options in the image.
Return ONLY the letter of the correct option or options, counting from #A#.
- If there is a single correct answer (e.g. the second option), return: #B#
- If several answers are correct (e.g. the first and the third), return the letters together: #AC#
- Do not add text, explanations or the word \"answer\". Only the letters.";
}

pub mod indicator {
    pub const IDLE_LABEL: &str = "TARCA";
    pub const IDLE_TOOLTIP: &str = "TARCA: ready to analyze.";
    pub const PROCESSING_LABEL: &str = "...";
    pub const PROCESSING_TOOLTIP: &str = "TARCA: analyzing capture...";

    /// Tooltip while ninja mode hides the letters
    pub const NINJA_TOOLTIP: &str = "TARCA";

    /// Icon height in pixels; label icons grow horizontally
    pub const ICON_SIZE: u32 = 32;
}
