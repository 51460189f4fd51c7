//! Answer pipeline: image file → Gemini → letters on the indicator.
//!
//! Each file moves `new → processing → delivered | abandoned`. Delivered paths
//! stay in the [`ProcessedSet`] for good. Abandoned paths are released so a
//! duplicate creation event can retry them once, except when the file is gone.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{error, info, warn};
use thiserror::Error;

use crate::constants::inference::ANSWER_DELIMITER;
use crate::indicator::StatusSink;
use crate::inference::{ImagePayload, InferenceBackend, InferenceError, ModelReply, SafetyRating};
use crate::processed::ProcessedSet;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("image vanished before it could be read: {}", .0.display())]
    FileVanished(PathBuf),

    #[error("failed to read image {}: {source}", path.display())]
    ImageUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("remote call failed: {0}")]
    RemoteCallFailed(#[from] InferenceError),

    #[error("request blocked by the model: {reason}")]
    ContentBlocked {
        reason: String,
        ratings: Vec<SafetyRating>,
    },

    #[error("model returned no answer")]
    EmptyResponse,
}

impl PipelineError {
    /// A vanished file can never succeed, everything else gets one more chance.
    pub fn allows_retry(&self) -> bool {
        !matches!(self, PipelineError::FileVanished(_))
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Delivered(String),
    Abandoned(PipelineError),
}

impl PipelineOutcome {
    pub fn answer(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Delivered(answer) => Some(answer),
            PipelineOutcome::Abandoned(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub prompt: String,
    /// Remove the image once its answer has been delivered
    pub delete_after_processing: bool,
}

/// Strip whitespace and the `#` delimiters the prompt asks for.
pub fn extract_answer(text: &str) -> Option<String> {
    let answer = text
        .trim()
        .trim_matches(ANSWER_DELIMITER)
        .trim();
    (!answer.is_empty()).then(|| answer.to_string())
}

pub fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

pub struct AnswerPipeline {
    backend: Box<dyn InferenceBackend>,
    status: Arc<dyn StatusSink>,
    processed: Arc<ProcessedSet>,
    options: PipelineOptions,
}

impl AnswerPipeline {
    pub fn new(
        backend: Box<dyn InferenceBackend>,
        status: Arc<dyn StatusSink>,
        processed: Arc<ProcessedSet>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            backend,
            status,
            processed,
            options,
        }
    }

    /// Process one claimed file. Runs on the caller's thread.
    pub fn process(&self, path: &Path) -> PipelineOutcome {
        self.status.show_processing();

        match self.run(path) {
            Ok(answer) => {
                self.status.show_answer(&answer);
                if self.options.delete_after_processing {
                    self.delete(path);
                }
                PipelineOutcome::Delivered(answer)
            }
            Err(e) => {
                self.log_failure(path, &e);
                self.status.reset();
                if e.allows_retry() {
                    self.processed.release(path);
                }
                PipelineOutcome::Abandoned(e)
            }
        }
    }

    fn run(&self, path: &Path) -> Result<String, PipelineError> {
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => PipelineError::FileVanished(path.to_path_buf()),
            _ => PipelineError::ImageUnreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let image = ImagePayload {
            mime_type: mime_type_for(path),
            bytes,
        };

        info!(
            "Sending '{}' to {}...",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            self.backend.name()
        );
        let start = Instant::now();
        let reply = self.backend.generate(&self.options.prompt, &image)?;
        info!("Model replied in {}ms", start.elapsed().as_millis());

        match reply {
            ModelReply::Text(text) => extract_answer(&text).ok_or(PipelineError::EmptyResponse),
            ModelReply::Blocked { reason, ratings } => {
                Err(PipelineError::ContentBlocked { reason, ratings })
            }
            ModelReply::NoContent => Err(PipelineError::EmptyResponse),
        }
    }

    fn log_failure(&self, path: &Path, e: &PipelineError) {
        error!("❌ Abandoned {}: {}", path.display(), e);
        if let PipelineError::ContentBlocked { ratings, .. } = e {
            for rating in ratings {
                warn!(
                    "   Safety category: {}, probability: {}",
                    rating.category, rating.probability
                );
            }
        }
    }

    fn delete(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => info!("Deleted processed capture {}", path.display()),
            Err(e) => warn!("⚠️  Failed to delete {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_answer() {
        assert_eq!(extract_answer(" AC\n").as_deref(), Some("AC"));
        assert_eq!(extract_answer("#B#").as_deref(), Some("B"));
        assert_eq!(extract_answer("  # AD #\n").as_deref(), Some("AD"));
        assert_eq!(extract_answer(" \n\t"), None);
        assert_eq!(extract_answer("##"), None);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for(Path::new("a/capture.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("photo.JPeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("photo.jpg")), "image/jpeg");
    }

    #[test]
    fn test_retry_policy() {
        assert!(!PipelineError::FileVanished(PathBuf::from("x.png")).allows_retry());
        assert!(PipelineError::EmptyResponse.allows_retry());
        assert!(PipelineError::ContentBlocked { reason: "SAFETY".into(), ratings: vec![] }.allows_retry());
    }
}
