//! Capture folder watcher.
//!
//! notify delivers events for one watch on a single thread, and the pipeline
//! runs inline on that thread. Answers therefore arrive in file-creation
//! order, and a slow remote call delays every event queued behind it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info};
use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::constants::capture::IMAGE_EXTENSIONS;
use crate::pipeline::{AnswerPipeline, PipelineOutcome};
use crate::processed::ProcessedSet;

/// What happened to one creation event.
#[derive(Debug)]
pub enum WatchDecision {
    Directory,
    NotAnImage,
    /// Already claimed by an earlier event for the same path
    Duplicate,
    Processed(PipelineOutcome),
}

pub fn is_capture_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

pub struct CaptureWatcher {
    folder: PathBuf,
    stability_delay: Duration,
    processed: Arc<ProcessedSet>,
    pipeline: AnswerPipeline,
}

impl CaptureWatcher {
    pub fn new(
        folder: impl Into<PathBuf>,
        stability_delay: Duration,
        processed: Arc<ProcessedSet>,
        pipeline: AnswerPipeline,
    ) -> Self {
        Self {
            folder: folder.into(),
            stability_delay,
            processed,
            pipeline,
        }
    }

    /// Filter, settle, claim, then hand the file to the pipeline.
    pub fn handle_created(&self, path: &Path) -> WatchDecision {
        if path.is_dir() {
            return WatchDecision::Directory;
        }
        if !is_capture_image(path) {
            return WatchDecision::NotAnImage;
        }

        if !self.stability_delay.is_zero() {
            thread::sleep(self.stability_delay);
        }

        if !self.processed.try_claim(path) {
            debug!("Ignoring duplicate event for {}", path.display());
            return WatchDecision::Duplicate;
        }

        info!("New capture detected: {}", path.display());
        WatchDecision::Processed(self.pipeline.process(path))
    }

    fn handle_event(&self, event: Event) {
        let EventKind::Create(kind) = event.kind else {
            return;
        };
        if kind == CreateKind::Folder {
            return;
        }
        for path in &event.paths {
            self.handle_created(path);
        }
    }

    /// Start watching the folder (non-recursive).
    pub fn start(self) -> Result<WatchHandle> {
        let folder = self.folder.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => self.handle_event(event),
            Err(e) => error!("❌ Watch error: {}", e),
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&folder, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", folder.display()))?;

        info!("Watching '{}' for new captures...", folder.display());
        Ok(WatchHandle { watcher, folder })
    }
}

/// Keeps the watch alive; dropping or stopping it ends delivery.
pub struct WatchHandle {
    watcher: RecommendedWatcher,
    folder: PathBuf,
}

impl WatchHandle {
    pub fn stop(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.folder) {
            debug!("Unwatch failed: {}", e);
        }
        drop(self.watcher);
        info!("Stopped watching '{}'", self.folder.display());
    }
}
