use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{channel, sync_channel, Receiver, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use log::{error, info, warn};
use thiserror::Error;
use xcap::Monitor;

use crate::constants::capture::{FILE_PREFIX, TIMESTAMP_FORMAT};
use crate::cooldown::{Cooldown, CooldownToken};
use crate::display::{locate, virtual_layout, CursorSource, DisplayGeometry, LocateError};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("display resolution failed: {0}")]
    DisplayResolution(#[from] LocateError),

    #[error("failed to enumerate displays: {0}")]
    MonitorEnumeration(String),

    #[error("failed to create capture folder {}: {source}", path.display())]
    Folder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("screen grab failed: {0}")]
    Grab(String),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl CaptureError {
    /// Errors raised before any pixels were grabbed; these end the cooldown early.
    pub fn is_display_resolution(&self) -> bool {
        matches!(
            self,
            CaptureError::DisplayResolution(_) | CaptureError::MonitorEnumeration(_)
        )
    }
}

/// OS screen access.
pub trait ScreenGrabber: Send + Sync {
    /// Physical displays in enumeration order (no virtual entry).
    fn displays(&self) -> Result<Vec<DisplayGeometry>, CaptureError>;

    fn grab(&self, display: &DisplayGeometry) -> Result<RgbaImage, CaptureError>;
}

/// [`ScreenGrabber`] backed by xcap.
#[derive(Debug, Default)]
pub struct XcapGrabber;

impl XcapGrabber {
    fn geometry(monitor: &Monitor) -> Result<DisplayGeometry, CaptureError> {
        let enumeration = |e: xcap::XCapError| CaptureError::MonitorEnumeration(e.to_string());
        Ok(DisplayGeometry {
            left: monitor.x().map_err(enumeration)?,
            top: monitor.y().map_err(enumeration)?,
            width: monitor.width().map_err(enumeration)?,
            height: monitor.height().map_err(enumeration)?,
        })
    }
}

impl ScreenGrabber for XcapGrabber {
    fn displays(&self) -> Result<Vec<DisplayGeometry>, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
        monitors.iter().map(Self::geometry).collect()
    }

    /// Every failure here happens after the display was resolved, so all of
    /// them map to [`CaptureError::Grab`].
    fn grab(&self, display: &DisplayGeometry) -> Result<RgbaImage, CaptureError> {
        let monitors = Monitor::all().map_err(|e| CaptureError::Grab(e.to_string()))?;

        let monitor = monitors
            .into_iter()
            .find(|m| Self::geometry(m).is_ok_and(|g| g == *display))
            .ok_or_else(|| {
                CaptureError::Grab(format!(
                    "display at ({}, {}) {}x{} disappeared",
                    display.left, display.top, display.width, display.height
                ))
            })?;

        monitor
            .capture_image()
            .map_err(|e| CaptureError::Grab(e.to_string()))
    }
}

/// Which input fired a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Hotkey,
    MouseButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureJob {
    pub token: CooldownToken,
    pub source: TriggerSource,
}

/// `capture_<YYYYMMDD_HHMMSS_ffffff>.png`
pub fn capture_file_name(at: DateTime<Local>) -> String {
    format!("{}{}.png", FILE_PREFIX, at.format(TIMESTAMP_FORMAT))
}

/// Resolves the display under the cursor and writes it to the capture folder.
pub struct Capturer {
    grabber: Arc<dyn ScreenGrabber>,
    cursor: Arc<dyn CursorSource>,
    cooldown: Arc<Cooldown>,
    folder: PathBuf,
}

impl Capturer {
    pub fn new(
        grabber: Arc<dyn ScreenGrabber>,
        cursor: Arc<dyn CursorSource>,
        cooldown: Arc<Cooldown>,
        folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            grabber,
            cursor,
            cooldown,
            folder: folder.into(),
        }
    }

    /// Run one capture job. A display resolution failure hands the cooldown
    /// back immediately; any other failure leaves the timer running.
    pub fn run(&self, job: &CaptureJob) -> Result<PathBuf, CaptureError> {
        let result = self.capture();
        if let Err(e) = &result {
            if e.is_display_resolution() && self.cooldown.release_early(job.token) {
                info!("Cooldown released early after failed display resolution");
            }
        }
        result
    }

    fn capture(&self) -> Result<PathBuf, CaptureError> {
        let (x, y) = self.cursor.position()?;
        let layout = virtual_layout(&self.grabber.displays()?);
        let located = locate(x, y, &layout)?;

        if !located.contains_cursor {
            warn!(
                "⚠️  Cursor ({}, {}) is outside every display, using display {} instead",
                x, y, located.index
            );
        }

        fs::create_dir_all(&self.folder).map_err(|source| CaptureError::Folder {
            path: self.folder.clone(),
            source,
        })?;

        let path = self.folder.join(capture_file_name(Local::now()));
        let image = self.grabber.grab(&located.geometry)?;

        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| CaptureError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}

/// Receives jobs from the triggers without blocking them.
pub trait JobDispatcher: Send + Sync {
    /// Returns false when the job was not queued.
    fn dispatch(&self, job: CaptureJob) -> bool;
}

/// Outcome of one job, reported back to the event loop.
#[derive(Debug)]
pub struct CaptureReport {
    pub source: TriggerSource,
    pub result: Result<PathBuf, CaptureError>,
}

/// Handle for the capture thread
pub struct CaptureWorker {
    task_sender: SyncSender<CaptureJob>,
}

impl CaptureWorker {
    /// Spawn the capture thread with a bounded job queue.
    pub fn spawn(capturer: Capturer, capacity: usize) -> Result<(Self, Receiver<CaptureReport>)> {
        let (task_tx, task_rx) = sync_channel(capacity);
        let (report_tx, report_rx) = channel();

        thread::Builder::new()
            .name("capture-worker".to_string())
            .spawn(move || Self::worker_loop(task_rx, report_tx, capturer))
            .context("Failed to spawn capture worker thread")?;

        Ok((CaptureWorker { task_sender: task_tx }, report_rx))
    }

    fn worker_loop(
        task_rx: Receiver<CaptureJob>,
        report_tx: Sender<CaptureReport>,
        capturer: Capturer,
    ) {
        info!("🔧 Capture worker thread started");

        for job in task_rx {
            let result = capturer.run(&job);
            if report_tx
                .send(CaptureReport { source: job.source, result })
                .is_err()
            {
                warn!("⚠️  Capture worker: event loop disconnected");
                break;
            }
        }

        info!("🔧 Capture worker thread stopped");
    }
}

impl JobDispatcher for CaptureWorker {
    fn dispatch(&self, job: CaptureJob) -> bool {
        match self.task_sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("⚠️  Capture queue full, dropping {:?} trigger", job.source);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                error!("❌ Capture worker disconnected");
                false
            }
        }
    }
}
