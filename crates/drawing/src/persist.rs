//! Debounced persistence of the page bitmap
//!
//! Stores poke a [`PersistHandle`] every time their content changes. A
//! [`PersistScheduler`] worker coalesces those pokes: each one re-arms the
//! debounce timer, and only when the timer runs out is a snapshot taken and
//! written as a PNG keyed by page id.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::error::DrawingError;

/// Owned RGBA8 copy of a bitmap, handed to the persist worker
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PersistMessage {
    Request,
    Shutdown,
}

/// Cheap, clonable trigger for a debounced persist
#[derive(Debug, Clone)]
pub struct PersistHandle {
    tx: Sender<PersistMessage>,
}

impl PersistHandle {
    /// Ask for the bitmap to be persisted once the debounce window is quiet
    pub fn request(&self) {
        if self.tx.send(PersistMessage::Request).is_err() {
            debug!("PersistHandle::request: scheduler already stopped");
        }
    }

    #[cfg(test)]
    pub(crate) fn channel() -> (Self, Receiver<PersistMessage>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

/// File the bitmap of `page_id` is written to inside `dir`
pub fn page_bitmap_path(dir: &Path, page_id: &str) -> PathBuf {
    dir.join(format!("{}.png", page_id))
}

/// Write a snapshot to `path` as PNG, creating parent directories
pub fn write_png(path: &Path, snapshot: &PageSnapshot) -> Result<(), DrawingError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let image = image::RgbaImage::from_raw(snapshot.width, snapshot.height, snapshot.rgba.clone())
        .ok_or_else(|| {
            DrawingError::CanvasUnavailable(format!(
                "snapshot buffer does not match {}x{}",
                snapshot.width, snapshot.height
            ))
        })?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Background worker that writes debounced page snapshots.
///
/// Dropping the scheduler flushes any pending request and joins the worker.
pub struct PersistScheduler {
    handle: PersistHandle,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PersistScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistScheduler")
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl PersistScheduler {
    /// Start the worker.
    ///
    /// - `path`: PNG destination
    /// - `debounce`: quiet period required before writing
    /// - `snapshot`: produces the bitmap to write; None skips the write
    /// - `on_saved`: called after every successful write
    pub fn spawn<S, F>(
        path: PathBuf,
        debounce: Duration,
        snapshot: S,
        on_saved: F,
    ) -> Result<Self, DrawingError>
    where
        S: Fn() -> Option<PageSnapshot> + Send + 'static,
        F: Fn(&Path) + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = std::thread::Builder::new()
            .name("inkpad-persist".to_string())
            .spawn(move || run_worker(rx, &path, debounce, snapshot, on_saved))?;
        info!("PersistScheduler started (debounce {:?})", debounce);
        Ok(Self {
            handle: PersistHandle { tx },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> PersistHandle {
        self.handle.clone()
    }

    /// Flush any pending write and stop the worker
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.handle.tx.send(PersistMessage::Shutdown);
        if worker.join().is_err() {
            warn!("PersistScheduler: worker panicked");
        }
    }
}

impl Drop for PersistScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<S, F>(
    rx: Receiver<PersistMessage>,
    path: &Path,
    debounce: Duration,
    snapshot: S,
    on_saved: F,
) where
    S: Fn() -> Option<PageSnapshot>,
    F: Fn(&Path),
{
    let flush = || {
        let Some(snap) = snapshot() else {
            debug!("PersistScheduler: no snapshot available, skipping write");
            return;
        };
        match write_png(path, &snap) {
            Ok(()) => {
                debug!("PersistScheduler: wrote {}", path.display());
                on_saved(path);
            }
            Err(e) => warn!("PersistScheduler: failed to write {}: {}", path.display(), e),
        }
    };

    let mut pending = false;
    loop {
        let message = if pending {
            match rx.recv_timeout(debounce) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => Some(PersistMessage::Shutdown),
            }
        } else {
            match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => Some(PersistMessage::Shutdown),
            }
        };

        match message {
            Some(PersistMessage::Request) => pending = true,
            Some(PersistMessage::Shutdown) => {
                if pending {
                    flush();
                }
                break;
            }
            None => {
                flush();
                pending = false;
            }
        }
    }
    debug!("PersistScheduler: worker exiting");
}
