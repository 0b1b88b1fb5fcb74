//! Drawing session for one open page
//!
//! A [`DrawingSession`] owns everything one page needs while it is open:
//! the stroke store, the backing bitmap, the viewport, the undo history,
//! and the workers for erasing and persisting.
//!
//! ## Locking
//!
//! Page state lives behind one mutex. Draw commits, undo/redo, and page
//! shifts additionally take the [`DrawLock`] first, waiting at most the
//! configured draw timeout; on timeout the work is dropped with a warning.
//! The page mutex is never held while waiting for the draw lock.
//!
//! Erasing runs on a worker thread. It copies the visible strokes under the
//! page mutex, hit-tests without it, and commits the removal under the
//! mutex again, so it never interleaves with a draw commit.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use glam::Vec2;
use inkpad_config::{DisplayConfig, EngineConfig};
use inkpad_ipc::{EraserKind, InputCommand, PenSettings, PointerBatch, RawSample, ViewportChange};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::builder::{GestureBuffer, build_stroke};
use crate::eraser::Eraser;
use crate::error::DrawingError;
use crate::events::{EventBus, SessionEvent};
use crate::geometry::{PixelRect, Rect};
use crate::history::{History, HistoryAction, Operation};
use crate::lock::DrawLock;
use crate::persist::{PageSnapshot, PersistScheduler, page_bitmap_path, write_png};
use crate::render::Renderer;
use crate::store::PageStore;
use crate::tiles::PageBitmap;
use crate::types::Stroke;
use crate::viewport::Viewport;

/// Result of delivering one finished gesture for drawing
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    Committed(Stroke),
    /// The gesture had no samples
    Empty,
    /// The draw lock was not acquired in time; the gesture was discarded
    Dropped,
}

/// Everything guarded by the page mutex
struct PageState {
    store: PageStore,
    bitmap: PageBitmap,
    viewport: Viewport,
    pen: PenSettings,
    eraser: Option<EraserKind>,
    options_open: bool,
    gesture: GestureBuffer,
    history: History,
}

impl PageState {
    /// Repaint a page-space rectangle; returns the view rectangle repainted
    fn repaint_page_rect(&mut self, renderer: &Renderer, page_rect: Rect) -> Option<Rect> {
        let view_rect = self.viewport.page_rect_to_view(&page_rect);
        match renderer.draw_area(&mut self.bitmap, &self.store, &self.viewport, view_rect, &[]) {
            Ok(painted) => painted.map(|p| p.to_rect()),
            Err(e) => {
                warn!("Repaint of {:?} skipped: {}", view_rect, e);
                None
            }
        }
    }

    fn repaint_all(&mut self, renderer: &Renderer) -> bool {
        match renderer.draw_full(&mut self.bitmap, &self.store, &self.viewport) {
            Ok(_) => true,
            Err(e) => {
                warn!("Full repaint skipped: {}", e);
                false
            }
        }
    }

    fn sync_document_height(&mut self) {
        self.viewport.update_document_height(self.store.height());
    }
}

/// State shared with the worker threads
struct Shared {
    lock: DrawLock,
    page: Mutex<PageState>,
    events: EventBus,
    renderer: Renderer,
    eraser: Eraser,
    config: EngineConfig,
    page_width: u32,
}

impl Shared {
    fn page(&self) -> MutexGuard<'_, PageState> {
        self.page.lock().unwrap_or_else(|poisoned| {
            warn!("Page state mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn draw_timeout(&self) -> Duration {
        Duration::from_millis(self.config.draw_lock_timeout_ms)
    }

    /// Erase the visible strokes `path` (view coordinates) touches
    fn erase(&self, path: &[Vec2], kind: EraserKind) -> Vec<Stroke> {
        self.events.emit(SessionEvent::DrawingStateChanged(true));
        let removed = self.erase_inner(path, kind);
        self.events.emit(SessionEvent::DrawingStateChanged(false));
        removed
    }

    fn erase_inner(&self, path: &[Vec2], kind: EraserKind) -> Vec<Stroke> {
        let (page_path, candidates) = {
            let state = self.page();
            let page_path: Vec<Vec2> = path.iter().map(|&p| state.viewport.view_to_page(p)).collect();
            let candidates: Vec<Stroke> = state.store.visible_strokes(&state.viewport).cloned().collect();
            (page_path, candidates)
        };

        let selected = self.eraser.select_strokes_from_path(&candidates, &page_path, kind);
        if selected.is_empty() {
            debug!("Erase: nothing under {} point path", path.len());
            return Vec::new();
        }
        let ids: Vec<String> = selected.iter().map(|s| s.id.clone()).collect();

        let (removed, repainted) = {
            let mut state = self.page();
            let removed = state.store.remove_strokes(ids.as_slice());
            if removed.is_empty() {
                return removed;
            }
            state.sync_document_height();
            state.history.commit(Operation::DeleteStrokes(removed.clone()));
            let repainted = Operation::DeleteStrokes(removed.clone())
                .bounds()
                .and_then(|bounds| state.repaint_page_rect(&self.renderer, bounds));
            (removed, repainted)
        };

        info!("Erased {} strokes", removed.len());
        self.events.emit(SessionEvent::StrokesRemoved(
            removed.iter().map(|s| s.id.clone()).collect(),
        ));
        self.events.emit(SessionEvent::ForceUpdate(repainted));
        removed
    }

    /// RGBA8 copy of the backing bitmap, for debounced persistence
    fn persist_snapshot(&self) -> Option<PageSnapshot> {
        let state = self.page();
        if !state.bitmap.is_available() {
            warn!("Bitmap snapshot skipped: canvas unavailable");
            return None;
        }
        Some(state.bitmap.snapshot())
    }

    /// Full page at zoom 1, rendered from a copy of the strokes outside the page lock
    fn export_snapshot(&self) -> Result<PageSnapshot, DrawingError> {
        let store = {
            let state = self.page();
            let mut copy = PageStore::with_padding(
                state.store.page_id(),
                state.store.view_height(),
                self.config.page_padding,
            );
            copy.add_strokes(state.store.all_strokes().to_vec());
            copy
        };
        self.renderer.render_page_rgba8(&store, self.page_width)
    }
}

enum EraseMessage {
    Erase { path: Vec<Vec2>, kind: EraserKind },
    Shutdown,
}

fn run_erase_worker(shared: Weak<Shared>, rx: Receiver<EraseMessage>) {
    while let Ok(message) = rx.recv() {
        match message {
            EraseMessage::Erase { path, kind } => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.erase(&path, kind);
            }
            EraseMessage::Shutdown => break,
        }
    }
    debug!("Erase worker exiting");
}

/// One open page
pub struct DrawingSession {
    shared: Arc<Shared>,
    erase_tx: Sender<EraseMessage>,
    erase_worker: Option<JoinHandle<()>>,
    persist: Option<PersistScheduler>,
    persist_path: Option<PathBuf>,
}

impl std::fmt::Debug for DrawingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSession")
            .field("page_id", &self.page_id())
            .field("persist_path", &self.persist_path)
            .finish()
    }
}

impl DrawingSession {
    /// Open a page.
    ///
    /// With a `persist_dir`, the page bitmap is written to
    /// `<persist_dir>/<page_id>.png` after every quiet debounce window.
    pub fn new(
        page_id: impl Into<String>,
        display_config: &DisplayConfig,
        config: EngineConfig,
        persist_dir: Option<&Path>,
    ) -> Result<Self, DrawingError> {
        let page_id = page_id.into();
        let viewport = Viewport::with_zoom_limits(
            display_config.width_f32(),
            display_config.height_f32(),
            config.min_zoom,
            config.max_zoom,
        );
        let state = PageState {
            store: PageStore::with_padding(page_id.clone(), display_config.height_f32(), config.page_padding),
            bitmap: PageBitmap::new(display_config.width, display_config.height, config.background),
            viewport,
            pen: PenSettings::default(),
            eraser: None,
            options_open: false,
            gesture: GestureBuffer::new(),
            history: History::new(config.max_undo_levels),
        };
        let shared = Arc::new(Shared {
            lock: DrawLock::new(),
            page: Mutex::new(state),
            events: EventBus::new(),
            renderer: Renderer::from_config(&config),
            eraser: Eraser::new(config.eraser_width, config.erase_sampling),
            page_width: display_config.width,
            config,
        });

        let (erase_tx, erase_rx) = crossbeam_channel::unbounded();
        let worker_shared = Arc::downgrade(&shared);
        let erase_worker = std::thread::Builder::new()
            .name("inkpad-erase".to_string())
            .spawn(move || run_erase_worker(worker_shared, erase_rx))?;

        let (persist, persist_path) = match persist_dir {
            Some(dir) => {
                let path = page_bitmap_path(dir, &page_id);
                let snapshot_source = Arc::downgrade(&shared);
                let events = shared.events.clone();
                let scheduler = PersistScheduler::spawn(
                    path.clone(),
                    Duration::from_millis(shared.config.persist_debounce_ms),
                    move || snapshot_source.upgrade().and_then(|s| s.persist_snapshot()),
                    move |saved: &Path| events.emit(SessionEvent::PagePersisted(saved.to_path_buf())),
                )?;
                shared.page().store.set_persist_handle(Some(scheduler.handle()));
                (Some(scheduler), Some(path))
            }
            None => (None, None),
        };

        {
            let mut state = shared.page();
            state.repaint_all(&shared.renderer);
        }
        info!(
            "DrawingSession opened for page {} ({}x{})",
            page_id, display_config.width, display_config.height
        );

        Ok(Self {
            shared,
            erase_tx,
            erase_worker: Some(erase_worker),
            persist,
            persist_path,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// The draw lock, for callers that need to hold off commits
    pub fn lock(&self) -> &DrawLock {
        &self.shared.lock
    }

    pub fn page_id(&self) -> String {
        self.shared.page().store.page_id().to_string()
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    pub fn strokes(&self) -> Vec<Stroke> {
        self.shared.page().store.all_strokes().to_vec()
    }

    /// Look a stroke up by id
    pub fn stroke(&self, id: &str) -> Option<Stroke> {
        self.shared.page().store.get_stroke(id).cloned()
    }

    pub fn stroke_count(&self) -> usize {
        self.shared.page().store.len()
    }

    pub fn page_height(&self) -> f32 {
        self.shared.page().store.height()
    }

    pub fn viewport(&self) -> Viewport {
        self.shared.page().viewport.clone()
    }

    pub fn pen_settings(&self) -> PenSettings {
        self.shared.page().pen
    }

    pub fn eraser_mode(&self) -> Option<EraserKind> {
        self.shared.page().eraser
    }

    pub fn can_undo(&self) -> bool {
        self.shared.page().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.shared.page().history.can_redo()
    }

    /// RGBA8 copy of the visible bitmap
    pub fn bitmap_snapshot(&self) -> PageSnapshot {
        self.shared.page().bitmap.snapshot()
    }

    /// Drain the bitmap area repainted since the last call
    pub fn take_dirty_region(&self) -> Option<PixelRect> {
        self.shared.page().bitmap.take_dirty_region()
    }

    /// Route one command from the host
    pub fn handle_input(&self, command: InputCommand) {
        match command {
            InputCommand::PointerBatch(batch) => self.handle_pointer_batch(batch),
            InputCommand::PenSettingsChanged(settings) => self.set_pen_settings(settings),
            InputCommand::ViewportChanged(change) => self.set_viewport(change),
            InputCommand::EraseModeToggled { eraser } => self.set_eraser_mode(eraser),
            InputCommand::StrokeOptionsToggled { open } => self.set_stroke_options_open(open),
            InputCommand::Undo => {
                if let Err(e) = self.undo() {
                    warn!("Undo dropped: {}", e);
                }
            }
            InputCommand::Redo => {
                if let Err(e) = self.redo() {
                    warn!("Redo dropped: {}", e);
                }
            }
        }
    }

    fn handle_pointer_batch(&self, batch: PointerBatch) {
        let (samples, eraser) = {
            let mut state = self.shared.page();
            let Some(samples) = state.gesture.push(batch) else {
                return;
            };
            (samples, state.eraser)
        };

        match eraser {
            Some(kind) => {
                let path: Vec<Vec2> = samples.iter().map(|s| Vec2::new(s.x, s.y)).collect();
                if let Err(e) = self.erase(path, kind) {
                    warn!("Erase gesture dropped: {}", e);
                }
            }
            None => {
                self.commit_stroke(&samples);
            }
        }
    }

    /// Build a stroke from one finished gesture and add it to the page.
    ///
    /// Waits at most the draw timeout for the draw lock; on timeout the
    /// gesture is dropped and the page is left untouched.
    pub fn commit_stroke(&self, samples: &[RawSample]) -> DrawOutcome {
        let timeout = self.shared.draw_timeout();
        let Some(_guard) = self.shared.lock.try_acquire_for(timeout) else {
            warn!(
                "Draw lock busy for {:?}, dropping gesture of {} samples",
                timeout,
                samples.len()
            );
            return DrawOutcome::Dropped;
        };

        let (stroke, repainted) = {
            let mut state = self.shared.page();
            let page_id = state.store.page_id().to_string();
            let Some(stroke) = build_stroke(samples, &state.viewport, &state.pen, &page_id) else {
                debug!("commit_stroke: empty gesture");
                return DrawOutcome::Empty;
            };
            state.store.add_strokes(vec![stroke.clone()]);
            state.sync_document_height();
            state.history.commit(Operation::AddStrokes(vec![stroke.clone()]));
            let repainted = state.repaint_page_rect(&self.shared.renderer, stroke.bounding_rect());
            (stroke, repainted)
        };

        debug!("Committed stroke {} ({} points)", stroke.id, stroke.points().len());
        self.shared.events.emit(SessionEvent::StrokesAdded(vec![stroke.clone()]));
        self.shared.events.emit(SessionEvent::ForceUpdate(repainted));
        DrawOutcome::Committed(stroke)
    }

    /// Queue an erase of `path` (view coordinates) on the erase worker
    pub fn erase(&self, path: Vec<Vec2>, kind: EraserKind) -> Result<(), DrawingError> {
        self.erase_tx
            .send(EraseMessage::Erase { path, kind })
            .map_err(|_| DrawingError::SessionClosed)
    }

    /// Erase on the calling thread; returns the removed strokes
    pub fn erase_blocking(&self, path: &[Vec2], kind: EraserKind) -> Vec<Stroke> {
        self.shared.erase(path, kind)
    }

    /// Redraw the whole view.
    ///
    /// Waits up to the refresh timeout for any commit in flight, then
    /// renders regardless. Returns false if the wait timed out.
    pub fn refresh(&self) -> bool {
        let wait = Duration::from_millis(self.shared.config.refresh_wait_ms);
        let settled = self.shared.lock.wait_until_free(wait);
        if !settled {
            warn!("Draw lock still held after {:?}, refreshing anyway", wait);
        }
        {
            let mut state = self.shared.page();
            state.repaint_all(&self.shared.renderer);
        }
        self.shared.events.emit(SessionEvent::RefreshUi);
        settled
    }

    /// Revert the last edit. Ok(false) if there was nothing to undo.
    pub fn undo(&self) -> Result<bool, DrawingError> {
        self.step_history(HistoryAction::Undo)
    }

    /// Re-apply the last undone edit. Ok(false) if there was nothing to redo.
    pub fn redo(&self) -> Result<bool, DrawingError> {
        self.step_history(HistoryAction::Redo)
    }

    fn step_history(&self, action: HistoryAction) -> Result<bool, DrawingError> {
        let timeout = self.shared.draw_timeout();
        let Some(_guard) = self.shared.lock.try_acquire_for(timeout) else {
            return Err(DrawingError::LockTimeout { waited: timeout });
        };

        let (applied, repainted) = {
            let mut state = self.shared.page();
            let state = &mut *state;
            let applied = match action {
                HistoryAction::Undo => state.history.undo(&mut state.store),
                HistoryAction::Redo => state.history.redo(&mut state.store),
            };
            let Some(applied) = applied else {
                return Ok(false);
            };
            state.sync_document_height();
            let repainted = applied
                .bounds()
                .and_then(|bounds| state.repaint_page_rect(&self.shared.renderer, bounds));
            (applied, repainted)
        };

        self.shared.events.emit(SessionEvent::UndoRedoPerformed(action));
        match applied {
            Operation::AddStrokes(strokes) => self.shared.events.emit(SessionEvent::StrokesAdded(strokes)),
            Operation::DeleteStrokes(strokes) => self.shared.events.emit(SessionEvent::StrokesRemoved(
                strokes.into_iter().map(|s| s.id).collect(),
            )),
        }
        self.shared.events.emit(SessionEvent::ForceUpdate(repainted));
        Ok(true)
    }

    pub fn set_pen_settings(&self, settings: PenSettings) {
        debug!("Pen settings: {:?}", settings);
        self.shared.page().pen = settings;
    }

    /// Apply zoom then scroll, and redraw everything
    pub fn set_viewport(&self, change: ViewportChange) {
        {
            let mut state = self.shared.page();
            state.viewport.set_zoom(change.zoom);
            state.viewport.set_scroll_y(change.scroll_y);
            state.repaint_all(&self.shared.renderer);
        }
        self.shared.events.emit(SessionEvent::ForceUpdate(None));
    }

    /// Resize the view and bitmap, then redraw everything
    pub fn resize(&self, width: u32, height: u32) {
        {
            let mut state = self.shared.page();
            state.bitmap.resize(width, height);
            state.viewport.resize(width as f32, height as f32);
            state.store.set_view_height(height as f32);
            state.sync_document_height();
            state.repaint_all(&self.shared.renderer);
        }
        self.shared.events.emit(SessionEvent::ForceUpdate(None));
    }

    /// Switch between drawing (None) and erasing. Drops any gesture in progress.
    pub fn set_eraser_mode(&self, eraser: Option<EraserKind>) {
        let mut state = self.shared.page();
        state.eraser = eraser;
        state.gesture.clear();
        debug!("Eraser mode: {:?}", eraser);
    }

    pub fn set_stroke_options_open(&self, open: bool) {
        let changed = {
            let mut state = self.shared.page();
            let changed = state.options_open != open;
            state.options_open = open;
            changed
        };
        if changed {
            self.shared.events.emit(SessionEvent::StrokeOptionsOpened(open));
        }
    }

    /// Move every stroke whose top is at or below `threshold_y` by `offset`.
    ///
    /// Used when page content is inserted or removed. Clears the undo
    /// history, whose recorded strokes no longer match their positions.
    pub fn shift_page_content(&self, threshold_y: f32, offset: f32) -> Result<Vec<Stroke>, DrawingError> {
        let timeout = self.shared.draw_timeout();
        let Some(_guard) = self.shared.lock.try_acquire_for(timeout) else {
            return Err(DrawingError::LockTimeout { waited: timeout });
        };

        let shifted = {
            let mut state = self.shared.page();
            let shifted = state.store.shift_strokes_below(threshold_y, offset);
            if shifted.is_empty() {
                return Ok(shifted);
            }
            state.history.clear();
            state.sync_document_height();
            state.repaint_all(&self.shared.renderer);
            shifted
        };

        info!("Shifted {} strokes by {}", shifted.len(), offset);
        self.shared.events.emit(SessionEvent::StrokesUpdated(shifted.clone()));
        self.shared.events.emit(SessionEvent::ForceUpdate(None));
        Ok(shifted)
    }

    /// Render the whole page and write it to `path` as PNG
    pub fn export_page(&self, path: &Path) -> Result<(), DrawingError> {
        let snapshot = self.shared.export_snapshot()?;
        write_png(path, &snapshot)?;
        info!("Exported page to {}", path.display());
        Ok(())
    }

    /// Stop the workers, flushing any pending persist
    pub fn close(&mut self) {
        if let Some(worker) = self.erase_worker.take() {
            let _ = self.erase_tx.send(EraseMessage::Shutdown);
            if worker.join().is_err() {
                warn!("Erase worker panicked");
            }
        }
        if let Some(mut persist) = self.persist.take() {
            persist.shutdown();
        }
    }
}

impl Drop for DrawingSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpad_ipc::{GesturePhase, PenKind};
    use std::thread;
    use std::time::Instant;

    fn display() -> DisplayConfig {
        DisplayConfig::new(400, 800)
    }

    fn session() -> DrawingSession {
        DrawingSession::new("page-1", &display(), EngineConfig::default(), None).unwrap()
    }

    fn samples(coords: &[(f32, f32)]) -> Vec<RawSample> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| RawSample::at(x, y, i as u64))
            .collect()
    }

    fn horizontal(y: f32) -> Vec<RawSample> {
        samples(&[(50.0, y), (150.0, y), (250.0, y)])
    }

    fn wait_for<F>(rx: &mut broadcast::Receiver<SessionEvent>, mut pred: F) -> SessionEvent
    where
        F: FnMut(&SessionEvent) -> bool,
    {
        loop {
            let event = rx.blocking_recv().unwrap();
            if pred(&event) {
                return event;
            }
        }
    }

    #[test]
    fn test_new_session_takes_display_size() {
        let session = session();
        let viewport = session.viewport();
        assert_eq!((viewport.view_width(), viewport.view_height()), (400.0, 800.0));
        assert_eq!(session.page_height(), 800.0);
        let snapshot = session.bitmap_snapshot();
        assert_eq!((snapshot.width, snapshot.height), (400, 800));
    }

    #[test]
    fn test_concurrent_draw_and_erase_keep_store_consistent() {
        let mut session = session();
        let mut rx = session.subscribe();
        let mut committed = Vec::new();

        thread::scope(|scope| {
            let drawer = scope.spawn(|| {
                let mut ids = Vec::new();
                for i in 0..40 {
                    let outcome = session.commit_stroke(&horizontal(20.0 + i as f32 * 15.0));
                    if let DrawOutcome::Committed(stroke) = outcome {
                        ids.push(stroke.id);
                    }
                }
                ids
            });
            for i in 0..20 {
                let top = i as f32 * 30.0;
                session
                    .erase(vec![Vec2::new(150.0, top), Vec2::new(150.0, top + 60.0)], EraserKind::Pen)
                    .unwrap();
                thread::sleep(Duration::from_millis(1));
            }
            committed = drawer.join().unwrap();
        });
        // Joins the erase worker after the queued batches ran
        session.close();

        assert_eq!(committed.len(), 40);
        let mut removed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::StrokesRemoved(ids) = event {
                removed.extend(ids);
            }
        }

        let strokes = session.strokes();
        let mut seen = std::collections::HashSet::new();
        for stroke in &strokes {
            assert!(seen.insert(stroke.id.clone()), "{} stored twice", stroke.id);
            assert_eq!(session.stroke(&stroke.id).as_ref(), Some(stroke));
            assert!(!removed.contains(&stroke.id));
        }
        let mut accounted: Vec<String> = strokes.iter().map(|s| s.id.clone()).chain(removed).collect();
        accounted.sort();
        committed.sort();
        assert_eq!(accounted, committed);

        let expected_height = strokes
            .iter()
            .map(|s| s.bottom() + EngineConfig::default().page_padding)
            .fold(800.0, f32::max);
        assert_eq!(session.page_height(), expected_height);
    }

    #[test]
    fn test_commit_stroke_adds_and_repaints() {
        let session = session();
        session.take_dirty_region();
        let mut rx = session.subscribe();

        let outcome = session.commit_stroke(&horizontal(100.0));
        let DrawOutcome::Committed(stroke) = outcome else {
            panic!("expected a committed stroke, got {:?}", outcome);
        };
        assert_eq!(session.stroke_count(), 1);
        assert_eq!(stroke.page_id, "page-1");
        assert!(session.take_dirty_region().is_some());
        assert!(session.can_undo());

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::StrokesAdded(s)) if s.len() == 1));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::ForceUpdate(Some(_)))));

        let snapshot = session.bitmap_snapshot();
        let offset = ((100 * snapshot.width + 150) * 4) as usize;
        assert!(snapshot.rgba[offset] < 128);
    }

    #[test]
    fn test_empty_gesture_is_ignored() {
        let session = session();
        assert_eq!(session.commit_stroke(&[]), DrawOutcome::Empty);
        assert_eq!(session.stroke_count(), 0);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_held_lock_drops_gesture() {
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        let before = session.strokes();

        let guard = session.lock().try_acquire_for(Duration::ZERO).unwrap();
        let start = Instant::now();
        let outcome = session.commit_stroke(&horizontal(200.0));
        let waited = start.elapsed();
        drop(guard);

        assert_eq!(outcome, DrawOutcome::Dropped);
        assert!(waited >= Duration::from_millis(500));
        assert_eq!(session.strokes(), before);
    }

    #[test]
    fn test_pointer_batches_commit_on_end() {
        let session = session();
        session.handle_input(InputCommand::PenSettingsChanged(PenSettings::new(
            PenKind::Marker,
            12.0,
            0xFF00_00FF,
        )));
        session.handle_input(InputCommand::PointerBatch(PointerBatch::new(
            GesturePhase::Begin,
            samples(&[(10.0, 10.0)]),
        )));
        session.handle_input(InputCommand::PointerBatch(PointerBatch::new(
            GesturePhase::Move,
            samples(&[(20.0, 20.0)]),
        )));
        assert_eq!(session.stroke_count(), 0);

        session.handle_input(InputCommand::PointerBatch(PointerBatch::new(
            GesturePhase::End,
            samples(&[(30.0, 30.0)]),
        )));
        let strokes = session.strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].points().len(), 3);
        assert_eq!(strokes[0].pen, PenKind::Marker);
        assert_eq!(strokes[0].size, 12.0);
    }

    #[test]
    fn test_tap_after_unfinished_gesture_draws_dot() {
        let session = session();
        session.handle_input(InputCommand::PointerBatch(PointerBatch::new(
            GesturePhase::Begin,
            samples(&[(10.0, 10.0), (20.0, 20.0)]),
        )));
        let tap = PointerBatch::complete(samples(&[(200.0, 300.0)]));
        session.handle_input(InputCommand::PointerBatch(tap));

        let strokes = session.strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].points().len(), 1);
        assert_eq!((strokes[0].points()[0].x, strokes[0].points()[0].y), (200.0, 300.0));
    }

    #[test]
    fn test_erase_blocking_removes_touched_stroke() {
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        session.commit_stroke(&horizontal(300.0));

        let removed = session.erase_blocking(
            &[Vec2::new(150.0, 80.0), Vec2::new(150.0, 120.0)],
            EraserKind::Pen,
        );
        assert_eq!(removed.len(), 1);
        assert_eq!(session.stroke_count(), 1);
        assert!(session.strokes()[0].points()[0].y == 300.0);
    }

    #[test]
    fn test_erase_lone_point_is_noop() {
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        session.take_dirty_region();
        let mut rx = session.subscribe();

        let removed = session.erase_blocking(&[Vec2::new(300.0, 500.0)], EraserKind::Pen);
        assert!(removed.is_empty());
        assert_eq!(session.stroke_count(), 1);
        assert_eq!(session.take_dirty_region(), None);

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::DrawingStateChanged(true))));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::DrawingStateChanged(false))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_erase_worker_removes_and_notifies() {
        let session = session();
        let stroke = match session.commit_stroke(&horizontal(100.0)) {
            DrawOutcome::Committed(stroke) => stroke,
            other => panic!("unexpected {:?}", other),
        };
        let mut rx = session.subscribe();

        session
            .erase(
                vec![Vec2::new(0.0, 0.0), Vec2::new(400.0, 0.0), Vec2::new(400.0, 200.0), Vec2::new(0.0, 200.0)],
                EraserKind::Select,
            )
            .unwrap();

        let event = wait_for(&mut rx, |e| matches!(e, SessionEvent::StrokesRemoved(_)));
        match event {
            SessionEvent::StrokesRemoved(ids) => assert_eq!(ids, vec![stroke.id]),
            other => panic!("unexpected {:?}", other),
        }
        wait_for(&mut rx, |e| matches!(e, SessionEvent::DrawingStateChanged(false)));
        assert_eq!(session.stroke_count(), 0);
    }

    #[test]
    fn test_erase_mode_routes_gestures_to_eraser() {
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        let mut rx = session.subscribe();

        session.handle_input(InputCommand::EraseModeToggled {
            eraser: Some(EraserKind::Pen),
        });
        session.handle_input(InputCommand::PointerBatch(PointerBatch::new(
            GesturePhase::Begin,
            samples(&[(150.0, 90.0)]),
        )));
        session.handle_input(InputCommand::PointerBatch(PointerBatch::new(
            GesturePhase::End,
            samples(&[(150.0, 110.0)]),
        )));

        wait_for(&mut rx, |e| matches!(e, SessionEvent::DrawingStateChanged(false)));
        assert_eq!(session.stroke_count(), 0);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        let mut rx = session.subscribe();

        assert!(session.undo().unwrap());
        assert_eq!(session.stroke_count(), 0);
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::UndoRedoPerformed(HistoryAction::Undo))));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::StrokesRemoved(_))));

        assert!(session.redo().unwrap());
        assert_eq!(session.stroke_count(), 1);
        assert!(!session.redo().unwrap());
    }

    #[test]
    fn test_undo_erase_restores_stroke() {
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        session.erase_blocking(&[Vec2::new(150.0, 100.0)], EraserKind::Pen);
        assert_eq!(session.stroke_count(), 0);

        session.handle_input(InputCommand::Undo);
        assert_eq!(session.stroke_count(), 1);
    }

    #[test]
    fn test_undo_times_out_under_held_lock() {
        let mut config = EngineConfig::default();
        config.draw_lock_timeout_ms = 20;
        let session = DrawingSession::new("p", &display(), config, None).unwrap();
        session.commit_stroke(&horizontal(100.0));

        let _guard = session.lock().try_acquire_for(Duration::ZERO).unwrap();
        assert!(matches!(session.undo(), Err(DrawingError::LockTimeout { .. })));
        assert_eq!(session.stroke_count(), 1);
    }

    #[test]
    fn test_refresh_waits_for_commit_in_flight() {
        let session = session();
        let (held_tx, held_rx) = crossbeam_channel::bounded(0);

        thread::scope(|scope| {
            scope.spawn(|| {
                let _guard = session.lock().try_acquire_for(Duration::ZERO).unwrap();
                held_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(50));
            });
            held_rx.recv().unwrap();
            let mut rx = session.subscribe();
            assert!(session.refresh());
            assert!(!session.lock().is_held());
            assert!(matches!(rx.try_recv(), Ok(SessionEvent::RefreshUi)));
        });
    }

    #[test]
    fn test_refresh_renders_after_timeout() {
        let mut config = EngineConfig::default();
        config.refresh_wait_ms = 30;
        let session = DrawingSession::new("p", &display(), config, None).unwrap();
        let mut rx = session.subscribe();

        let _guard = session.lock().try_acquire_for(Duration::ZERO).unwrap();
        assert!(!session.refresh());
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::RefreshUi)));
    }

    #[test]
    fn test_viewport_change_redraws_full_view() {
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        session.take_dirty_region();

        session.handle_input(InputCommand::ViewportChanged(ViewportChange {
            scroll_y: 0.0,
            zoom: 2.0,
        }));
        assert_eq!(session.viewport().zoom(), 2.0);
        assert_eq!(session.take_dirty_region(), Some(PixelRect::new(0, 0, 400, 800)));
    }

    #[test]
    fn test_page_grows_with_strokes() {
        let session = session();
        assert_eq!(session.page_height(), 800.0);
        session.commit_stroke(&samples(&[(100.0, 700.0), (100.0, 780.0)]));
        // bottom 780 + half of the default 5.0 size + 50 padding
        assert!((session.page_height() - 832.5).abs() < 1e-3);
        assert_eq!(session.viewport().document_height(), session.page_height());
    }

    #[test]
    fn test_shift_page_content_moves_lower_strokes() {
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        session.commit_stroke(&horizontal(400.0));

        let shifted = session.shift_page_content(300.0, 50.0).unwrap();
        assert_eq!(shifted.len(), 1);
        let ys: Vec<f32> = session.strokes().iter().map(|s| s.points()[0].y).collect();
        assert!(ys.contains(&100.0));
        assert!(ys.contains(&450.0));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_stroke_options_toggle_emits_on_change() {
        let session = session();
        let mut rx = session.subscribe();
        session.handle_input(InputCommand::StrokeOptionsToggled { open: true });
        session.handle_input(InputCommand::StrokeOptionsToggled { open: true });
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::StrokeOptionsOpened(true))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_persists_page_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.persist_debounce_ms = 10_000;
        let mut session = DrawingSession::new("page-7", &display(), config, Some(dir.path())).unwrap();
        let mut rx = session.subscribe();
        session.commit_stroke(&horizontal(100.0));
        // Grows the page past the view
        session.commit_stroke(&horizontal(790.0));
        assert!(session.page_height() > 800.0);

        let path = session.persist_path().unwrap().to_path_buf();
        assert_eq!(path, dir.path().join("page-7.png"));
        session.close();

        assert!(path.exists());
        let image = image::open(&path).unwrap().to_rgba8();
        // The backing bitmap is written, not a render of the whole page
        assert_eq!((image.width(), image.height()), (400, 800));
        assert!(image.get_pixel(150, 100)[0] < 128);
        let persisted = wait_for(&mut rx, |e| matches!(e, SessionEvent::PagePersisted(_)));
        assert!(matches!(persisted, SessionEvent::PagePersisted(p) if p == path));
    }

    #[test]
    fn test_export_page() {
        let dir = tempfile::tempdir().unwrap();
        let session = session();
        session.commit_stroke(&horizontal(100.0));
        session.commit_stroke(&horizontal(790.0));
        let path = dir.path().join("export").join("out.png");

        session.export_page(&path).unwrap();
        let image = image::open(&path).unwrap().to_rgba8();
        assert_eq!(image.width(), 400);
        assert_eq!(image.height(), session.page_height().ceil() as u32);
        assert!(image.get_pixel(150, 100)[0] < 128);
        assert!(image.get_pixel(150, 790)[0] < 128);
    }
}
