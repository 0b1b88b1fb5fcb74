//! Stroke storage for one page
//!
//! [`PageStore`] owns the ordered stroke list of a page. It keeps two derived
//! values in step with that list: an id → position index, rebuilt after
//! every add/remove, and the page height (lowest stroke bottom plus padding,
//! never less than the view height).
//!
//! The store is not internally synchronized. Writers go through the drawing
//! session, which serializes every mutation.

use std::collections::HashMap;

use inkpad_config::PAGE_PADDING;
use tracing::debug;

use crate::persist::PersistHandle;
use crate::types::Stroke;
use crate::viewport::Viewport;

/// Ordered strokes of one page plus the derived id index and height
#[derive(Debug)]
pub struct PageStore {
    page_id: String,
    strokes: Vec<Stroke>,
    index: HashMap<String, usize>,
    height: f32,
    view_height: f32,
    padding: f32,
    persist: Option<PersistHandle>,
}

impl PageStore {
    /// Create an empty store whose height starts at the view height
    pub fn new(page_id: impl Into<String>, view_height: f32) -> Self {
        Self::with_padding(page_id, view_height, PAGE_PADDING)
    }

    pub fn with_padding(page_id: impl Into<String>, view_height: f32, padding: f32) -> Self {
        Self {
            page_id: page_id.into(),
            strokes: Vec::new(),
            index: HashMap::new(),
            height: view_height,
            view_height,
            padding,
            persist: None,
        }
    }

    /// Attach the trigger used to schedule debounced bitmap persistence
    pub fn set_persist_handle(&mut self, handle: Option<PersistHandle>) {
        self.persist = handle;
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// Content height: lowest stroke bottom plus padding, floored at the view height
    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn view_height(&self) -> f32 {
        self.view_height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Every stroke in insertion order
    #[inline]
    pub fn all_strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Strokes whose bounding box intersects the visible part of the page
    pub fn visible_strokes<'a>(&'a self, viewport: &'a Viewport) -> impl Iterator<Item = &'a Stroke> + 'a {
        let visible = viewport.visible_page_rect();
        self.strokes
            .iter()
            .filter(move |s| s.bounding_rect().intersects(&visible))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get_stroke(&self, id: &str) -> Option<&Stroke> {
        self.index.get(id).and_then(|&i| self.strokes.get(i))
    }

    /// Look up several ids; absent ids yield None in their slot
    pub fn get_strokes<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Option<Stroke>> {
        ids.iter()
            .map(|id| self.get_stroke(id.as_ref()).cloned())
            .collect()
    }

    /// Append strokes in order and grow the height to fit them.
    ///
    /// Does not render; callers repaint the affected area themselves.
    pub fn add_strokes(&mut self, strokes: Vec<Stroke>) {
        if strokes.is_empty() {
            return;
        }
        let count = strokes.len();
        for stroke in &strokes {
            self.height = self.height.max(stroke.bottom() + self.padding);
        }
        self.strokes.extend(strokes);
        self.rebuild_index();
        debug!(
            "PageStore[{}]: added {} strokes (total {}, height {:.1})",
            self.page_id,
            count,
            self.strokes.len(),
            self.height
        );
        self.schedule_persist();
    }

    /// Remove every stroke whose id is listed, returning the removed strokes.
    ///
    /// Unknown ids are ignored. The height is recomputed and may shrink.
    pub fn remove_strokes<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<Stroke> {
        if ids.is_empty() {
            return Vec::new();
        }
        let targets: std::collections::HashSet<&str> = ids
            .iter()
            .map(|id| id.as_ref())
            .filter(|id| self.index.contains_key(*id))
            .collect();
        if targets.is_empty() {
            debug!("PageStore[{}]: remove_strokes matched nothing", self.page_id);
            return Vec::new();
        }

        let (removed, kept): (Vec<Stroke>, Vec<Stroke>) = std::mem::take(&mut self.strokes)
            .into_iter()
            .partition(|s| targets.contains(s.id.as_str()));
        self.strokes = kept;
        self.rebuild_index();
        self.recompute_height();
        debug!(
            "PageStore[{}]: removed {} strokes (total {}, height {:.1})",
            self.page_id,
            removed.len(),
            self.strokes.len(),
            self.height
        );
        self.schedule_persist();
        removed
    }

    /// Move every stroke whose top is at or below `threshold_y` down by `offset`.
    ///
    /// Used when blank space is inserted above existing content. The affected
    /// strokes are removed, translated, and re-added in their original order.
    /// Returns the translated strokes.
    pub fn shift_strokes_below(&mut self, threshold_y: f32, offset: f32) -> Vec<Stroke> {
        let ids: Vec<String> = self
            .strokes
            .iter()
            .filter(|s| s.top() >= threshold_y)
            .map(|s| s.id.clone())
            .collect();
        if ids.is_empty() || offset == 0.0 {
            return Vec::new();
        }
        let moved: Vec<Stroke> = self
            .remove_strokes(ids.as_slice())
            .iter()
            .map(|s| s.translated(offset))
            .collect();
        self.add_strokes(moved.clone());
        moved
    }

    /// Change the height floor, e.g. after the view was resized
    pub fn set_view_height(&mut self, view_height: f32) {
        self.view_height = view_height;
        self.recompute_height();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .strokes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
    }

    fn recompute_height(&mut self) {
        self.height = self
            .strokes
            .iter()
            .map(|s| s.bottom() + self.padding)
            .fold(self.view_height, f32::max);
    }

    fn schedule_persist(&self) {
        if let Some(handle) = &self.persist {
            handle.request();
        }
    }
}
