//! Undo/redo of stroke edits
//!
//! Each committed edit is recorded as the [`Operation`] that was applied to
//! the store. Undo applies its inverse, redo applies it again.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::Rect;
use crate::store::PageStore;
use crate::types::Stroke;

/// Which way the history moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// A recorded store edit
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    AddStrokes(Vec<Stroke>),
    DeleteStrokes(Vec<Stroke>),
}

impl Operation {
    pub fn strokes(&self) -> &[Stroke] {
        match self {
            Operation::AddStrokes(strokes) | Operation::DeleteStrokes(strokes) => strokes,
        }
    }

    pub fn inverse(&self) -> Operation {
        match self {
            Operation::AddStrokes(strokes) => Operation::DeleteStrokes(strokes.clone()),
            Operation::DeleteStrokes(strokes) => Operation::AddStrokes(strokes.clone()),
        }
    }

    /// Union of the touched strokes' boxes in page space
    pub fn bounds(&self) -> Option<Rect> {
        self.strokes()
            .iter()
            .map(Stroke::bounding_rect)
            .reduce(|acc, r| acc.union(&r))
    }

    /// Apply to the store
    pub fn apply(&self, store: &mut PageStore) {
        match self {
            Operation::AddStrokes(strokes) => store.add_strokes(strokes.clone()),
            Operation::DeleteStrokes(strokes) => {
                let ids: Vec<&str> = strokes.iter().map(|s| s.id.as_str()).collect();
                store.remove_strokes(ids.as_slice());
            }
        }
    }
}

/// Bounded undo stack plus redo stack
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Operation>,
    redo_stack: Vec<Operation>,
    max_levels: usize,
}

impl History {
    pub fn new(max_levels: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record an edit that was already applied. Clears the redo stack.
    pub fn commit(&mut self, operation: Operation) {
        if operation.strokes().is_empty() {
            return;
        }
        self.undo_stack.push_back(operation);
        while self.undo_stack.len() > self.max_levels {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// Revert the last edit; returns the operation applied to the store
    pub fn undo(&mut self, store: &mut PageStore) -> Option<Operation> {
        let Some(operation) = self.undo_stack.pop_back() else {
            debug!("History::undo: nothing to undo");
            return None;
        };
        let applied = operation.inverse();
        applied.apply(store);
        debug!("History::undo: reverted {} strokes", operation.strokes().len());
        self.redo_stack.push(operation);
        Some(applied)
    }

    /// Re-apply the last undone edit; returns the operation applied to the store
    pub fn redo(&mut self, store: &mut PageStore) -> Option<Operation> {
        let Some(operation) = self.redo_stack.pop() else {
            debug!("History::redo: nothing to redo");
            return None;
        };
        operation.apply(store);
        debug!("History::redo: re-applied {} strokes", operation.strokes().len());
        self.undo_stack.push_back(operation.clone());
        Some(operation)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
