//! Session events
//!
//! Everything a drawing session wants its presenter to know is published
//! on a broadcast channel. Sending never blocks and having no subscribers
//! is not an error.

use std::path::PathBuf;

use tokio::sync::broadcast;
use tracing::trace;

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::geometry::Rect;
use crate::history::HistoryAction;
use crate::types::Stroke;

/// Notifications emitted by a [`crate::session::DrawingSession`]
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Present the bitmap; `Some` limits it to a view rectangle
    ForceUpdate(Option<Rect>),
    /// The whole view was redrawn
    RefreshUi,
    /// True while an erase gesture is being processed
    DrawingStateChanged(bool),
    StrokeOptionsOpened(bool),
    UndoRedoPerformed(HistoryAction),
    StrokesAdded(Vec<Stroke>),
    /// Ids of removed strokes
    StrokesRemoved(Vec<String>),
    /// Strokes moved in place, e.g. by a page shift
    StrokesUpdated(Vec<Stroke>),
    PagePersisted(PathBuf),
}

/// Broadcast fan-out for [`SessionEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            trace!("EventBus: no subscribers");
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        bus.emit(SessionEvent::RefreshUi);
        assert_eq!(bus.receiver_count(), 0);
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(SessionEvent::DrawingStateChanged(true));
        bus.emit(SessionEvent::StrokesRemoved(vec!["a".to_string()]));

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::DrawingStateChanged(true))));
        match rx.try_recv() {
            Ok(SessionEvent::StrokesRemoved(ids)) => assert_eq!(ids, vec!["a".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
