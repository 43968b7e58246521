//! Change notifications for rendering surfaces.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Rather than holding callbacks (and the lifetimes that come with them),
//! the editor publishes small event values on a
//! `tokio::sync::broadcast` channel. Subscribers fetch the new snapshot
//! from the editor when they see `SnapshotChanged`. Sending never blocks,
//! so the editing path stays synchronous.

use markflow_model::ChangeType;
use tokio::sync::broadcast;

/// Events published by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// A new snapshot became current
    SnapshotChanged { version: u64, change: ChangeType },
    /// The document was restored from storage
    DocumentLoaded,
    /// The document was written to storage
    DocumentSaved,
}

/// Event bus for broadcasting editor events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        // Slow subscribers lag instead of blocking the editor
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(EditorEvent::DocumentSaved);

        let event = rx.recv().await.unwrap();
        assert_eq!(event, EditorEvent::DocumentSaved);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.clone().subscribe();

        bus.emit(EditorEvent::SnapshotChanged {
            version: 3,
            change: ChangeType::SplitBlock,
        });

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::new().emit(EditorEvent::DocumentLoaded);
    }
}
