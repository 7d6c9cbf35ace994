//! In-process pointer sinks.

use std::sync::{Arc, Mutex};

use myopoint_common::error::MyopointResult;
use myopoint_sensor_model::action::{IntentKind, PointerIntent};

use crate::PointerSink;

/// Keeps every intent in memory.
///
/// Clones share the same buffer, so a clone kept outside the engine sees
/// what the boxed sink received.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    intents: Arc<Mutex<Vec<PointerIntent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn intents(&self) -> Vec<PointerIntent> {
        self.intents
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.intents
            .lock()
            .map(|guard| guard.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PointerSink for RecordingSink {
    fn dispatch(&mut self, intent: &PointerIntent) -> MyopointResult<()> {
        let mut guard = self
            .intents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.push(intent.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Emits every intent as a structured tracing event.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl PointerSink for TracingSink {
    fn dispatch(&mut self, intent: &PointerIntent) -> MyopointResult<()> {
        match &intent.kind {
            IntentKind::Move { dx, dy } => {
                tracing::trace!(target: "myopoint::engine", t = intent.timestamp_ns, dx, dy, "Move");
            }
            IntentKind::Click { button } => {
                tracing::info!(target: "myopoint::engine", t = intent.timestamp_ns, ?button, "Click");
            }
            IntentKind::Button { button, state } => {
                tracing::info!(
                    target: "myopoint::engine",
                    t = intent.timestamp_ns,
                    ?button,
                    ?state,
                    "Button"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myopoint_sensor_model::action::{Displacement, GestureEvent};

    #[test]
    fn test_recording_sink_clones_share_buffer() {
        let sink = RecordingSink::new();
        let mut boxed: Box<dyn PointerSink> = Box::new(sink.clone());
        boxed
            .dispatch(&PointerIntent::movement(1, Displacement::new(2.0, -1.0)))
            .unwrap();
        boxed
            .dispatch(&PointerIntent::from_gesture(2, GestureEvent::RightClick))
            .unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.intents()[0].displacement(), Some(Displacement::new(2.0, -1.0)));
        assert!(sink.intents()[1].is_action());
    }

    #[test]
    fn test_tracing_sink_accepts_everything() {
        let mut sink = TracingSink;
        for gesture in [
            GestureEvent::LeftClick,
            GestureEvent::DragStart,
            GestureEvent::DragEnd,
        ] {
            assert!(sink.dispatch(&PointerIntent::from_gesture(0, gesture)).is_ok());
        }
        assert_eq!(sink.name(), "tracing");
    }
}
