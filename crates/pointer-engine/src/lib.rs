//! Myopoint Pointer Engine
//!
//! Owns the per-packet pipeline. Every delivered sample batch is validated,
//! routed to the motion controller (inertial, envelope) or the gesture
//! classifier (signal), and any resulting intent is handed to a
//! [`PointerSink`]:
//!
//! - **Recording:** Keeps intents in memory (tests, diagnostics)
//! - **Tracing:** Logs intents as structured events
//! - **JSONL:** Appends intents to a file for replay analysis
//!
//! Nothing that happens to one packet, including a failing sink, can stop
//! the next packet from being processed.

pub mod engine;
pub mod sinks;
pub mod telemetry;
pub mod writer;

use myopoint_common::error::MyopointResult;
use myopoint_sensor_model::action::PointerIntent;

pub use engine::{ControlEngine, EngineConfig, EngineStats, HandleOutcome};
pub use sinks::{RecordingSink, TracingSink};
pub use telemetry::{TelemetryBuffer, TelemetrySnapshot};
pub use writer::{IntentStreamHeader, JsonlSink};

/// The pointer-injection collaborator.
///
/// Implementations must not block; injection is best-effort and a failed
/// dispatch only costs that one intent.
pub trait PointerSink: Send {
    /// Deliver one intent.
    fn dispatch(&mut self, intent: &PointerIntent) -> MyopointResult<()>;

    /// Sink name for logging.
    fn name(&self) -> &str;

    /// Push out anything buffered. Called when the engine stops.
    fn flush(&mut self) -> MyopointResult<()> {
        Ok(())
    }
}
