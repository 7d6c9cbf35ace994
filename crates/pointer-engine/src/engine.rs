//! The control engine: single owner of controller and classifier state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use myopoint_common::config::ControlDefaults;
use myopoint_common::error::MyopointResult;
use myopoint_control_core::{
    ControllerProfile, ControllerVariant, GestureClassifier, MotionController, MotionStep,
};
use myopoint_sensor_model::action::{GestureEvent, PointerIntent};
use myopoint_sensor_model::sample::{ingest, IngressError, RawSample, Sample};
use myopoint_sensor_model::thresholds::ThresholdConfig;

use crate::telemetry::{TelemetryBuffer, DEFAULT_TELEMETRY_CAPACITY};
use crate::PointerSink;

/// How long the run loop waits for a sample before re-checking the stop flag.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Everything needed to build a [`ControlEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub profile: ControllerProfile,
    pub thresholds: ThresholdConfig,
    pub telemetry_capacity: usize,
}

impl EngineConfig {
    pub fn new(variant: ControllerVariant, thresholds: ThresholdConfig) -> Self {
        Self {
            profile: ControllerProfile::for_variant(variant),
            thresholds,
            telemetry_capacity: DEFAULT_TELEMETRY_CAPACITY,
        }
    }

    /// Build from the application's control defaults.
    pub fn from_defaults(
        defaults: &ControlDefaults,
        thresholds: ThresholdConfig,
    ) -> MyopointResult<Self> {
        let variant: ControllerVariant = defaults.variant.parse()?;
        Ok(Self {
            profile: ControllerProfile::for_variant(variant)
                .with_emg_gate(defaults.emg_gate_enabled),
            thresholds,
            telemetry_capacity: defaults.telemetry_capacity,
        })
    }
}

/// Counters over the engine's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub samples_received: u64,
    pub dropped_malformed: u64,
    pub inertial_processed: u64,
    pub rate_limited: u64,
    pub spikes_rejected: u64,
    pub envelope_updates: u64,
    pub signal_updates: u64,
    pub moves: u64,
    pub gestures: u64,
    pub sink_failures: u64,
}

/// What [`ControlEngine::handle`] did with one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    /// Failed validation; nothing downstream saw it.
    Dropped(IngressError),
    Motion(MotionStep),
    /// Envelope folded into the activation gate; carries the new flag.
    Envelope { active: bool },
    Gesture(Option<GestureEvent>),
}

pub struct ControlEngine {
    controller: MotionController,
    classifier: GestureClassifier,
    sink: Box<dyn PointerSink>,
    telemetry: TelemetryBuffer,
    stats: EngineStats,
    stop_flag: Arc<AtomicBool>,
}

impl ControlEngine {
    /// Build the engine. Only misconfiguration fails here.
    pub fn new(config: EngineConfig, sink: Box<dyn PointerSink>) -> MyopointResult<Self> {
        Ok(Self {
            controller: MotionController::new(config.profile)?,
            classifier: GestureClassifier::new(config.thresholds)?,
            sink,
            telemetry: TelemetryBuffer::new(config.telemetry_capacity),
            stats: EngineStats::default(),
            stop_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Process one delivered batch to completion.
    ///
    /// Never fails: bad samples are counted and skipped, sink failures are
    /// counted and logged.
    pub fn handle(&mut self, raw: &RawSample) -> HandleOutcome {
        self.stats.samples_received += 1;

        let sample = match ingest(raw) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.dropped_malformed += 1;
                debug!(
                    target: "myopoint::engine",
                    t = raw.timestamp_ns,
                    kind = raw.kind_name(),
                    error = %e,
                    "Dropped malformed sample"
                );
                return HandleOutcome::Dropped(e);
            }
        };

        match sample {
            Sample::Inertial(s) => {
                self.telemetry.record_inertial(s.timestamp_ns, s.accel, s.gyro);
                self.stats.inertial_processed += 1;

                let step = self.controller.update(&s);
                match step {
                    MotionStep::RateLimited => self.stats.rate_limited += 1,
                    MotionStep::SpikeRejected => self.stats.spikes_rejected += 1,
                    MotionStep::Move(d) => {
                        self.stats.moves += 1;
                        self.dispatch(PointerIntent::movement(s.timestamp_ns, d));
                    }
                    _ => {}
                }
                HandleOutcome::Motion(step)
            }
            Sample::Envelope(a) => {
                self.telemetry.record_envelope(a.timestamp_ns, a.microvolts);
                self.stats.envelope_updates += 1;
                HandleOutcome::Envelope {
                    active: self.controller.update_emg(a.microvolts),
                }
            }
            Sample::Signal(a) => {
                self.telemetry.record_signal_peak(a.timestamp_ns, a.microvolts);
                self.stats.signal_updates += 1;

                let gesture = self.classifier.classify(a.microvolts, a.timestamp_ns);
                if let Some(g) = gesture {
                    self.stats.gestures += 1;
                    self.dispatch(PointerIntent::from_gesture(a.timestamp_ns, g));
                }
                HandleOutcome::Gesture(gesture)
            }
        }
    }

    /// Consume samples until the channel closes or the stop flag is set.
    pub async fn run(&mut self, mut samples: mpsc::Receiver<RawSample>) -> MyopointResult<EngineStats> {
        info!(
            target: "myopoint::engine",
            variant = %self.controller.variant(),
            sink = %self.sink.name(),
            "Control engine started"
        );

        while !self.stop_flag.load(Ordering::Relaxed) {
            match tokio::time::timeout(IDLE_POLL, samples.recv()).await {
                Ok(Some(raw)) => {
                    self.handle(&raw);
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }

        self.sink.flush()?;
        info!(
            target: "myopoint::engine",
            received = self.stats.samples_received,
            moves = self.stats.moves,
            gestures = self.stats.gestures,
            dropped = self.stats.dropped_malformed,
            sink_failures = self.stats.sink_failures,
            "Control engine stopped"
        );
        Ok(self.stats.clone())
    }

    /// Swap classifier thresholds. Gesture state carries over.
    pub fn reconfigure_thresholds(&mut self, thresholds: ThresholdConfig) -> MyopointResult<()> {
        self.classifier.reconfigure(thresholds)
    }

    pub fn set_emg_gate(&mut self, enabled: bool) {
        self.controller.set_emg_gate(enabled);
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Handle for display consumers.
    pub fn telemetry(&self) -> TelemetryBuffer {
        self.telemetry.clone()
    }

    pub fn controller(&self) -> &MotionController {
        &self.controller
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Get the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    fn dispatch(&mut self, intent: PointerIntent) {
        if let Err(e) = self.sink.dispatch(&intent) {
            self.stats.sink_failures += 1;
            warn!(
                target: "myopoint::engine",
                sink = %self.sink.name(),
                t = intent.timestamp_ns,
                error = %e,
                "Pointer dispatch failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::RecordingSink;
    use myopoint_common::error::MyopointError;
    use myopoint_sensor_model::sample::{RawPayload, Vec3};

    const MS: u64 = 1_000_000;

    struct FailingSink;

    impl PointerSink for FailingSink {
        fn dispatch(&mut self, _intent: &PointerIntent) -> MyopointResult<()> {
            Err(MyopointError::sink("injector unavailable"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn engine_with(sink: Box<dyn PointerSink>) -> ControlEngine {
        let config = EngineConfig::new(
            ControllerVariant::GyroResponsive,
            ThresholdConfig::with_levels(150.0, 250.0, 825.0),
        );
        ControlEngine::new(config, sink).unwrap()
    }

    fn calibrate(engine: &mut ControlEngine) -> u64 {
        for i in 0..50 {
            engine.handle(&RawSample::mems(i * 5 * MS, Vec3::ZERO, Vec3::ZERO));
        }
        50 * 5 * MS
    }

    #[test]
    fn test_malformed_sample_is_dropped_without_side_effects() {
        let sink = RecordingSink::new();
        let mut engine = engine_with(Box::new(sink.clone()));
        let empty = RawSample {
            timestamp_ns: 0,
            payload: RawPayload::Mems { packets: vec![] },
        };
        assert!(matches!(engine.handle(&empty), HandleOutcome::Dropped(_)));

        let nan = RawSample::mems(1, Vec3::new(f64::NAN, 0.0, 0.0), Vec3::ZERO);
        assert!(matches!(engine.handle(&nan), HandleOutcome::Dropped(_)));

        assert_eq!(engine.stats().dropped_malformed, 2);
        assert_eq!(engine.stats().inertial_processed, 0);
        assert!(engine.telemetry().snapshot().is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_moves_and_gestures_reach_sink() {
        let sink = RecordingSink::new();
        let mut engine = engine_with(Box::new(sink.clone()));
        let t0 = calibrate(&mut engine);

        let outcome = engine.handle(&RawSample::mems(t0, Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0)));
        assert!(matches!(outcome, HandleOutcome::Motion(MotionStep::Move(_))));

        let outcome = engine.handle(&RawSample::signal(t0 + MS, vec![0.0001, -0.0009]));
        assert_eq!(outcome, HandleOutcome::Gesture(Some(GestureEvent::DragStart)));

        let intents = sink.intents();
        assert_eq!(intents.len(), 2);
        assert!(intents[0].displacement().unwrap().dx < 0.0);
        assert!(intents[1].is_action());
        assert_eq!(engine.stats().moves, 1);
        assert_eq!(engine.stats().gestures, 1);
    }

    #[test]
    fn test_sink_failure_never_stops_processing() {
        let mut engine = engine_with(Box::new(FailingSink));
        let t0 = calibrate(&mut engine);

        for i in 0..5 {
            engine.handle(&RawSample::signal(t0 + i * 600 * MS, vec![0.0003]));
        }
        assert_eq!(engine.stats().gestures, 5);
        assert_eq!(engine.stats().sink_failures, 5);
        assert!(engine.classifier().last_action().is_some());
    }

    #[test]
    fn test_envelope_updates_activation() {
        let mut engine = engine_with(Box::new(RecordingSink::new()));
        let outcome = engine.handle(&RawSample::envelope(0, 0.00005));
        assert_eq!(outcome, HandleOutcome::Envelope { active: true });
        assert!(engine.controller().activation() > 5.0);
        assert_eq!(engine.telemetry().snapshot().envelope.len(), 1);
    }

    #[test]
    fn test_rate_limited_samples_are_counted() {
        let mut engine = engine_with(Box::new(RecordingSink::new()));
        let t0 = calibrate(&mut engine);
        engine.handle(&RawSample::mems(t0, Vec3::ZERO, Vec3::ZERO));
        engine.handle(&RawSample::mems(t0 + MS, Vec3::ZERO, Vec3::ZERO));
        assert_eq!(engine.stats().rate_limited, 1);
    }

    #[test]
    fn test_reconfigure_thresholds_applies_to_next_sample() {
        let sink = RecordingSink::new();
        let mut engine = engine_with(Box::new(sink.clone()));
        assert_eq!(
            engine.handle(&RawSample::signal(0, vec![0.0002])),
            HandleOutcome::Gesture(Some(GestureEvent::LeftClick))
        );
        engine
            .reconfigure_thresholds(ThresholdConfig::with_levels(300.0, 400.0, 900.0))
            .unwrap();
        assert_eq!(
            engine.handle(&RawSample::signal(600 * MS, vec![0.0002])),
            HandleOutcome::Gesture(None)
        );
        assert!(engine
            .reconfigure_thresholds(ThresholdConfig::with_levels(-1.0, 400.0, 900.0))
            .is_err());
    }

    #[test]
    fn test_from_defaults_rejects_unknown_variant() {
        let defaults = ControlDefaults {
            variant: "trackball".to_string(),
            ..ControlDefaults::default()
        };
        assert!(EngineConfig::from_defaults(&defaults, ThresholdConfig::default()).is_err());

        let defaults = ControlDefaults {
            emg_gate_enabled: true,
            ..ControlDefaults::default()
        };
        let config = EngineConfig::from_defaults(&defaults, ThresholdConfig::default()).unwrap();
        assert!(config.profile.activation.enabled);
    }
}
