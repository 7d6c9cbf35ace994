//! Myopoint Control Core
//!
//! Turns validated sensor samples into pointer motion and gestures:
//! - **Calibration:** Neutral-pose baseline from the first readings, slow drift recentering
//! - **Shaping:** Stillness and centering gates, dead-zone, response curve, smoothing, clamp
//! - **Controllers:** Accelerometer and gyroscope variants as data-driven profiles
//! - **Activation:** Optional EMG gate on pointer motion
//! - **Gestures:** EMG amplitude to click and drag events
//!
//! This crate is pure computation: no I/O, no clocks, no threads.
//! Time comes from sample timestamps.

pub mod activation;
pub mod calibration;
pub mod controller;
pub mod gesture;
pub mod shaper;

pub use activation::{ActivationConfig, ActivationGate};
pub use calibration::{CalibrationStatus, Calibrator};
pub use controller::{
    ControllerProfile, ControllerVariant, MotionController, MotionStep, SpikeFilterConfig,
};
pub use gesture::{GestureClassifier, AMPLITUDE_HISTORY};
pub use shaper::{AxisPair, MotionShaper, ResponseCurve, ShapeOutput, ShapeStage, ShaperConfig};
