//! Myopoint Sensor Model
//!
//! Defines the data contracts shared by the control pipeline:
//! - **Samples:** Inertial and EMG batches, and the ingress step that validates them
//! - **Actions:** Pointer displacements, gestures, and the intents handed to the injector
//! - **Thresholds:** Click thresholds and the persisted record they are loaded from
//!
//! EMG amplitudes are in microvolts once past ingress; accelerations in g,
//! angular rates in deg/s.

pub mod action;
pub mod sample;
pub mod thresholds;

pub use action::*;
pub use sample::*;
pub use thresholds::*;
