//! Motion controller variants.
//!
//! One [`MotionController`] drives every variant. What differs between the
//! acceleration, responsive-gyro and smooth-gyro controllers is data: a
//! [`ControllerProfile`] picks the input channel, the axis mapping, timing
//! constants and the optional filters. Per accepted inertial sample:
//!
//! ```text
//! sample ─► warm-up ─► rate limit ─► spike filter ─► EMG gate ─► rest pose ─► shaper ─► step
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use myopoint_common::clock::{elapsed_secs, RateLimiter, TimestampNs};
use myopoint_common::error::{MyopointError, MyopointResult};
use myopoint_sensor_model::action::Displacement;
use myopoint_sensor_model::sample::{Axis, Channel, InertialSample, Vec3};

use crate::activation::{ActivationConfig, ActivationGate};
use crate::calibration::{CalibrationStatus, Calibrator};
use crate::shaper::{AxisPair, MotionShaper, ResponseCurve, ShapeStage, ShaperConfig};

/// Selects a controller preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControllerVariant {
    /// Tilt the hand; accelerometer X/Y drive the pointer.
    Accel,
    /// Rotate the hand; high smoothing weight, short stillness timeout.
    #[default]
    GyroResponsive,
    /// Rotate the hand; calmer response with a steeper curve.
    GyroSmooth,
}

impl ControllerVariant {
    pub const ALL: [ControllerVariant; 3] = [
        ControllerVariant::Accel,
        ControllerVariant::GyroResponsive,
        ControllerVariant::GyroSmooth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerVariant::Accel => "accel",
            ControllerVariant::GyroResponsive => "gyro_responsive",
            ControllerVariant::GyroSmooth => "gyro_smooth",
        }
    }
}

impl fmt::Display for ControllerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ControllerVariant {
    type Err = MyopointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "accel" | "mems" => Ok(ControllerVariant::Accel),
            "gyro_responsive" | "responsive" | "online" => Ok(ControllerVariant::GyroResponsive),
            "gyro_smooth" | "smooth" | "gyro" => Ok(ControllerVariant::GyroSmooth),
            other => Err(MyopointError::config(format!(
                "unknown controller variant '{other}' (expected accel, gyro_responsive or gyro_smooth)"
            ))),
        }
    }
}

/// Discard updates that jump too far too soon after the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeFilterConfig {
    /// Updates closer together than this are checked.
    pub window_secs: f64,

    /// Largest per-axis change tolerated inside the window.
    pub max_delta: f64,
}

/// Every tunable of one controller variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerProfile {
    pub variant: ControllerVariant,

    /// Inertial channel feeding the deviation vector.
    pub channel: Channel,

    /// Sensor axis driving horizontal motion (before swap).
    pub axis_x: Axis,

    /// Sensor axis driving vertical motion (before swap).
    pub axis_y: Axis,

    /// Readings averaged into the neutral baseline.
    pub neutral_samples: usize,

    /// Minimum time between processed updates.
    pub update_interval_secs: f64,

    /// Baseline pull per settled, centered update.
    pub recenter_alpha: f64,

    /// Gyro distance from its rest baseline under which motion is held.
    /// Only meaningful when `channel` is not the gyroscope.
    pub rest_gyro_eps: Option<f64>,

    pub spike_filter: Option<SpikeFilterConfig>,

    pub shaper: ShaperConfig,

    pub activation: ActivationConfig,
}

impl ControllerProfile {
    pub fn for_variant(variant: ControllerVariant) -> Self {
        match variant {
            ControllerVariant::Accel => Self::accel(),
            ControllerVariant::GyroResponsive => Self::gyro_responsive(),
            ControllerVariant::GyroSmooth => Self::gyro_smooth(),
        }
    }

    fn accel() -> Self {
        let deadzone = 0.06;
        Self {
            variant: ControllerVariant::Accel,
            channel: Channel::Accel,
            axis_x: Axis::X,
            axis_y: Axis::Y,
            neutral_samples: 100,
            update_interval_secs: 0.005,
            recenter_alpha: 0.002,
            rest_gyro_eps: Some(6.0),
            spike_filter: None,
            shaper: ShaperConfig {
                deadzone,
                still_eps: 0.004,
                still_timeout_secs: 0.0,
                still_decay: 0.3,
                center_eps: 0.02,
                center_decay: 0.1,
                velocity_floor: deadzone * 0.5,
                curve: ResponseCurve::Power {
                    exponent: 1.5,
                    subtract_deadzone: true,
                },
                smooth_alpha: 0.25,
                damping: 1.0,
                dominance_ratio: Some(1.5),
                sensitivity_x: 900.0,
                sensitivity_y: 900.0,
                swap_axes: false,
                invert_x: false,
                invert_y: true,
                max_step_px: 40.0,
            },
            activation: ActivationConfig::default(),
        }
    }

    fn gyro_responsive() -> Self {
        Self {
            variant: ControllerVariant::GyroResponsive,
            channel: Channel::Gyro,
            axis_x: Axis::Z,
            axis_y: Axis::X,
            neutral_samples: 50,
            update_interval_secs: 0.004,
            recenter_alpha: 0.002,
            rest_gyro_eps: None,
            spike_filter: Some(SpikeFilterConfig {
                window_secs: 0.01,
                max_delta: 5.0,
            }),
            shaper: ShaperConfig {
                deadzone: 2.0,
                still_eps: 0.5,
                still_timeout_secs: 0.1,
                still_decay: 0.05,
                center_eps: 1.0,
                center_decay: 0.02,
                velocity_floor: 0.01,
                curve: ResponseCurve::Linear,
                smooth_alpha: 0.8,
                damping: 0.95,
                dominance_ratio: None,
                sensitivity_x: 8.0,
                sensitivity_y: 8.0,
                swap_axes: false,
                invert_x: true,
                invert_y: true,
                max_step_px: 50.0,
            },
            activation: ActivationConfig::default(),
        }
    }

    fn gyro_smooth() -> Self {
        Self {
            variant: ControllerVariant::GyroSmooth,
            channel: Channel::Gyro,
            axis_x: Axis::Z,
            axis_y: Axis::X,
            neutral_samples: 100,
            update_interval_secs: 0.005,
            recenter_alpha: 0.001,
            rest_gyro_eps: None,
            spike_filter: None,
            shaper: ShaperConfig {
                deadzone: 1.5,
                still_eps: 0.5,
                still_timeout_secs: 0.25,
                still_decay: 0.2,
                center_eps: 1.5,
                center_decay: 0.1,
                velocity_floor: 0.1,
                curve: ResponseCurve::Power {
                    exponent: 1.6,
                    subtract_deadzone: false,
                },
                smooth_alpha: 0.3,
                damping: 1.0,
                dominance_ratio: Some(1.5),
                sensitivity_x: 0.6,
                sensitivity_y: 0.6,
                swap_axes: false,
                invert_x: true,
                invert_y: true,
                max_step_px: 30.0,
            },
            activation: ActivationConfig::default(),
        }
    }

    /// Enable or disable EMG gating of motion.
    pub fn with_emg_gate(mut self, enabled: bool) -> Self {
        self.activation.enabled = enabled;
        self
    }

    pub fn validate(&self) -> MyopointResult<()> {
        if self.neutral_samples == 0 {
            return Err(MyopointError::calibration(
                "neutral sample count must be at least 1",
            ));
        }
        if !self.update_interval_secs.is_finite() || self.update_interval_secs <= 0.0 {
            return Err(MyopointError::config(format!(
                "update interval must be positive, got {}",
                self.update_interval_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.recenter_alpha) {
            return Err(MyopointError::config(format!(
                "recenter_alpha must be in [0, 1], got {}",
                self.recenter_alpha
            )));
        }
        if self.axis_x == self.axis_y {
            return Err(MyopointError::config(
                "axis_x and axis_y must be different sensor axes",
            ));
        }
        if let Some(eps) = self.rest_gyro_eps {
            if !eps.is_finite() || eps < 0.0 {
                return Err(MyopointError::config(format!(
                    "rest_gyro_eps must be finite and non-negative, got {eps}"
                )));
            }
        }
        if let Some(spike) = &self.spike_filter {
            if !(spike.window_secs >= 0.0 && spike.max_delta >= 0.0) {
                return Err(MyopointError::config("spike filter values must be non-negative"));
            }
        }
        self.shaper.validate()
    }
}

/// What one inertial update did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionStep {
    /// Still collecting neutral readings.
    Warming { accepted: usize, required: usize },
    /// This reading completed warm-up.
    Locked { baseline: Vec3 },
    /// Arrived before the update interval elapsed; state untouched.
    RateLimited,
    /// Jumped too far too soon; discarded.
    SpikeRejected,
    /// EMG gate enabled and the muscle is relaxed.
    Gated,
    /// Gyro back at its rest pose.
    RestPose,
    /// Stillness gate engaged.
    Still,
    /// Centering gate engaged.
    Centered,
    /// Pipeline ran but both axes resolved to zero.
    Idle,
    Move(Displacement),
}

impl MotionStep {
    pub fn displacement(&self) -> Option<Displacement> {
        match self {
            MotionStep::Move(d) => Some(*d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct SpikeFilter {
    config: SpikeFilterConfig,
    last_ns: Option<TimestampNs>,
}

impl SpikeFilter {
    /// True when the update should be discarded.
    fn check(&mut self, now: TimestampNs, raw: AxisPair, last_raw: Option<AxisPair>) -> bool {
        let spike = match (self.last_ns, last_raw) {
            (Some(prev_ns), Some(prev)) => {
                elapsed_secs(prev_ns, now) < self.config.window_secs
                    && ((raw.x - prev.x).abs() > self.config.max_delta
                        || (raw.y - prev.y).abs() > self.config.max_delta)
            }
            _ => false,
        };
        self.last_ns = Some(now);
        spike
    }
}

/// Turns a stream of inertial samples into pointer displacements.
#[derive(Debug, Clone)]
pub struct MotionController {
    profile: ControllerProfile,
    calibrator: Calibrator,
    rest: Option<(Calibrator, f64)>,
    limiter: RateLimiter,
    spike: Option<SpikeFilter>,
    shaper: MotionShaper,
    gate: ActivationGate,
}

impl MotionController {
    pub fn new(profile: ControllerProfile) -> MyopointResult<Self> {
        profile.validate()?;

        let rest = match profile.rest_gyro_eps {
            Some(eps) if profile.channel != Channel::Gyro => {
                Some((Calibrator::new(profile.neutral_samples)?, eps))
            }
            _ => None,
        };

        Ok(Self {
            calibrator: Calibrator::new(profile.neutral_samples)?,
            rest,
            limiter: RateLimiter::from_secs(profile.update_interval_secs),
            spike: profile.spike_filter.clone().map(|config| SpikeFilter {
                config,
                last_ns: None,
            }),
            shaper: MotionShaper::new(profile.shaper.clone())?,
            gate: ActivationGate::new(profile.activation.clone())?,
            profile,
        })
    }

    pub fn for_variant(variant: ControllerVariant) -> MyopointResult<Self> {
        Self::new(ControllerProfile::for_variant(variant))
    }

    /// Process one validated inertial sample.
    pub fn update(&mut self, sample: &InertialSample) -> MotionStep {
        let now = sample.timestamp_ns;
        let reading = sample.channel(self.profile.channel);

        if !self.calibrator.is_locked() {
            // Both baselines must see the same readings.
            let rest_accepts = self
                .rest
                .as_ref()
                .map_or(true, |(rest, _)| rest.accepts(sample.gyro));
            if !rest_accepts || !self.calibrator.accepts(reading) {
                debug!(
                    target: "myopoint::calibration",
                    t = now,
                    "Warm-up reading out of range"
                );
                return MotionStep::Warming {
                    accepted: self.calibrator.accepted(),
                    required: self.calibrator.required(),
                };
            }
            if let Some((rest, _)) = self.rest.as_mut() {
                rest.accumulate(sample.gyro);
            }
            return match self.calibrator.accumulate(reading) {
                CalibrationStatus::Warming { accepted, required }
                | CalibrationStatus::Rejected { accepted, required } => {
                    MotionStep::Warming { accepted, required }
                }
                CalibrationStatus::JustLocked | CalibrationStatus::Locked => {
                    let baseline = self.calibrator.baseline().unwrap_or(reading);
                    info!(
                        target: "myopoint::calibration",
                        variant = %self.profile.variant,
                        samples = self.calibrator.required(),
                        x = baseline.x,
                        y = baseline.y,
                        z = baseline.z,
                        "Neutral pose captured"
                    );
                    MotionStep::Locked { baseline }
                }
            };
        }

        if !self.limiter.try_acquire(now) {
            return MotionStep::RateLimited;
        }

        let raw = self.project(reading);

        if let Some(spike) = self.spike.as_mut() {
            if spike.check(now, raw, self.shaper.last_raw()) {
                debug!(
                    target: "myopoint::calibration",
                    t = now,
                    "Spike rejected"
                );
                return MotionStep::SpikeRejected;
            }
        }

        if !self.gate.allows_motion() {
            self.shaper.halt();
            self.shaper.observe(raw);
            return MotionStep::Gated;
        }

        if let Some((rest, eps)) = &self.rest {
            if let Some(rest_baseline) = rest.baseline() {
                if sample.gyro.distance(&rest_baseline) < *eps {
                    self.shaper.halt();
                    self.shaper.observe(raw);
                    return MotionStep::RestPose;
                }
            }
        }

        let deviation = match self.calibrator.deviation(reading) {
            Some(d) => self.project(d),
            None => return MotionStep::Idle,
        };

        let out = self.shaper.shape(raw, deviation, now);
        match out.stage {
            ShapeStage::Still => MotionStep::Still,
            ShapeStage::Centered => {
                if self.shaper.is_settled() {
                    self.calibrator
                        .recenter(reading, self.profile.recenter_alpha);
                }
                MotionStep::Centered
            }
            ShapeStage::Moving if out.displacement.is_zero() => MotionStep::Idle,
            ShapeStage::Moving => MotionStep::Move(out.displacement),
        }
    }

    /// Fold an EMG envelope amplitude (µV) into the activation gate.
    pub fn update_emg(&mut self, microvolts: f64) -> bool {
        self.gate.update(microvolts)
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }

    /// Smoothed envelope amplitude (µV).
    pub fn activation(&self) -> f64 {
        self.gate.smoothed()
    }

    pub fn set_emg_gate(&mut self, enabled: bool) {
        self.gate.set_enabled(enabled);
    }

    pub fn calibration_status(&self) -> CalibrationStatus {
        if self.calibrator.is_locked() {
            CalibrationStatus::Locked
        } else {
            CalibrationStatus::Warming {
                accepted: self.calibrator.accepted(),
                required: self.calibrator.required(),
            }
        }
    }

    pub fn baseline(&self) -> Option<Vec3> {
        self.calibrator.baseline()
    }

    pub fn velocity(&self) -> AxisPair {
        self.shaper.velocity()
    }

    pub fn profile(&self) -> &ControllerProfile {
        &self.profile
    }

    pub fn variant(&self) -> ControllerVariant {
        self.profile.variant
    }

    fn project(&self, v: Vec3) -> AxisPair {
        AxisPair::new(v.axis(self.profile.axis_x), v.axis(self.profile.axis_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    fn gyro(t: u64, x: f64, z: f64) -> InertialSample {
        InertialSample::new(t, Vec3::new(0.0, 0.0, 1.0), Vec3::new(x, 0.0, z))
    }

    /// Calibrate a controller at a constant reading, 5ms apart.
    fn warm_up(ctrl: &mut MotionController, sample: impl Fn(u64) -> InertialSample) -> u64 {
        let n = ctrl.profile().neutral_samples as u64;
        for i in 0..n {
            ctrl.update(&sample(i * 5 * MS));
        }
        n * 5 * MS
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!(
            "gyro_responsive".parse::<ControllerVariant>().unwrap(),
            ControllerVariant::GyroResponsive
        );
        assert_eq!("Smooth".parse::<ControllerVariant>().unwrap(), ControllerVariant::GyroSmooth);
        assert_eq!("accel".parse::<ControllerVariant>().unwrap(), ControllerVariant::Accel);
        assert!("joystick".parse::<ControllerVariant>().is_err());
        for v in ControllerVariant::ALL {
            assert_eq!(v.to_string().parse::<ControllerVariant>().unwrap(), v);
        }
    }

    #[test]
    fn test_presets_validate() {
        for v in ControllerVariant::ALL {
            let profile = ControllerProfile::for_variant(v);
            assert_eq!(profile.variant, v);
            assert!(profile.validate().is_ok(), "{v} preset invalid");
            assert!(!profile.activation.enabled);
        }
    }

    #[test]
    fn test_profile_survives_json() {
        let profile = ControllerProfile::for_variant(ControllerVariant::Accel);
        let json = serde_json::to_string_pretty(&profile).unwrap();
        assert!(json.contains("\"variant\": \"accel\""));
        let back: ControllerProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_zero_neutral_samples_is_rejected() {
        let mut profile = ControllerProfile::for_variant(ControllerVariant::GyroSmooth);
        profile.neutral_samples = 0;
        assert!(MotionController::new(profile).is_err());
    }

    #[test]
    fn test_fifty_sample_gyro_calibration_scenario() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::GyroResponsive).unwrap();
        for i in 0..49 {
            let step = ctrl.update(&gyro(i * 5 * MS, 1.0, 2.0));
            assert!(matches!(step, MotionStep::Warming { .. }));
        }
        let step = ctrl.update(&gyro(245 * MS, 1.0, 2.0));
        assert!(matches!(step, MotionStep::Locked { .. }));

        let baseline = ctrl.baseline().unwrap();
        assert!((baseline.x - 1.0).abs() < 1e-12);
        assert!((baseline.z - 2.0).abs() < 1e-12);

        let step = ctrl.update(&gyro(300 * MS, 1.0, 2.0));
        assert_eq!(step, MotionStep::Centered);
        assert_eq!(step.displacement(), None);
    }

    #[test]
    fn test_rate_limited_update_changes_nothing() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::GyroResponsive).unwrap();
        let t0 = warm_up(&mut ctrl, |t| gyro(t, 0.0, 0.0));
        assert!(matches!(ctrl.update(&gyro(t0, 0.0, 3.0)), MotionStep::Move(_)));
        let v = ctrl.velocity();
        assert_eq!(ctrl.update(&gyro(t0 + MS, 0.0, 40.0)), MotionStep::RateLimited);
        assert_eq!(ctrl.velocity(), v);
    }

    #[test]
    fn test_responsive_moves_against_rotation() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::GyroResponsive).unwrap();
        let t0 = warm_up(&mut ctrl, |t| gyro(t, 0.0, 0.0));
        // gz drives dx (inverted), gx drives dy (inverted).
        let step = ctrl.update(&gyro(t0, 4.0, 3.0));
        let d = step.displacement().unwrap();
        assert!(d.dx < 0.0);
        assert!(d.dy < 0.0);
        assert!(d.dx.abs() <= 50.0 && d.dy.abs() <= 50.0);
    }

    #[test]
    fn test_spike_is_rejected_then_motion_resumes() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::GyroResponsive).unwrap();
        let t0 = warm_up(&mut ctrl, |t| gyro(t, 0.0, 0.0));
        assert!(matches!(ctrl.update(&gyro(t0, 0.0, 3.0)), MotionStep::Move(_)));
        assert_eq!(
            ctrl.update(&gyro(t0 + 5 * MS, 0.0, 30.0)),
            MotionStep::SpikeRejected
        );
        // Same jump after the window has passed is accepted.
        assert!(matches!(
            ctrl.update(&gyro(t0 + 20 * MS, 0.0, 30.0)),
            MotionStep::Move(_)
        ));
    }

    #[test]
    fn test_emg_gate_holds_motion_until_active() {
        let profile = ControllerProfile::for_variant(ControllerVariant::GyroSmooth).with_emg_gate(true);
        let mut ctrl = MotionController::new(profile).unwrap();
        let t0 = warm_up(&mut ctrl, |t| gyro(t, 0.0, 0.0));

        assert_eq!(ctrl.update(&gyro(t0, 0.0, 20.0)), MotionStep::Gated);
        assert!(!ctrl.is_active());

        ctrl.update_emg(50.0);
        assert!(ctrl.is_active());
        assert!(ctrl.activation() > 5.0);
        assert!(matches!(
            ctrl.update(&gyro(t0 + 10 * MS, 0.0, 21.0)),
            MotionStep::Move(_)
        ));
    }

    #[test]
    fn test_emg_gate_disabled_by_default() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::GyroSmooth).unwrap();
        let t0 = warm_up(&mut ctrl, |t| gyro(t, 0.0, 0.0));
        assert!(!ctrl.is_active());
        assert!(matches!(ctrl.update(&gyro(t0, 0.0, 20.0)), MotionStep::Move(_)));
    }

    #[test]
    fn test_accel_rest_pose_holds_pointer() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::Accel).unwrap();
        let level = |t| InertialSample::new(t, Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO);
        let t0 = warm_up(&mut ctrl, level);

        // Tilted but not rotating: rest pose wins.
        let tilted = InertialSample::new(t0, Vec3::new(0.5, 0.0, 0.9), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(ctrl.update(&tilted), MotionStep::RestPose);

        // Tilted while rotating: moves right.
        let moving =
            InertialSample::new(t0 + 10 * MS, Vec3::new(0.55, 0.0, 0.9), Vec3::new(0.0, 20.0, 0.0));
        let d = ctrl.update(&moving).displacement().unwrap();
        assert!(d.dx > 0.0);
        assert_eq!(d.dy, 0.0);
        assert!(d.dx <= 40.0);
    }

    #[test]
    fn test_settled_center_recenters_baseline() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::GyroResponsive).unwrap();
        let t0 = warm_up(&mut ctrl, |t| gyro(t, 0.0, 0.0));
        assert_eq!(ctrl.update(&gyro(t0, 0.5, 0.5)), MotionStep::Centered);
        let b = ctrl.baseline().unwrap();
        assert!((b.x - 0.001).abs() < 1e-12);
        assert!((b.z - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_extreme_readings_do_not_freeze_pointer() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::GyroSmooth).unwrap();
        let mut t = warm_up(&mut ctrl, |t| gyro(t, 0.0, 0.0));
        for z in [1e200, -1e200] {
            ctrl.update(&gyro(t, 0.0, z));
            t += 5 * MS;
        }
        assert!(ctrl.velocity().x.is_finite());

        let mut moves = 0;
        for i in 0..400 {
            let z = if i % 2 == 0 { 20.0 } else { 25.0 };
            if let MotionStep::Move(d) = ctrl.update(&gyro(t, 0.0, z)) {
                assert!(d.dx < 0.0 && d.dx >= -30.0);
                moves += 1;
            }
            t += 5 * MS;
        }
        assert!(ctrl.velocity().x.is_finite());
        assert!(moves > 300, "only {moves} moves");
    }

    #[test]
    fn test_overflowing_warm_up_reading_is_skipped() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::Accel).unwrap();
        let n = ctrl.profile().neutral_samples;
        let level = |t| InertialSample::new(t, Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO);
        ctrl.update(&InertialSample::new(0, Vec3::new(f64::MAX, 0.0, 1.0), Vec3::ZERO));
        assert_eq!(
            ctrl.update(&InertialSample::new(5 * MS, Vec3::new(f64::MAX, 0.0, 1.0), Vec3::ZERO)),
            MotionStep::Warming {
                accepted: 1,
                required: n
            }
        );
        let mut t = 10 * MS;
        let mut locked = None;
        while locked.is_none() {
            if let MotionStep::Locked { baseline } = ctrl.update(&level(t)) {
                locked = Some(baseline);
            }
            t += 5 * MS;
        }
        let baseline = locked.unwrap();
        assert!(baseline.x.is_finite());
        assert_eq!(ctrl.calibration_status(), CalibrationStatus::Locked);
    }

    #[test]
    fn test_stillness_brings_velocity_to_zero() {
        let mut ctrl = MotionController::for_variant(ControllerVariant::GyroResponsive).unwrap();
        let mut t = warm_up(&mut ctrl, |t| gyro(t, 0.0, 0.0));
        // Ramp up gently to stay under the spike limit.
        for z in [3.0, 6.0, 9.0, 12.0] {
            ctrl.update(&gyro(t, 0.0, z));
            t += 5 * MS;
        }
        assert!(ctrl.velocity().x != 0.0);

        let mut settled = false;
        for _ in 0..60 {
            ctrl.update(&gyro(t, 0.0, 12.0));
            t += 5 * MS;
            if ctrl.velocity() == AxisPair::ZERO {
                settled = true;
                break;
            }
        }
        assert!(settled);
    }
}
