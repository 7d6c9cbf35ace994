//! Motion shaping: calibrated deviation in, bounded pixel step out.
//!
//! # Pipeline
//!
//! 1. **Stillness gate:** raw readings barely changing for `still_timeout`
//!    brake velocity hard and emit nothing.
//! 2. **Centering gate:** deviation inside `center_eps` on both axes brakes
//!    velocity harder still and emits nothing.
//! 3. **Dead-zone:** each axis below `deadzone` is treated as no input.
//! 4. **Response curve:** sign-preserving power law, joystick style.
//! 5. **Smoothing:** exponential moving average into stored velocity,
//!    followed by optional damping.
//! 6. **Axis dominance:** a much weaker axis is dropped from the output.
//! 7. **Mapping and clamp:** swap, invert, scale to pixels, clamp to
//!    `±max_step_px`.
//!
//! Braking multiplies velocity by a factor and snaps axes below
//! `velocity_floor` to exactly zero, so a resting hand always reaches a
//! true stop in a bounded number of ticks.

use serde::{Deserialize, Serialize};

use myopoint_common::clock::{elapsed_secs, TimestampNs};
use myopoint_common::error::{MyopointError, MyopointResult};
use myopoint_sensor_model::action::Displacement;

/// A pair of values on the two controlled sensor axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisPair {
    pub x: f64,
    pub y: f64,
}

impl AxisPair {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Non-linear response applied after the dead-zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseCurve {
    /// Pass values through unchanged.
    Linear,
    /// `sign(v) * m^exponent`, where `m` is `|v|`, or `|v| - deadzone`
    /// when `subtract_deadzone` is set. `exponent` must exceed 1.
    Power {
        exponent: f64,
        subtract_deadzone: bool,
    },
}

impl ResponseCurve {
    pub fn apply(&self, value: f64, deadzone: f64) -> f64 {
        if value == 0.0 {
            return 0.0;
        }
        match *self {
            ResponseCurve::Linear => value,
            ResponseCurve::Power {
                exponent,
                subtract_deadzone,
            } => {
                let magnitude = if subtract_deadzone {
                    (value.abs() - deadzone).max(0.0)
                } else {
                    value.abs()
                };
                value.signum() * magnitude.powf(exponent)
            }
        }
    }
}

/// Tunables for [`MotionShaper`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaperConfig {
    /// Per-axis dead-zone on the deviation.
    pub deadzone: f64,

    /// Raw change per tick below which the hand counts as still.
    pub still_eps: f64,

    /// How long stillness must last before braking.
    pub still_timeout_secs: f64,

    /// Velocity multiplier per still tick.
    pub still_decay: f64,

    /// Deviation window around neutral on both axes.
    pub center_eps: f64,

    /// Velocity multiplier per centered tick.
    pub center_decay: f64,

    /// Braked velocity below this snaps to zero.
    pub velocity_floor: f64,

    pub curve: ResponseCurve,

    /// EMA weight of the new value, in (0, 1].
    pub smooth_alpha: f64,

    /// Extra multiplier on velocity after smoothing; 1.0 disables it.
    pub damping: f64,

    /// Drop the weaker axis when the stronger exceeds it by this ratio.
    pub dominance_ratio: Option<f64>,

    /// Pixels per unit of shaped velocity on screen X.
    pub sensitivity_x: f64,

    /// Pixels per unit of shaped velocity on screen Y.
    pub sensitivity_y: f64,

    pub swap_axes: bool,
    pub invert_x: bool,
    pub invert_y: bool,

    /// Largest step per update on each screen axis.
    pub max_step_px: f64,
}

impl ShaperConfig {
    pub fn validate(&self) -> MyopointResult<()> {
        let non_negative = [
            ("deadzone", self.deadzone),
            ("still_eps", self.still_eps),
            ("still_timeout_secs", self.still_timeout_secs),
            ("center_eps", self.center_eps),
            ("velocity_floor", self.velocity_floor),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(MyopointError::config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        for (name, value) in [
            ("still_decay", self.still_decay),
            ("center_decay", self.center_decay),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(MyopointError::config(format!(
                    "{name} must be in [0, 1), got {value}"
                )));
            }
        }

        if !(self.smooth_alpha > 0.0 && self.smooth_alpha <= 1.0) {
            return Err(MyopointError::config(format!(
                "smooth_alpha must be in (0, 1], got {}",
                self.smooth_alpha
            )));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(MyopointError::config(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        if let Some(ratio) = self.dominance_ratio {
            if !ratio.is_finite() || ratio < 1.0 {
                return Err(MyopointError::config(format!(
                    "dominance_ratio must be at least 1, got {ratio}"
                )));
            }
        }
        if let ResponseCurve::Power { exponent, .. } = self.curve {
            if !exponent.is_finite() || exponent <= 1.0 {
                return Err(MyopointError::config(format!(
                    "curve exponent must be greater than 1, got {exponent}"
                )));
            }
        }
        for (name, value) in [
            ("sensitivity_x", self.sensitivity_x),
            ("sensitivity_y", self.sensitivity_y),
            ("max_step_px", self.max_step_px),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MyopointError::config(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Which part of the pipeline decided the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeStage {
    /// Stillness gate engaged.
    Still,
    /// Centering gate engaged.
    Centered,
    /// Full pipeline ran.
    Moving,
}

/// Result of one shaping step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeOutput {
    pub displacement: Displacement,
    pub stage: ShapeStage,
}

/// Stateful shaping pipeline for one controller.
#[derive(Debug, Clone)]
pub struct MotionShaper {
    config: ShaperConfig,
    velocity: AxisPair,
    last_raw: Option<AxisPair>,
    still_since: Option<TimestampNs>,
}

impl MotionShaper {
    pub fn new(config: ShaperConfig) -> MyopointResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            velocity: AxisPair::ZERO,
            last_raw: None,
            still_since: None,
        })
    }

    /// Run one update.
    ///
    /// `raw` is the current reading on the controlled axes (used for the
    /// stillness delta), `deviation` the same reading minus the baseline.
    pub fn shape(&mut self, raw: AxisPair, deviation: AxisPair, now: TimestampNs) -> ShapeOutput {
        let cfg = &self.config;

        let still = self.last_raw.is_some_and(|prev| {
            (raw.x - prev.x).abs() < cfg.still_eps && (raw.y - prev.y).abs() < cfg.still_eps
        });
        self.last_raw = Some(raw);

        if still {
            let since = *self.still_since.get_or_insert(now);
            if elapsed_secs(since, now) >= cfg.still_timeout_secs {
                self.brake(self.config.still_decay);
                return idle(ShapeStage::Still);
            }
        } else {
            self.still_since = None;
        }

        if deviation.x.abs() < cfg.center_eps && deviation.y.abs() < cfg.center_eps {
            self.brake(self.config.center_decay);
            return idle(ShapeStage::Centered);
        }

        let in_deadzone_x = deviation.x.abs() < cfg.deadzone;
        let in_deadzone_y = deviation.y.abs() < cfg.deadzone;
        let gated = AxisPair::new(
            if in_deadzone_x { 0.0 } else { deviation.x },
            if in_deadzone_y { 0.0 } else { deviation.y },
        );

        let curved = AxisPair::new(
            cfg.curve.apply(gated.x, cfg.deadzone),
            cfg.curve.apply(gated.y, cfg.deadzone),
        );

        let a = cfg.smooth_alpha;
        self.velocity.x = ((1.0 - a) * self.velocity.x + a * curved.x) * cfg.damping;
        self.velocity.y = ((1.0 - a) * self.velocity.y + a * curved.y) * cfg.damping;
        // Extreme readings can overflow the curve or the average. Restart
        // from rest rather than carry inf or NaN into later updates.
        for v in [&mut self.velocity.x, &mut self.velocity.y] {
            if !v.is_finite() {
                *v = 0.0;
            }
        }

        let mut out = self.velocity;
        if in_deadzone_x {
            out.x = 0.0;
        }
        if in_deadzone_y {
            out.y = 0.0;
        }
        if let Some(ratio) = cfg.dominance_ratio {
            if out.x.abs() > ratio * out.y.abs() {
                out.y = 0.0;
            } else if out.y.abs() > ratio * out.x.abs() {
                out.x = 0.0;
            }
        }

        ShapeOutput {
            displacement: self.map_to_screen(out),
            stage: ShapeStage::Moving,
        }
    }

    /// Zero velocity immediately. Used when motion is gated off.
    pub fn halt(&mut self) {
        self.velocity = AxisPair::ZERO;
    }

    /// Remember the latest raw reading without running the pipeline.
    pub fn observe(&mut self, raw: AxisPair) {
        self.last_raw = Some(raw);
    }

    pub fn velocity(&self) -> AxisPair {
        self.velocity
    }

    /// Raw reading seen on the previous update, if any.
    pub fn last_raw(&self) -> Option<AxisPair> {
        self.last_raw
    }

    /// Velocity has fully stopped on both axes.
    pub fn is_settled(&self) -> bool {
        self.velocity.is_zero()
    }

    pub fn config(&self) -> &ShaperConfig {
        &self.config
    }

    fn brake(&mut self, factor: f64) {
        let floor = self.config.velocity_floor;
        for v in [&mut self.velocity.x, &mut self.velocity.y] {
            *v *= factor;
            if !v.is_finite() || v.abs() < floor {
                *v = 0.0;
            }
        }
    }

    fn map_to_screen(&self, v: AxisPair) -> Displacement {
        let cfg = &self.config;
        let (mut sx, mut sy) = if cfg.swap_axes { (v.y, v.x) } else { (v.x, v.y) };
        if cfg.invert_x {
            sx = -sx;
        }
        if cfg.invert_y {
            sy = -sy;
        }
        Displacement::new(
            clamp_step(sx * cfg.sensitivity_x, cfg.max_step_px),
            clamp_step(sy * cfg.sensitivity_y, cfg.max_step_px),
        )
    }
}

fn idle(stage: ShapeStage) -> ShapeOutput {
    ShapeOutput {
        displacement: Displacement::ZERO,
        stage,
    }
}

fn clamp_step(value: f64, max_step: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        // `+ 0.0` folds -0.0 into 0.0 so zero steps compare equal.
        value.clamp(-max_step, max_step) + 0.0
    }
}
