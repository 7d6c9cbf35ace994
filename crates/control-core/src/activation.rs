//! EMG activation gate.
//!
//! Tracks a smoothed envelope amplitude and an "active" flag that can hold
//! pointer motion until the user tenses the forearm. Gating is off unless
//! explicitly enabled; the smoothed value is maintained either way so a
//! display can show it.

use serde::{Deserialize, Serialize};

use myopoint_common::error::{MyopointError, MyopointResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationConfig {
    /// EMA weight of the newest envelope value, in (0, 1].
    pub alpha: f64,

    /// Smoothed amplitude (µV) at or above which the muscle counts as active.
    pub threshold_uv: f64,

    /// When false, [`ActivationGate::allows_motion`] always returns true.
    #[serde(default)]
    pub enabled: bool,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            threshold_uv: 5.0,
            enabled: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivationGate {
    config: ActivationConfig,
    smoothed: f64,
    active: bool,
}

impl ActivationGate {
    pub fn new(config: ActivationConfig) -> MyopointResult<Self> {
        if !(config.alpha > 0.0 && config.alpha <= 1.0) {
            return Err(MyopointError::config(format!(
                "activation alpha must be in (0, 1], got {}",
                config.alpha
            )));
        }
        if !config.threshold_uv.is_finite() || config.threshold_uv < 0.0 {
            return Err(MyopointError::config(format!(
                "activation threshold must be finite and non-negative, got {}",
                config.threshold_uv
            )));
        }
        Ok(Self {
            config,
            smoothed: 0.0,
            active: false,
        })
    }

    /// Fold one envelope amplitude (µV) into the smoothed value.
    pub fn update(&mut self, microvolts: f64) -> bool {
        if !microvolts.is_finite() {
            return self.active;
        }
        let a = self.config.alpha;
        self.smoothed = (1.0 - a) * self.smoothed + a * microvolts.abs();
        self.active = self.smoothed >= self.config.threshold_uv;
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn smoothed(&self) -> f64 {
        self.smoothed
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn allows_motion(&self) -> bool {
        !self.config.enabled || self.active
    }
}
