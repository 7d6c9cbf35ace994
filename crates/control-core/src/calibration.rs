//! Neutral-pose calibration.
//!
//! The first `N` accepted readings are averaged into a per-axis baseline.
//! Until that happens the controller emits nothing. Afterwards the baseline
//! only moves through [`Calibrator::recenter`], a slow exponential pull that
//! compensates sensor drift while the hand rests near neutral.

use myopoint_common::error::{MyopointError, MyopointResult};
use myopoint_sensor_model::sample::Vec3;

/// Outcome of feeding one reading to the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Still collecting; `accepted` of `required` readings so far.
    Warming { accepted: usize, required: usize },
    /// This reading completed warm-up. Reported exactly once.
    JustLocked,
    /// Baseline already established; the reading was not accumulated.
    Locked,
    /// The reading would overflow the running sum and was not counted.
    Rejected { accepted: usize, required: usize },
}

/// Per-axis running mean that locks after a fixed number of readings.
#[derive(Debug, Clone)]
pub struct Calibrator {
    required: usize,
    sum: [f64; 3],
    count: usize,
    baseline: Option<Vec3>,
}

impl Calibrator {
    /// Create a calibrator that locks after `required` readings.
    pub fn new(required: usize) -> MyopointResult<Self> {
        if required == 0 {
            return Err(MyopointError::calibration(
                "neutral sample count must be at least 1",
            ));
        }
        Ok(Self {
            required,
            sum: [0.0; 3],
            count: 0,
            baseline: None,
        })
    }

    /// Feed one validated reading.
    pub fn accumulate(&mut self, reading: Vec3) -> CalibrationStatus {
        if self.baseline.is_some() {
            return CalibrationStatus::Locked;
        }

        if !self.accepts(reading) {
            return CalibrationStatus::Rejected {
                accepted: self.count,
                required: self.required,
            };
        }
        for (acc, value) in self.sum.iter_mut().zip(reading.as_array()) {
            *acc += value;
        }
        self.count += 1;

        if self.count < self.required {
            return CalibrationStatus::Warming {
                accepted: self.count,
                required: self.required,
            };
        }

        let n = self.count as f64;
        self.baseline = Some(Vec3::from_array(self.sum.map(|s| s / n)));
        CalibrationStatus::JustLocked
    }

    /// Whether `reading` can join the warm-up mean without overflowing it.
    pub fn accepts(&self, reading: Vec3) -> bool {
        self.baseline.is_some()
            || self
                .sum
                .iter()
                .zip(reading.as_array())
                .all(|(acc, value)| (acc + value).is_finite())
    }

    /// Pull the baseline toward `reading` by `rate` (0..=1).
    ///
    /// No-op before lock.
    pub fn recenter(&mut self, reading: Vec3, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        if let Some(baseline) = self.baseline.as_mut() {
            baseline.x = (1.0 - rate) * baseline.x + rate * reading.x;
            baseline.y = (1.0 - rate) * baseline.y + rate * reading.y;
            baseline.z = (1.0 - rate) * baseline.z + rate * reading.z;
        }
    }

    /// Reading minus baseline, once locked.
    pub fn deviation(&self, reading: Vec3) -> Option<Vec3> {
        self.baseline.map(|b| {
            Vec3::new(reading.x - b.x, reading.y - b.y, reading.z - b.z)
        })
    }

    pub fn baseline(&self) -> Option<Vec3> {
        self.baseline
    }

    pub fn is_locked(&self) -> bool {
        self.baseline.is_some()
    }

    /// Readings accumulated so far (stops growing at lock).
    pub fn accepted(&self) -> usize {
        self.count
    }

    pub fn required(&self) -> usize {
        self.required
    }
}
