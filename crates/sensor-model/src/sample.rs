//! Sensor samples and the ingress step that validates them.
//!
//! The wearable delivers three kinds of batches: inertial (MEMS) packets,
//! EMG envelope values and raw EMG signal packs. A [`RawSample`] is one such
//! batch exactly as it arrived; [`ingest`] turns it into a validated
//! [`Sample`] or rejects it. Rejected batches never reach calibration,
//! shaping or classification.
//!
//! Recorded streams use JSONL, one batch per line, with an optional header
//! line prefixed by `#`.

use serde::{Deserialize, Serialize};

pub use myopoint_common::clock::TimestampNs;

/// EMG amplitudes arrive in volts and are handled in microvolts.
pub const MICROVOLTS_PER_VOLT: f64 = 1e6;

/// A three-axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One axis of a [`Vec3`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Which inertial channel feeds a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Accelerometer, in g.
    Accel,
    /// Gyroscope, in deg/s.
    Gyro,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// Euclidean distance to another reading.
    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One MEMS packet inside an inertial batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMemsPacket {
    /// Acceleration in g.
    #[serde(default)]
    pub accel: Option<Vec3>,
    /// Angular rate in deg/s.
    #[serde(default)]
    pub gyro: Option<Vec3>,
}

/// A batch as delivered by the sensor driver, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Producer-side monotonic timestamp.
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    #[serde(flatten)]
    pub payload: RawPayload,
}

/// Discriminated union of delivered batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawPayload {
    /// Inertial packets; the last one is authoritative.
    Mems { packets: Vec<RawMemsPacket> },

    /// EMG envelope values in volts; the last one is authoritative.
    Envelope { samples: Vec<f64> },

    /// Raw EMG packs in volts; the peak absolute value across all packs counts.
    Signal { packs: Vec<Vec<f64>> },
}

impl RawSample {
    /// Single-packet inertial batch.
    pub fn mems(timestamp_ns: TimestampNs, accel: Vec3, gyro: Vec3) -> Self {
        Self {
            timestamp_ns,
            payload: RawPayload::Mems {
                packets: vec![RawMemsPacket {
                    accel: Some(accel),
                    gyro: Some(gyro),
                }],
            },
        }
    }

    /// Single-value envelope batch (volts).
    pub fn envelope(timestamp_ns: TimestampNs, volts: f64) -> Self {
        Self {
            timestamp_ns,
            payload: RawPayload::Envelope {
                samples: vec![volts],
            },
        }
    }

    /// Single-pack signal batch (volts).
    pub fn signal(timestamp_ns: TimestampNs, volts: Vec<f64>) -> Self {
        Self {
            timestamp_ns,
            payload: RawPayload::Signal { packs: vec![volts] },
        }
    }

    /// Short label for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.payload {
            RawPayload::Mems { .. } => "mems",
            RawPayload::Envelope { .. } => "envelope",
            RawPayload::Signal { .. } => "signal",
        }
    }
}

/// A validated inertial reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialSample {
    pub timestamp_ns: TimestampNs,
    /// Acceleration in g.
    pub accel: Vec3,
    /// Angular rate in deg/s.
    pub gyro: Vec3,
}

impl InertialSample {
    pub fn new(timestamp_ns: TimestampNs, accel: Vec3, gyro: Vec3) -> Self {
        Self {
            timestamp_ns,
            accel,
            gyro,
        }
    }

    pub fn channel(&self, channel: Channel) -> Vec3 {
        match channel {
            Channel::Accel => self.accel,
            Channel::Gyro => self.gyro,
        }
    }
}

/// A validated EMG amplitude in microvolts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmgAmplitude {
    pub timestamp_ns: TimestampNs,
    pub microvolts: f64,
}

/// A validated sample ready for the control pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Inertial(InertialSample),
    /// Smoothed envelope; feeds the activation gate.
    Envelope(EmgAmplitude),
    /// Raw signal peak; feeds the gesture classifier.
    Signal(EmgAmplitude),
}

impl Sample {
    pub fn timestamp_ns(&self) -> TimestampNs {
        match self {
            Sample::Inertial(s) => s.timestamp_ns,
            Sample::Envelope(a) | Sample::Signal(a) => a.timestamp_ns,
        }
    }
}

/// Why a batch was rejected at ingress.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngressError {
    #[error("empty {0} batch")]
    EmptyBatch(&'static str),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Validate and normalize one delivered batch.
pub fn ingest(raw: &RawSample) -> Result<Sample, IngressError> {
    let t = raw.timestamp_ns;
    match &raw.payload {
        RawPayload::Mems { packets } => {
            let last = packets.last().ok_or(IngressError::EmptyBatch("mems"))?;
            let accel = last.accel.ok_or(IngressError::MissingField("accel"))?;
            let gyro = last.gyro.ok_or(IngressError::MissingField("gyro"))?;
            if !accel.is_finite() {
                return Err(IngressError::NonFinite("accel"));
            }
            if !gyro.is_finite() {
                return Err(IngressError::NonFinite("gyro"));
            }
            Ok(Sample::Inertial(InertialSample::new(t, accel, gyro)))
        }
        RawPayload::Envelope { samples } => {
            let last = *samples
                .last()
                .ok_or(IngressError::EmptyBatch("envelope"))?;
            if !last.is_finite() {
                return Err(IngressError::NonFinite("envelope"));
            }
            Ok(Sample::Envelope(EmgAmplitude {
                timestamp_ns: t,
                microvolts: last.abs() * MICROVOLTS_PER_VOLT,
            }))
        }
        RawPayload::Signal { packs } => {
            let mut peak: Option<f64> = None;
            for value in packs.iter().flatten() {
                if !value.is_finite() {
                    return Err(IngressError::NonFinite("signal"));
                }
                let magnitude = value.abs();
                peak = Some(peak.map_or(magnitude, |p| p.max(magnitude)));
            }
            let peak = peak.ok_or(IngressError::EmptyBatch("signal"))?;
            Ok(Sample::Signal(EmgAmplitude {
                timestamp_ns: t,
                microvolts: peak * MICROVOLTS_PER_VOLT,
            }))
        }
    }
}

/// Metadata written as the `#` header line of a recorded stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Device or generator that produced the stream.
    pub source: String,

    /// Wall-clock time at stream start (RFC 3339).
    pub started_at: String,

    /// Nominal inertial packet rate (Hz).
    pub mems_rate_hz: u32,
}

/// Parse a recorded stream strictly; any bad line fails the whole parse.
pub fn parse_samples(jsonl: &str) -> Result<Vec<RawSample>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Parse a recorded stream, skipping lines that do not parse.
///
/// Returns the parsed batches and the number of skipped lines.
pub fn parse_samples_lossy(jsonl: &str) -> (Vec<RawSample>, usize) {
    let mut samples = Vec::new();
    let mut skipped = 0;
    for (index, line) in jsonl.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<RawSample>(line) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                skipped += 1;
                tracing::debug!(line = index + 1, error = %e, "Skipping malformed sample line");
            }
        }
    }
    (samples, skipped)
}

/// Parse the `#` header line of a recorded stream, if present.
pub fn parse_header(jsonl: &str) -> Option<SampleStreamHeader> {
    let first = jsonl.lines().map(str::trim).find(|l| !l.is_empty())?;
    let body = first.strip_prefix('#')?.trim();
    serde_json::from_str(body).ok()
}

/// Serialize batches to JSONL format.
pub fn serialize_samples(samples: &[RawSample]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for sample in samples {
        output.push_str(&serde_json::to_string(sample)?);
        output.push('\n');
    }
    Ok(output)
}
