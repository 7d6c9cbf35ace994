//! Telemetry snapshot buffer.
//!
//! The engine pushes every validated reading here. A display consumer holds
//! a clone of the [`TelemetryBuffer`] and reads copies through
//! [`TelemetryBuffer::snapshot`]; it never sees controller state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use myopoint_common::clock::TimestampNs;
use myopoint_sensor_model::sample::Vec3;

pub const DEFAULT_TELEMETRY_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
struct Channels {
    accel: VecDeque<(TimestampNs, Vec3)>,
    gyro: VecDeque<(TimestampNs, Vec3)>,
    envelope: VecDeque<(TimestampNs, f64)>,
    signal_peak: VecDeque<(TimestampNs, f64)>,
}

/// Copy of the buffered readings, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub accel: Vec<(TimestampNs, Vec3)>,
    pub gyro: Vec<(TimestampNs, Vec3)>,
    /// Envelope amplitude in µV.
    pub envelope: Vec<(TimestampNs, f64)>,
    /// Signal peak in µV.
    pub signal_peak: Vec<(TimestampNs, f64)>,
}

impl TelemetrySnapshot {
    pub fn is_empty(&self) -> bool {
        self.accel.is_empty()
            && self.gyro.is_empty()
            && self.envelope.is_empty()
            && self.signal_peak.is_empty()
    }
}

/// Bounded, mutex-guarded ring of recent readings per channel.
#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    capacity: usize,
    inner: Arc<Mutex<Channels>>,
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TELEMETRY_CAPACITY)
    }
}

impl TelemetryBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Arc::new(Mutex::new(Channels::default())),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record_inertial(&self, t: TimestampNs, accel: Vec3, gyro: Vec3) {
        let cap = self.capacity;
        let mut channels = self.lock();
        push_bounded(&mut channels.accel, (t, accel), cap);
        push_bounded(&mut channels.gyro, (t, gyro), cap);
    }

    pub fn record_envelope(&self, t: TimestampNs, microvolts: f64) {
        let cap = self.capacity;
        push_bounded(&mut self.lock().envelope, (t, microvolts), cap);
    }

    pub fn record_signal_peak(&self, t: TimestampNs, microvolts: f64) {
        let cap = self.capacity;
        push_bounded(&mut self.lock().signal_peak, (t, microvolts), cap);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let channels = self.lock();
        TelemetrySnapshot {
            accel: channels.accel.iter().copied().collect(),
            gyro: channels.gyro.iter().copied().collect(),
            envelope: channels.envelope.iter().copied().collect(),
            signal_peak: channels.signal_peak.iter().copied().collect(),
        }
    }

    pub fn clear(&self) {
        *self.lock() = Channels::default();
    }

    // A panicking reader must not take telemetry down with it.
    fn lock(&self) -> MutexGuard<'_, Channels> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, capacity: usize) {
    while queue.len() >= capacity {
        queue.pop_front();
    }
    queue.push_back(value);
}
