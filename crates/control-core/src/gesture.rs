//! Muscle-click gesture classifier.
//!
//! Maps EMG peak amplitudes (µV) to discrete pointer gestures. In duration
//! mode the strongest contraction toggles a left-button drag, a medium one
//! right-clicks and a light one left-clicks. Impulse mode only knows right
//! and left clicks. Every emitted gesture starts a shared cooldown.

use std::collections::VecDeque;

use tracing::{debug, info};

use myopoint_common::clock::{secs_to_ns, TimestampNs};
use myopoint_common::error::MyopointResult;
use myopoint_sensor_model::action::GestureEvent;
use myopoint_sensor_model::thresholds::{ClickMode, ThresholdConfig};

/// Capacity of the recent-amplitude history.
pub const AMPLITUDE_HISTORY: usize = 10;

#[derive(Debug, Clone, Default)]
struct GestureState {
    last_action_ns: Option<TimestampNs>,
    last_right_peak_ns: Option<TimestampNs>,
    dragging: bool,
    history: VecDeque<f64>,
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    thresholds: ThresholdConfig,
    cooldown_ns: u64,
    state: GestureState,
}

impl GestureClassifier {
    pub fn new(thresholds: ThresholdConfig) -> MyopointResult<Self> {
        thresholds.validate()?;
        Ok(Self {
            cooldown_ns: secs_to_ns(thresholds.cooldown_secs),
            thresholds,
            state: GestureState {
                history: VecDeque::with_capacity(AMPLITUDE_HISTORY),
                ..GestureState::default()
            },
        })
    }

    /// Classify one peak amplitude observed at `now`.
    pub fn classify(&mut self, microvolts: f64, now: TimestampNs) -> Option<GestureEvent> {
        if !microvolts.is_finite() {
            return None;
        }

        if self.state.history.len() == AMPLITUDE_HISTORY {
            self.state.history.pop_front();
        }
        self.state.history.push_back(microvolts);

        let t = &self.thresholds;
        let event = match t.mode {
            ClickMode::Duration => {
                if microvolts >= t.hold_threshold {
                    self.fire(now, |state| {
                        state.dragging = !state.dragging;
                        if state.dragging {
                            GestureEvent::DragStart
                        } else {
                            GestureEvent::DragEnd
                        }
                    })
                } else if microvolts >= t.right_threshold {
                    self.fire(now, |_| GestureEvent::RightClick)
                } else if microvolts >= t.left_threshold {
                    self.fire(now, |_| GestureEvent::LeftClick)
                } else {
                    None
                }
            }
            ClickMode::Impulse => {
                if microvolts >= t.right_threshold {
                    self.state.last_right_peak_ns = Some(now);
                    self.fire(now, |_| GestureEvent::RightClick)
                } else if microvolts >= t.left_threshold {
                    self.fire(now, |_| GestureEvent::LeftClick)
                } else {
                    None
                }
            }
        };

        if let Some(event) = event {
            info!(
                target: "myopoint::gesture",
                gesture = %event,
                amplitude_uv = microvolts,
                t = now,
                "Gesture"
            );
        }
        event
    }

    /// Replace thresholds. Drag state, cooldown and history are kept.
    pub fn reconfigure(&mut self, thresholds: ThresholdConfig) -> MyopointResult<()> {
        thresholds.validate()?;
        debug!(
            target: "myopoint::gesture",
            left = thresholds.left_threshold,
            right = thresholds.right_threshold,
            hold = thresholds.hold_threshold,
            "Thresholds reconfigured"
        );
        self.cooldown_ns = secs_to_ns(thresholds.cooldown_secs);
        self.thresholds = thresholds;
        Ok(())
    }

    /// Most recent amplitudes, oldest first. Not used for classification.
    pub fn recent_amplitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.state.history.iter().copied()
    }

    pub fn is_dragging(&self) -> bool {
        self.state.dragging
    }

    /// Time of the last right-level peak seen in impulse mode.
    pub fn last_right_peak(&self) -> Option<TimestampNs> {
        self.state.last_right_peak_ns
    }

    pub fn last_action(&self) -> Option<TimestampNs> {
        self.state.last_action_ns
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Emit `make(..)` unless the cooldown is still running.
    fn fire(
        &mut self,
        now: TimestampNs,
        make: impl FnOnce(&mut GestureState) -> GestureEvent,
    ) -> Option<GestureEvent> {
        if let Some(last) = self.state.last_action_ns {
            if now.saturating_sub(last) < self.cooldown_ns {
                return None;
            }
        }
        self.state.last_action_ns = Some(now);
        Some(make(&mut self.state))
    }
}
