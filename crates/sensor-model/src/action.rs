//! Pointer intents produced by the control pipeline.
//!
//! Intents are what the pointer-injection collaborator consumes: relative
//! moves, clicks and button transitions for drag. They can be recorded as
//! JSONL for replay diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sample::TimestampNs;

/// Relative pointer displacement in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
}

impl Displacement {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Discrete action decoded from muscle activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureEvent {
    LeftClick,
    RightClick,
    DragStart,
    DragEnd,
}

impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GestureEvent::LeftClick => "left click",
            GestureEvent::RightClick => "right click",
            GestureEvent::DragStart => "drag start",
            GestureEvent::DragEnd => "drag end",
        };
        f.write_str(name)
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
}

/// Button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    Down,
    Up,
}

/// A single intent handed to the pointer-injection collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerIntent {
    /// Timestamp of the sample that produced the intent.
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    #[serde(flatten)]
    pub kind: IntentKind,
}

/// Discriminated union of intents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentKind {
    /// Relative move.
    Move { dx: f64, dy: f64 },

    /// Full press-and-release click.
    Click { button: MouseButton },

    /// Single transition, used for drag.
    Button {
        button: MouseButton,
        state: ButtonState,
    },
}

impl PointerIntent {
    /// Create a relative move intent.
    pub fn movement(timestamp_ns: TimestampNs, displacement: Displacement) -> Self {
        Self {
            timestamp_ns,
            kind: IntentKind::Move {
                dx: displacement.dx,
                dy: displacement.dy,
            },
        }
    }

    /// Map a decoded gesture onto the primitive it triggers.
    pub fn from_gesture(timestamp_ns: TimestampNs, gesture: GestureEvent) -> Self {
        let kind = match gesture {
            GestureEvent::LeftClick => IntentKind::Click {
                button: MouseButton::Left,
            },
            GestureEvent::RightClick => IntentKind::Click {
                button: MouseButton::Right,
            },
            GestureEvent::DragStart => IntentKind::Button {
                button: MouseButton::Left,
                state: ButtonState::Down,
            },
            GestureEvent::DragEnd => IntentKind::Button {
                button: MouseButton::Left,
                state: ButtonState::Up,
            },
        };
        Self { timestamp_ns, kind }
    }

    /// Extract the displacement if this is a move.
    pub fn displacement(&self) -> Option<Displacement> {
        match self.kind {
            IntentKind::Move { dx, dy } => Some(Displacement::new(dx, dy)),
            _ => None,
        }
    }

    /// Whether this intent is a discrete action rather than a move.
    pub fn is_action(&self) -> bool {
        !matches!(self.kind, IntentKind::Move { .. })
    }
}

/// Parse intents from JSONL content (one JSON object per line).
pub fn parse_intents(jsonl: &str) -> Result<Vec<PointerIntent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize intents to JSONL format.
pub fn serialize_intents(intents: &[PointerIntent]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for intent in intents {
        output.push_str(&serde_json::to_string(intent)?);
        output.push('\n');
    }
    Ok(output)
}
