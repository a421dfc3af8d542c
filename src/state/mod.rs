//! State acquisition building blocks.
//!
//! - [`FreshnessCache`] decides whether the sensor has to be queried again.
//! - [`PatternExtractor`] pulls the status token out of a response body.
//! - [`PullTimer`] periodically refreshes the state.

pub mod cache;
pub mod extractor;
pub mod pull_timer;

pub use cache::{CacheTtl, FreshnessCache};
pub use extractor::PatternExtractor;
pub use pull_timer::PullTimer;

use serde_json::Value;
use std::fmt;

/// Token reported by the sensor when the contact is open.
pub const OPENED_TOKEN: &str = "opened";
/// Token reported by the sensor when the contact is closed.
pub const CLOSED_TOKEN: &str = "closed";

/// Open/closed state of the contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Open,
    Closed,
}

impl SensorState {
    /// Map an extracted token to a state. Only the literal tokens are recognized.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            OPENED_TOKEN => Some(SensorState::Open),
            CLOSED_TOKEN => Some(SensorState::Closed),
            _ => None,
        }
    }

    /// Interpret a characteristic value.
    ///
    /// Pushed values are stored unvalidated, so this accepts booleans as well
    /// as `1`/`0` numbers and strings.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(open) => Some(Self::from(*open)),
            Value::Number(n) => match n.as_u64() {
                Some(1) => Some(SensorState::Open),
                Some(0) => Some(SensorState::Closed),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "1" => Some(SensorState::Open),
                "0" => Some(SensorState::Closed),
                other => Self::from_token(other),
            },
            _ => None,
        }
    }

    pub fn is_open(self) -> bool {
        self == SensorState::Open
    }
}

impl From<bool> for SensorState {
    fn from(open: bool) -> Self {
        if open {
            SensorState::Open
        } else {
            SensorState::Closed
        }
    }
}

impl From<SensorState> for bool {
    fn from(state: SensorState) -> Self {
        state.is_open()
    }
}

impl From<SensorState> for Value {
    fn from(state: SensorState) -> Self {
        Value::Bool(state.is_open())
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorState::Open => f.write_str(OPENED_TOKEN),
            SensorState::Closed => f.write_str(CLOSED_TOKEN),
        }
    }
}

/// Outcome of a successful `get_state` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// Cache still fresh, the currently exposed value was returned without I/O.
    Cached(Value),
    /// The sensor was queried and the new state written to the characteristic.
    Fetched(SensorState),
    /// The sensor answered with a token that is neither opened nor closed.
    NoChange,
}

impl Reading {
    /// The value a host should report for this reading, if any.
    pub fn value(&self) -> Option<Value> {
        match self {
            Reading::Cached(value) => Some(value.clone()),
            Reading::Fetched(state) => Some((*state).into()),
            Reading::NoChange => None,
        }
    }
}
