//! Generic characteristic value cell.
//!
//! Provides thread-safe shared state for a single exposed value that can be
//! read by the host bridge and updated from the pull and push paths.
//!
//! Host code can `subscribe()` to get notified of every change instead of
//! polling `value()`.

use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::watch;

/// Thread-safe characteristic value.
///
/// This is the single source of truth for the exposed value. Writes are
/// last-writer-wins, there is no coordination between writers.
///
/// The version is incremented each time the value changes via
/// `update_value()`.
pub struct Characteristic {
    name: &'static str,
    value: watch::Sender<Value>,
    version: AtomicU32,
}

impl Characteristic {
    /// Create a new characteristic with the given initial value.
    pub fn new(name: &'static str, initial: Value) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            name,
            value,
            version: AtomicU32::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the current value.
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Overwrite the value. Increments version and notifies subscribers if it
    /// changed.
    pub fn update_value(&self, value: impl Into<Value>) {
        let value = value.into();
        let changed = self.value.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Number of value changes since creation.
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    /// Receiver that is marked changed on every value change.
    pub fn subscribe(&self) -> watch::Receiver<Value> {
        self.value.subscribe()
    }
}
