use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use crate::{error::CounterError, point::FieldValue, MetricKey};

pub type Snapshot = HashMap<MetricKey, FieldValue>;

/// Counter map shared between caller threads and the flush loop.
///
/// All mutation goes through one mutex: `increment` and `drain_and_reset`.
#[derive(Debug, Default)]
pub struct StatAggregator {
    counters: Mutex<Snapshot>,
}
impl StatAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the counter, creating it on first use.
    ///
    /// The numeric kind of a counter is fixed by its first delta; a delta of the
    /// other kind is rejected and leaves the stored value untouched.
    pub fn increment(&self, key: &str, delta: impl Into<FieldValue>) -> Result<(), CounterError> {
        let delta = delta.into();
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(value) = counters.get_mut(key) else {
            counters.insert(key.to_string(), delta);
            return Ok(());
        };
        match (value, delta) {
            (FieldValue::Int(v), FieldValue::Int(d)) => *v = v.wrapping_add(d),
            (FieldValue::Float(v), FieldValue::Float(d)) => *v += d,
            (value, delta) => {
                return Err(CounterError::KindMismatch {
                    key: key.to_string(),
                    stored: value.kind(),
                    given: delta.kind(),
                })
            }
        }
        Ok(())
    }

    /// Swaps the counter map for an empty one and returns the old contents.
    pub fn drain_and_reset(&self) -> Snapshot {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        core::mem::take(&mut *counters)
    }

    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
