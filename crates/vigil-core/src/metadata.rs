//! Event metadata — a string-keyed bag with typed accessors.
//!
//! The set of keys the engine interprets is closed and documented here;
//! unknown keys are carried through untouched so upstream callers can
//! attach their own context without it being silently dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recognized key: consecutive failed login attempts (auth events).
pub const KEY_FAILED_ATTEMPTS: &str = "failedAttempts";
/// Recognized key: login from a device not seen before (auth events).
pub const KEY_NEW_DEVICE: &str = "newDevice";
/// Recognized key: login from a location not seen before (auth events).
pub const KEY_NEW_LOCATION: &str = "newLocation";
/// Recognized key: the operation touched many records at once.
pub const KEY_BULK_OPERATION: &str = "bulkOperation";
/// Recognized key: number of records touched (data-access events).
pub const KEY_RECORD_COUNT: &str = "recordCount";
/// Recognized key: export payload size in bytes (data-access events).
pub const KEY_EXPORT_SIZE: &str = "exportSize";

/// Ordered key-value metadata attached to audit and security events.
///
/// `BTreeMap` keeps serialization deterministic, which the scoring
/// determinism tests rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert for call sites assembling metadata inline.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn u64_of(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    fn bool_of(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Failed login attempts, 0 when absent or malformed.
    pub fn failed_attempts(&self) -> u64 {
        self.u64_of(KEY_FAILED_ATTEMPTS).unwrap_or(0)
    }

    pub fn new_device(&self) -> bool {
        self.bool_of(KEY_NEW_DEVICE)
    }

    pub fn new_location(&self) -> bool {
        self.bool_of(KEY_NEW_LOCATION)
    }

    pub fn bulk_operation(&self) -> bool {
        self.bool_of(KEY_BULK_OPERATION)
    }

    pub fn record_count(&self) -> Option<u64> {
        self.u64_of(KEY_RECORD_COUNT)
    }

    pub fn export_size(&self) -> Option<u64> {
        self.u64_of(KEY_EXPORT_SIZE)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for Metadata {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Metadata> for Value {
    fn from(meta: Metadata) -> Self {
        meta.into_value()
    }
}

impl TryFrom<Value> for Metadata {
    type Error = crate::error::VigilError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            Value::Null => Ok(Self::default()),
            other => Err(crate::error::VigilError::Internal(format!(
                "metadata must be an object, got: {other}"
            ))),
        }
    }
}
