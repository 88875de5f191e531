//! Ordered string-keyed property map carried as the payload of every frame.

use crate::error::{CoreError, CoreResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Well-known property names.
pub mod names {
    pub const ACTIVITY_ID: &str = "ActivityId";
    pub const ACTIVITY_TASK: &str = "ActivityTask";
    pub const ACTIVITY_TYPE: &str = "ActivityType";
    pub const ARGS: &str = "Args";
    pub const CHILD_ID: &str = "ChildId";
    pub const CLIENT_TIMEOUT: &str = "ClientTimeout";
    pub const CONTEXT_ID: &str = "ContextId";
    pub const CREATE_DOMAIN: &str = "CreateDomain";
    pub const DETAILS: &str = "Details";
    pub const DOMAIN: &str = "Domain";
    pub const DURATION: &str = "Duration";
    pub const ENDPOINTS: &str = "Endpoints";
    pub const ERROR: &str = "Error";
    pub const EXECUTION: &str = "Execution";
    pub const IDENTITY: &str = "Identity";
    pub const LIBRARY_VERSION: &str = "LibraryVersion";
    pub const NAME: &str = "Name";
    pub const OPTIONS: &str = "Options";
    pub const PENDING: &str = "Pending";
    pub const QUERY_NAME: &str = "QueryName";
    pub const REASON: &str = "Reason";
    pub const RESULT: &str = "Result";
    pub const RUN_ID: &str = "RunId";
    pub const SIGNAL_NAME: &str = "SignalName";
    pub const SYNCHRONOUS: &str = "Synchronous";
    pub const TARGET_REQUEST_ID: &str = "TargetRequestId";
    pub const TASK_LIST: &str = "TaskList";
    pub const TASK_TOKEN: &str = "TaskToken";
    pub const WORKER_ID: &str = "WorkerId";
    pub const WORKFLOW_ID: &str = "WorkflowId";
    pub const WORKFLOW_TYPE: &str = "WorkflowType";
}

/// Insertion-ordered property map. Values may be null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, Option<String>)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Set a raw value, replacing an existing entry in place.
    pub fn set(&mut self, name: &str, value: Option<String>) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        self.entries.remove(index).1
    }

    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, Some(value.into()));
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    /// Get a string that must be present.
    pub fn require_string(&self, name: &str) -> CoreResult<String> {
        self.get_string(name)
            .ok_or_else(|| CoreError::property(name, "missing"))
    }

    pub fn set_i64(&mut self, name: &str, value: i64) {
        self.set(name, Some(value.to_string()));
    }

    pub fn get_i64(&self, name: &str) -> CoreResult<Option<i64>> {
        self.get(name)
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|e| CoreError::property(name, e.to_string()))
            })
            .transpose()
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set(name, Some(if value { "true" } else { "false" }.to_string()));
    }

    /// Missing booleans read as false.
    pub fn get_bool(&self, name: &str) -> CoreResult<bool> {
        match self.get(name) {
            None => Ok(false),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(CoreError::property(name, format!("not a boolean: {other}"))),
        }
    }

    pub fn set_f64(&mut self, name: &str, value: f64) {
        self.set(name, Some(value.to_string()));
    }

    pub fn get_f64(&self, name: &str) -> CoreResult<Option<f64>> {
        self.get(name)
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|e| CoreError::property(name, e.to_string()))
            })
            .transpose()
    }

    /// Durations travel as integer nanoseconds.
    pub fn set_duration(&mut self, name: &str, value: Duration) {
        let nanos = i64::try_from(value.as_nanos()).unwrap_or(i64::MAX);
        self.set_i64(name, nanos);
    }

    pub fn get_duration(&self, name: &str) -> CoreResult<Option<Duration>> {
        match self.get_i64(name)? {
            None => Ok(None),
            Some(nanos) if nanos < 0 => Err(CoreError::property(name, "negative duration")),
            Some(nanos) => Ok(Some(Duration::from_nanos(nanos as u64))),
        }
    }

    /// Byte arrays travel base64 encoded.
    pub fn set_bytes(&mut self, name: &str, value: Option<&[u8]>) {
        self.set(name, value.map(|bytes| BASE64.encode(bytes)));
    }

    pub fn get_bytes(&self, name: &str) -> CoreResult<Option<Vec<u8>>> {
        self.get(name)
            .map(|raw| {
                BASE64
                    .decode(raw)
                    .map_err(|e| CoreError::property(name, e.to_string()))
            })
            .transpose()
    }

    pub fn set_json<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> CoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(name, Some(raw));
        Ok(())
    }

    pub fn get_json<T: DeserializeOwned>(&self, name: &str) -> CoreResult<Option<T>> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        }
    }
}

impl FromIterator<(String, Option<String>)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            properties.set(&key, value);
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let mut props = Properties::new();
        props.set_string("b", "1");
        props.set_string("a", "2");
        props.set_string("b", "3");

        let keys: Vec<_> = props.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(props.get("b"), Some("3"));
    }

    #[test]
    fn test_null_values() {
        let mut props = Properties::new();
        props.set("Details", None);
        assert!(props.contains("Details"));
        assert_eq!(props.get("Details"), None);
        assert_eq!(props.get_bytes("Details").unwrap(), None);
    }

    #[test]
    fn test_typed_accessors() {
        let mut props = Properties::new();
        props.set_bool(names::PENDING, true);
        props.set_duration(names::DURATION, Duration::from_millis(1500));
        props.set_bytes(names::TASK_TOKEN, Some(&[1, 2, 3]));
        props.set_json(names::ARGS, &vec!["Jeff"]).unwrap();

        assert!(props.get_bool(names::PENDING).unwrap());
        assert!(!props.get_bool("Missing").unwrap());
        assert_eq!(
            props.get_duration(names::DURATION).unwrap(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(props.get_bytes(names::TASK_TOKEN).unwrap(), Some(vec![1, 2, 3]));
        let args: Vec<String> = props.get_json(names::ARGS).unwrap().unwrap();
        assert_eq!(args, vec!["Jeff".to_string()]);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let mut props = Properties::new();
        props.set_string("Count", "abc");
        props.set_string("Flag", "yes");
        assert!(matches!(
            props.get_i64("Count"),
            Err(CoreError::InvalidProperty { .. })
        ));
        assert!(props.get_bool("Flag").is_err());
        assert!(props.require_string("Missing").is_err());
    }
}
