//! Hierarchical key/value status reporting

use std::collections::BTreeMap;

use serde_json::Value;

/// A structured status report assembled from hierarchical parameter paths.
///
/// Cores append their telemetry and ring occupancy under
/// `<path>/<CoreRole>_<index>/...`; the full report serializes to a flat
/// JSON object keyed by path.
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    params: BTreeMap<String, Value>,
}

impl StatusReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one parameter under a hierarchical path
    pub fn set_param(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(path.into(), value.into());
    }

    /// Get one parameter by exact path
    pub fn get_param(&self, path: &str) -> Option<&Value> {
        self.params.get(path)
    }

    /// All parameters, ordered by path
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the report is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Paths with the given prefix
    pub fn paths_under(&self, prefix: &str) -> Vec<&str> {
        self.params
            .keys()
            .filter(|k| k.starts_with(prefix))
            .map(|k| k.as_str())
            .collect()
    }

    /// Serialize the report as one flat JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut report = StatusReport::new();
        report.set_param("/fp/FrameBuilderCore_0/frames_processed", 42u64);
        report.set_param("/fp/FrameBuilderCore_0/timing/mean_frame_us", 7u64);

        assert_eq!(
            report.get_param("/fp/FrameBuilderCore_0/frames_processed"),
            Some(&Value::from(42u64))
        );
        assert_eq!(report.len(), 2);
        assert_eq!(
            report.paths_under("/fp/FrameBuilderCore_0/timing/").len(),
            1
        );
    }

    #[test]
    fn test_to_json_flat_object() {
        let mut report = StatusReport::new();
        report.set_param("a/b", true);
        let json = report.to_json();
        assert_eq!(json["a/b"], Value::Bool(true));
    }
}
