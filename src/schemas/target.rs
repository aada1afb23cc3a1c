//! Delivery target descriptor
//!
//! A delivery target is read-only input to the resolver. Optional string
//! fields treat `""` the same as absent.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// A configured destination a record batch is delivered to
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTarget {
    pub id: String,

    /// Destination type, the adapter registry key
    #[serde(rename = "type")]
    pub destination_type: String,

    /// Destination address (queue URL, stream name, topic ARN, ...)
    #[serde(default)]
    pub destination: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// ARN of the role to assume before talking to the destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Custom service endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Record collapse mode, may be forced by the adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse: Option<String>,

    /// Adapter-specific settings not modelled here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeliveryTarget {
    pub fn new(id: impl Into<String>, destination_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            destination_type: destination_type.into(),
            ..Default::default()
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn region(&self) -> Option<&str> {
        non_empty(&self.region)
    }

    pub fn role(&self) -> Option<&str> {
        non_empty(&self.role)
    }

    pub fn external_id(&self) -> Option<&str> {
        non_empty(&self.external_id)
    }

    pub fn endpoint(&self) -> Option<&str> {
        non_empty(&self.endpoint)
    }

    pub fn collapse(&self) -> Option<&str> {
        non_empty(&self.collapse)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Load a JSON array of delivery targets from disk
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<DeliveryTarget>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read targets file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse targets file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_strings_are_absent() {
        let target: DeliveryTarget = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "type": "queueSvc",
            "destination": "https://sqs.us-east-1.amazonaws.com/123/q",
            "region": "",
            "role": "",
            "externalId": "",
            "endpoint": ""
        }))
        .unwrap();

        assert_eq!(target.region(), None);
        assert_eq!(target.role(), None);
        assert_eq!(target.external_id(), None);
        assert_eq!(target.endpoint(), None);
    }

    #[test]
    fn test_deserialize_full_target() {
        let target: DeliveryTarget = serde_json::from_value(serde_json::json!({
            "id": "orders",
            "type": "streamSvc",
            "destination": "orders-stream",
            "region": "eu-west-1",
            "role": "arn:aws:iam::123456789012:role/writer",
            "externalId": "ext-42",
            "endpoint": "http://localhost:4566",
            "collapse": "JSON",
            "partitionKey": "customerId"
        }))
        .unwrap();

        assert_eq!(target.destination_type, "streamSvc");
        assert_eq!(target.region(), Some("eu-west-1"));
        assert_eq!(target.role(), Some("arn:aws:iam::123456789012:role/writer"));
        assert_eq!(target.external_id(), Some("ext-42"));
        assert_eq!(target.endpoint(), Some("http://localhost:4566"));
        assert_eq!(target.collapse(), Some("JSON"));
        assert_eq!(target.extra.get("partitionKey"), Some(&Value::from("customerId")));
    }

    #[test]
    fn test_load_targets_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "a", "type": "queueSvc"}}, {{"id": "b", "type": "topicSvc", "role": "arn:aws:iam::1:role/r"}}]"#
        )
        .unwrap();

        let targets = load_targets(file.path()).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].destination, "");
        assert_eq!(targets[1].role(), Some("arn:aws:iam::1:role/r"));
    }

    #[test]
    fn test_load_targets_reports_path() {
        let err = load_targets("/nonexistent/targets.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/targets.json"));
    }
}
