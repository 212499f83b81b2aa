//! Identity this orchestrator announces to a remote control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Self-registration payload sent once after a successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRegistration {
    pub node_id: Uuid,
    /// Address peers can reach this node on, if any.
    pub address: Option<String>,
    /// Logical cores available for executors.
    pub capacity: usize,
    pub version: String,
    pub registered_at: DateTime<Utc>,
}

impl NodeRegistration {
    /// Describe this process with a fresh node ID.
    #[must_use]
    pub fn for_this_node(address: Option<String>, capacity: usize) -> Self {
        Self {
            node_id: Uuid::new_v4(),
            address,
            capacity,
            version: env!("CARGO_PKG_VERSION").to_string(),
            registered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_uses_camel_case_fields() {
        let node = NodeRegistration::for_this_node(Some("10.0.0.7:8080".into()), 4);
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["nodeId"], node.node_id.to_string());
        assert_eq!(json["capacity"], 4);
        assert!(json.get("registeredAt").is_some());
        assert!(json.get("node_id").is_none());
    }
}
