//! Node Affinity
//!
//! Builds the placement constraint that pins discovered volumes to the node
//! that found them.

use crate::domain::ports::NodeInfo;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{
    NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
};

/// Required-during-scheduling affinity matching `label_key=<node's value>`
pub fn generate_node_affinity(node: &NodeInfo, label_key: &str) -> Result<NodeAffinity> {
    let labels = node.labels.as_ref().ok_or_else(|| {
        Error::Configuration(format!("Node {} does not have labels", node.name))
    })?;
    let value = labels.get(label_key).ok_or_else(|| {
        Error::Configuration(format!(
            "Node {} does not have expected label {}",
            node.name, label_key
        ))
    })?;

    Ok(NodeAffinity {
        required_during_scheduling_ignored_during_execution: Some(node_selector(
            label_key, value,
        )),
        ..Default::default()
    })
}

/// Serialize an affinity into the alpha annotation value
pub fn affinity_to_annotation(affinity: &NodeAffinity) -> Result<String> {
    Ok(serde_json::to_string(affinity)?)
}

fn node_selector(key: &str, value: &str) -> NodeSelector {
    NodeSelector {
        node_selector_terms: vec![NodeSelectorTerm {
            match_expressions: Some(vec![NodeSelectorRequirement {
                key: key.to_string(),
                operator: "In".to_string(),
                values: Some(vec![value.to_string()]),
            }]),
            ..Default::default()
        }],
    }
}
