//! Node identity lookup

use crate::domain::ports::NodeInfo;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::Node;
use kube::api::Api;
use kube::Client;

/// Fetch the node this process runs on
pub async fn get_node_info(client: Client, node_name: &str) -> Result<NodeInfo> {
    let nodes: Api<Node> = Api::all(client);
    let node = match nodes.get(node_name).await {
        Ok(node) => node,
        Err(kube::Error::Api(resp)) if resp.code == 404 => {
            return Err(Error::ResourceNotFound {
                kind: "Node".into(),
                name: node_name.into(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    Ok(node_info(&node))
}

/// Identity fields of a Node object
pub fn node_info(node: &Node) -> NodeInfo {
    NodeInfo {
        name: node.metadata.name.clone().unwrap_or_default(),
        uid: node.metadata.uid.clone().unwrap_or_default(),
        labels: node.metadata.labels.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_node_info_copies_identity() {
        let node = Node {
            metadata: ObjectMeta {
                name: Some("worker-1".into()),
                uid: Some("1f2e".into()),
                labels: Some([("kubernetes.io/hostname".to_string(), "worker-1".to_string())].into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let info = node_info(&node);
        assert_eq!(info.name, "worker-1");
        assert_eq!(info.uid, "1f2e");
        assert_eq!(info.labels.unwrap()["kubernetes.io/hostname"], "worker-1");
    }

    #[test]
    fn test_node_info_without_labels() {
        let node = Node {
            metadata: ObjectMeta {
                name: Some("worker-2".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(node_info(&node).labels.is_none());
    }
}
