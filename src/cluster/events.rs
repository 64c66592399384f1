//! Kubernetes Event Recorder
//!
//! Publishes Warning events against PersistentVolumes so cluster operators
//! see delete failures on the object itself.

use crate::domain::ports::EventRecorder;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};
use tracing::warn;

/// [`EventRecorder`] publishing through the events API
#[derive(Clone)]
pub struct KubeEventRecorder {
    client: Client,
    reporter: Reporter,
}

impl KubeEventRecorder {
    /// `controller` names the component, `instance` the node-specific identity
    pub fn new(client: Client, controller: &str, instance: &str) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: controller.to_string(),
                instance: Some(instance.to_string()),
            },
        }
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn record_warning(&self, pv: &PersistentVolume, reason: &str, message: &str) {
        let recorder = Recorder::new(
            self.client.clone(),
            self.reporter.clone(),
            pv.object_ref(&()),
        );
        let event = Event {
            type_: EventType::Warning,
            reason: reason.to_string(),
            note: Some(message.to_string()),
            action: "Delete".to_string(),
            secondary: None,
        };
        if let Err(e) = recorder.publish(event).await {
            warn!(
                "Failed to record {} event for {}: {}",
                reason,
                pv.metadata.name.as_deref().unwrap_or_default(),
                e
            );
        }
    }
}
