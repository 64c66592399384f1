//! Kubernetes PersistentVolume Adapter
//!
//! Submits and removes PersistentVolumes through the API server.

use crate::domain::ports::VolumeApi;
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use tracing::debug;

const HTTP_NOT_FOUND: u16 = 404;
const HTTP_CONFLICT: u16 = 409;

/// [`VolumeApi`] backed by a kube client
#[derive(Clone)]
pub struct KubeVolumeApi {
    api: Api<PersistentVolume>,
}

impl KubeVolumeApi {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl VolumeApi for KubeVolumeApi {
    async fn create_pv(&self, pv: &PersistentVolume) -> Result<PersistentVolume> {
        match self.api.create(&PostParams::default(), pv).await {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(resp)) if resp.code == HTTP_CONFLICT => {
                Err(Error::ResourceExists {
                    kind: "PersistentVolume".into(),
                    name: pv.metadata.name.clone().unwrap_or_default(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_pv(&self, name: &str) -> Result<()> {
        match self.api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == HTTP_NOT_FOUND => {
                debug!("PersistentVolume {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_pvs(&self) -> Result<Vec<PersistentVolume>> {
        let list = self.api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}
