//! Kubernetes-backed cluster access

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod};
use kube::api::{DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::path::Path;
use tracing::{debug, info};

use super::{ClusterApi, ClusterError};

/// Cluster access through the Kubernetes API server
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connects using an explicit kubeconfig file, or infers the
    /// configuration (in-cluster service account, `KUBECONFIG`,
    /// `~/.kube/config`) when no path is given
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, ClusterError> {
        let config = match kubeconfig {
            Some(path) => {
                info!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    ClusterError::Unreachable(format!(
                        "failed to read kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| ClusterError::Unreachable(format!("invalid kubeconfig: {}", e)))?
            }
            None => {
                info!("Inferring cluster configuration");
                Config::infer().await.map_err(|e| {
                    ClusterError::Unreachable(format!("no cluster configuration found: {}", e))
                })?
            }
        };

        debug!("Cluster endpoint: {}", config.cluster_url);

        let client = Client::try_from(config)
            .map_err(|e| ClusterError::Unreachable(format!("failed to build client: {}", e)))?;

        Ok(Self { client })
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

async fn get<K>(api: &Api<K>, kind: &'static str, name: &str) -> Result<Option<K>, ClusterError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    api.get_opt(name)
        .await
        .map_err(|e| ClusterError::request("get", kind, name, e.to_string()))
}

async fn create<K>(
    api: &Api<K>,
    kind: &'static str,
    name: &str,
    object: &K,
) -> Result<(), ClusterError>
where
    K: Resource + Clone + DeserializeOwned + Debug + serde::Serialize,
{
    api.create(&PostParams::default(), object)
        .await
        .map(|_| ())
        .map_err(|e| ClusterError::request("create", kind, name, e.to_string()))
}

async fn delete_if_present<K>(
    api: &Api<K>,
    kind: &'static str,
    name: &str,
) -> Result<bool, ClusterError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    if get(api, kind, name).await?.is_none() {
        return Ok(false);
    }

    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(true),
        Err(e) => {
            // Someone else removed it between the lookup and the delete
            if get(api, kind, name).await?.is_none() {
                debug!("{} '{}' disappeared before delete completed", kind, name);
                return Ok(false);
            }
            Err(ClusterError::request("delete", kind, name, e.to_string()))
        }
    }
}

fn object_name<K: Resource>(object: &K) -> String {
    object.meta().name.clone().unwrap_or_default()
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, ClusterError> {
        get(&self.namespaces(), "namespace", name).await
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<(), ClusterError> {
        create(
            &self.namespaces(),
            "namespace",
            &object_name(namespace),
            namespace,
        )
        .await
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError> {
        get(&self.config_maps(namespace), "configmap", name).await
    }

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<(), ClusterError> {
        create(
            &self.config_maps(namespace),
            "configmap",
            &object_name(config_map),
            config_map,
        )
        .await
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        delete_if_present(&self.config_maps(namespace), "configmap", name).await
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ClusterError> {
        get(&self.pods(namespace), "pod", name).await
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<(), ClusterError> {
        create(&self.pods(namespace), "pod", &object_name(pod), pod).await
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        delete_if_present(&self.pods(namespace), "pod", name).await
    }
}
