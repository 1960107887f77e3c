//! In-memory cluster
//!
//! Behaves like a tiny API server: names are unique per kind and namespace,
//! creates of a present name fail, and deletions can be made to linger for a
//! number of lookups the way terminating objects do. Every call is recorded.
//!
//! Used for `--dry-run` and for testing orchestration order.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{ClusterApi, ClusterError};

/// Kind of call made against the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterOp {
    GetNamespace,
    CreateNamespace,
    GetConfigMap,
    CreateConfigMap,
    DeleteConfigMap,
    GetPod,
    CreatePod,
    DeletePod,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCall {
    pub op: ClusterOp,
    /// `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    ConfigMap,
    Pod,
}

type Key = (String, String);

#[derive(Default)]
struct State {
    namespaces: BTreeMap<String, Namespace>,
    config_maps: BTreeMap<Key, ConfigMap>,
    pods: BTreeMap<Key, Pod>,
    /// Deleted objects still visible, with the lookups they survive
    terminating: HashMap<(Kind, Key), u32>,
    deletion_lag: u32,
    failures: HashMap<ClusterOp, String>,
    calls: Vec<ClusterCall>,
}

impl State {
    fn record(
        &mut self,
        op: ClusterOp,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), ClusterError> {
        self.calls.push(ClusterCall {
            op,
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });

        match self.failures.get(&op) {
            Some(message) => Err(ClusterError::request(
                op_action(op),
                op_kind(op),
                name,
                message.clone(),
            )),
            None => Ok(()),
        }
    }

    fn require_namespace(
        &self,
        namespace: &str,
        kind: &'static str,
        name: &str,
    ) -> Result<(), ClusterError> {
        if self.namespaces.contains_key(namespace) {
            return Ok(());
        }
        Err(ClusterError::request(
            "create",
            kind,
            name,
            format!("namespace '{}' not found", namespace),
        ))
    }

    /// Advances a terminating object; returns true once it is gone
    fn reap(&mut self, kind: Kind, key: &Key) -> bool {
        let Some(remaining) = self.terminating.get_mut(&(kind, key.clone())) else {
            return false;
        };

        if *remaining > 0 {
            *remaining -= 1;
            return false;
        }

        self.terminating.remove(&(kind, key.clone()));
        match kind {
            Kind::ConfigMap => {
                self.config_maps.remove(key);
            }
            Kind::Pod => {
                self.pods.remove(key);
            }
        }
        true
    }

    fn start_deletion(&mut self, kind: Kind, key: Key) {
        if self.deletion_lag == 0 {
            match kind {
                Kind::ConfigMap => {
                    self.config_maps.remove(&key);
                }
                Kind::Pod => {
                    self.pods.remove(&key);
                }
            }
            return;
        }

        let lag = self.deletion_lag;
        self.terminating.entry((kind, key)).or_insert(lag);
    }
}

fn op_action(op: ClusterOp) -> &'static str {
    match op {
        ClusterOp::GetNamespace | ClusterOp::GetConfigMap | ClusterOp::GetPod => "get",
        ClusterOp::CreateNamespace | ClusterOp::CreateConfigMap | ClusterOp::CreatePod => "create",
        ClusterOp::DeleteConfigMap | ClusterOp::DeletePod => "delete",
    }
}

fn op_kind(op: ClusterOp) -> &'static str {
    match op {
        ClusterOp::GetNamespace | ClusterOp::CreateNamespace => "namespace",
        ClusterOp::GetConfigMap | ClusterOp::CreateConfigMap | ClusterOp::DeleteConfigMap => {
            "configmap"
        }
        ClusterOp::GetPod | ClusterOp::CreatePod | ClusterOp::DeletePod => "pod",
    }
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn name_of(meta_name: Option<&str>) -> String {
    meta_name.unwrap_or_default().to_string()
}

/// Cluster held entirely in process memory
#[derive(Default)]
pub struct InMemoryCluster {
    state: Mutex<State>,
}

impl InMemoryCluster {
    /// Creates an empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps deleted objects visible for `lookups` further get calls
    pub fn with_deletion_lag(self, lookups: u32) -> Self {
        self.state().deletion_lag = lookups;
        self
    }

    /// Makes every call of the given kind fail with `message`
    pub fn fail_on(self, op: ClusterOp, message: impl Into<String>) -> Self {
        self.state().failures.insert(op, message.into());
        self
    }

    /// Seeds an existing namespace
    pub fn with_namespace(self, namespace: Namespace) -> Self {
        let name = name_of(namespace.metadata.name.as_deref());
        self.state().namespaces.insert(name, namespace);
        self
    }

    /// Seeds an existing configuration object
    pub fn with_config_map(self, namespace: &str, config_map: ConfigMap) -> Self {
        let name = name_of(config_map.metadata.name.as_deref());
        self.state()
            .config_maps
            .insert(key(namespace, &name), config_map);
        self
    }

    /// Seeds an existing pod
    pub fn with_pod(self, namespace: &str, pod: Pod) -> Self {
        let name = name_of(pod.metadata.name.as_deref());
        self.state().pods.insert(key(namespace, &name), pod);
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<ClusterCall> {
        self.state().calls.clone()
    }

    /// Kinds of all calls made so far, in order
    pub fn ops(&self) -> Vec<ClusterOp> {
        self.state().calls.iter().map(|call| call.op).collect()
    }

    pub fn namespaces(&self) -> Vec<Namespace> {
        self.state().namespaces.values().cloned().collect()
    }

    pub fn config_maps(&self) -> Vec<ConfigMap> {
        self.state().config_maps.values().cloned().collect()
    }

    pub fn pods(&self) -> Vec<Pod> {
        self.state().pods.values().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ClusterApi for InMemoryCluster {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, ClusterError> {
        let mut state = self.state();
        state.record(ClusterOp::GetNamespace, None, name)?;
        Ok(state.namespaces.get(name).cloned())
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<(), ClusterError> {
        let name = name_of(namespace.metadata.name.as_deref());
        let mut state = self.state();
        state.record(ClusterOp::CreateNamespace, None, &name)?;

        if state.namespaces.contains_key(&name) {
            return Err(ClusterError::AlreadyExists {
                kind: "namespace",
                name,
            });
        }
        debug!("in-memory: created namespace {}", name);
        state.namespaces.insert(name, namespace.clone());
        Ok(())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError> {
        let mut state = self.state();
        state.record(ClusterOp::GetConfigMap, Some(namespace), name)?;

        let key = key(namespace, name);
        if state.reap(Kind::ConfigMap, &key) {
            return Ok(None);
        }
        Ok(state.config_maps.get(&key).cloned())
    }

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<(), ClusterError> {
        let name = name_of(config_map.metadata.name.as_deref());
        let mut state = self.state();
        state.record(ClusterOp::CreateConfigMap, Some(namespace), &name)?;

        let key = key(namespace, &name);
        if state.config_maps.contains_key(&key) {
            return Err(ClusterError::AlreadyExists {
                kind: "configmap",
                name,
            });
        }
        state.require_namespace(namespace, "configmap", &name)?;
        debug!("in-memory: created configmap {}/{}", namespace, name);
        state.config_maps.insert(key, config_map.clone());
        Ok(())
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        let mut state = self.state();
        state.record(ClusterOp::DeleteConfigMap, Some(namespace), name)?;

        let key = key(namespace, name);
        if !state.config_maps.contains_key(&key) {
            return Ok(false);
        }
        state.start_deletion(Kind::ConfigMap, key);
        Ok(true)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ClusterError> {
        let mut state = self.state();
        state.record(ClusterOp::GetPod, Some(namespace), name)?;

        let key = key(namespace, name);
        if state.reap(Kind::Pod, &key) {
            return Ok(None);
        }
        Ok(state.pods.get(&key).cloned())
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<(), ClusterError> {
        let name = name_of(pod.metadata.name.as_deref());
        let mut state = self.state();
        state.record(ClusterOp::CreatePod, Some(namespace), &name)?;

        let key = key(namespace, &name);
        if state.pods.contains_key(&key) {
            return Err(ClusterError::AlreadyExists { kind: "pod", name });
        }
        state.require_namespace(namespace, "pod", &name)?;
        debug!("in-memory: created pod {}/{}", namespace, name);
        state.pods.insert(key, pod.clone());
        Ok(())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        let mut state = self.state();
        state.record(ClusterOp::DeletePod, Some(namespace), name)?;

        let key = key(namespace, name);
        if !state.pods.contains_key(&key) {
            return Ok(false);
        }
        state.start_deletion(Kind::Pod, key);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn namespace(name: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_names() {
        let cluster = InMemoryCluster::new();
        cluster.create_namespace(&namespace("ns")).await.unwrap();

        let err = cluster.create_namespace(&namespace("ns")).await.unwrap_err();
        assert!(matches!(
            err,
            ClusterError::AlreadyExists {
                kind: "namespace",
                ..
            }
        ));
        assert_eq!(cluster.namespaces().len(), 1);
    }

    #[tokio::test]
    async fn test_deletion_lag_keeps_object_visible() {
        let cluster = InMemoryCluster::new()
            .with_namespace(namespace("ns"))
            .with_pod("ns", pod("p"))
            .with_deletion_lag(2);

        assert!(cluster.delete_pod("ns", "p").await.unwrap());
        assert!(cluster.get_pod("ns", "p").await.unwrap().is_some());
        assert!(cluster.get_pod("ns", "p").await.unwrap().is_some());
        assert!(cluster.get_pod("ns", "p").await.unwrap().is_none());
        assert!(cluster.pods().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_reports_false() {
        let cluster = InMemoryCluster::new();
        assert!(!cluster.delete_pod("ns", "ghost").await.unwrap());
        assert!(!cluster.delete_config_map("ns", "ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let cluster = InMemoryCluster::new().fail_on(ClusterOp::GetNamespace, "connection refused");

        let err = cluster.get_namespace("ns").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(cluster.ops(), vec![ClusterOp::GetNamespace]);
    }

    #[tokio::test]
    async fn test_pod_requires_namespace() {
        let cluster = InMemoryCluster::new();
        assert!(cluster.create_pod("missing", &pod("p")).await.is_err());
    }
}
