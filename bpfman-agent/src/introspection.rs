// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Node and container introspection: interface resolution
//! and per-container PID discovery for Uprobe's container selector.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bpfman_agent_crd::common::{ContainerSelector, InterfaceSelector};
use futures::TryStreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, ListParams},
    Client,
};
use tracing::warn;

use crate::errors::ReconcileError;

/// Resolves an `InterfaceSelector` to a concrete interface list. Never
/// returns an empty list for the "primary node interface" branch — a
/// missing default route is a hard resolution failure, not an
/// empty-selection condition.
pub async fn resolve_interfaces(selector: &InterfaceSelector) -> Result<Vec<String>, ReconcileError> {
    match selector {
        InterfaceSelector::Interfaces(list) => Ok(list.clone()),
        InterfaceSelector::PrimaryNodeInterface(true) => {
            Ok(vec![primary_node_interface().await?])
        }
        InterfaceSelector::PrimaryNodeInterface(false) => Err(ReconcileError::NoInterfacesSelected),
    }
}

/// Finds the interface carrying the node's default IPv4 route.
async fn primary_node_interface() -> Result<String, ReconcileError> {
    let (connection, handle, _) = rtnetlink::new_connection()
        .map_err(|e| ReconcileError::PrimaryInterfaceResolutionFailed(e.to_string()))?;
    tokio::spawn(connection);

    let mut routes = handle.route().get(rtnetlink::IpVersion::V4).execute();
    while let Some(route) = routes
        .try_next()
        .await
        .map_err(|e| ReconcileError::PrimaryInterfaceResolutionFailed(e.to_string()))?
    {
        let is_default = route.header.destination_prefix_length == 0;
        if !is_default {
            continue;
        }
        let Some(index) = route.attributes.iter().find_map(|attr| match attr {
            rtnetlink::packet_route::route::RouteAttribute::Oif(idx) => Some(*idx),
            _ => None,
        }) else {
            continue;
        };

        let mut links = handle.link().get().match_index(index).execute();
        if let Some(link) = links
            .try_next()
            .await
            .map_err(|e| ReconcileError::PrimaryInterfaceResolutionFailed(e.to_string()))?
        {
            if let Some(name) = link.attributes.iter().find_map(|attr| match attr {
                rtnetlink::packet_route::link::LinkAttribute::IfName(name) => Some(name.clone()),
                _ => None,
            }) {
                return Ok(name);
            }
        }
    }

    Err(ReconcileError::PrimaryInterfaceResolutionFailed(
        "no default route found on this node".to_string(),
    ))
}

/// One container a Uprobe Program's container selector matched on this
/// node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerMatch {
    pub pod_name: String,
    pub container_name: String,
    pub pid: i64,
}

/// Looks up the host PID of a running container. Kept as a trait so the
/// runtime-specific lookup (CRI, containerd, CRI-O) can be swapped without
/// touching the reconciler — the core only ever consumes
/// `(podName, containerName, pid)` triples.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pid_for_container(&self, container_id: &str) -> Result<i64, ReconcileError>;
}

/// Resolves a container's PID by scanning `/proc/*/cgroup` for the
/// container ID. Works without a CRI client dependency by relying on the
/// fact that every major runtime (containerd, CRI-O, dockershim) embeds
/// the full container ID in each of its processes' cgroup path.
pub struct ProcfsContainerRuntime;

#[async_trait]
impl ContainerRuntime for ProcfsContainerRuntime {
    async fn pid_for_container(&self, container_id: &str) -> Result<i64, ReconcileError> {
        let container_id = strip_runtime_scheme(container_id);
        let mut entries = tokio::fs::read_dir("/proc")
            .await
            .map_err(|e| ReconcileError::ContainerRuntimeError(e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReconcileError::ContainerRuntimeError(e.to_string()))?
        {
            let Ok(pid) = entry.file_name().to_string_lossy().parse::<i64>() else {
                continue;
            };
            let cgroup_path = entry.path().join("cgroup");
            let Ok(contents) = tokio::fs::read_to_string(&cgroup_path).await else {
                continue;
            };
            if contents.contains(container_id) {
                return Ok(pid);
            }
        }

        Err(ReconcileError::ContainerRuntimeError(format!(
            "no process found for container {container_id}"
        )))
    }
}

fn strip_runtime_scheme(container_id: &str) -> &str {
    container_id.split_once("://").map_or(container_id, |(_, id)| id)
}

/// Lists the containers a Uprobe Program's `ContainerSelector` matches on
/// this node, filtering both by pod label selector and by node name
/// locally — an agent must never attach to PIDs for a pod not scheduled
/// here. Returns an empty list, never an error, when the selector is valid
/// but matches nothing.
pub async fn resolve_containers(
    client: &Client,
    runtime: &dyn ContainerRuntime,
    node_name: &str,
    selector: &ContainerSelector,
) -> Result<Vec<ContainerMatch>, ReconcileError> {
    let pods: Api<Pod> = Api::all(client.clone());
    let label_selector = label_selector_to_query_string(&selector.pod_selector);
    let list_params = ListParams::default().labels(&label_selector);

    let pod_list = pods.list(&list_params).await?;

    let mut matches = Vec::new();
    for pod in pod_list.items {
        if pod.spec.as_ref().and_then(|s| s.node_name.as_deref()) != Some(node_name) {
            continue;
        }
        let Some(pod_name) = pod.metadata.name.clone() else {
            continue;
        };
        let Some(status) = &pod.status else { continue };
        for container_status in status.container_statuses.iter().flatten() {
            if !selector.container_names.is_empty()
                && !selector.container_names.contains(&container_status.name)
            {
                continue;
            }
            let Some(container_id) = &container_status.container_id else {
                continue;
            };
            match runtime.pid_for_container(container_id).await {
                Ok(pid) => matches.push(ContainerMatch {
                    pod_name: pod_name.clone(),
                    container_name: container_status.name.clone(),
                    pid,
                }),
                Err(e) => warn!(
                    pod = %pod_name,
                    container = %container_status.name,
                    error = %e,
                    "could not resolve container pid, skipping"
                ),
            }
        }
    }
    Ok(matches)
}

fn label_selector_to_query_string(selector: &k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector) -> String {
    let mut terms = Vec::new();
    if let Some(match_labels) = &selector.match_labels {
        let ordered: BTreeMap<_, _> = match_labels.iter().collect();
        for (k, v) in ordered {
            terms.push(format!("{k}={v}"));
        }
    }
    terms.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_containerd_scheme() {
        assert_eq!(strip_runtime_scheme("containerd://abc123"), "abc123");
    }

    #[test]
    fn leaves_bare_ids_untouched() {
        assert_eq!(strip_runtime_scheme("abc123"), "abc123");
    }

    #[test]
    fn label_selector_renders_sorted_query_string() {
        let mut labels = BTreeMap::new();
        labels.insert("b".to_string(), "2".to_string());
        labels.insert("a".to_string(), "1".to_string());
        let selector = k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector {
            match_labels: Some(labels.into_iter().collect()),
            match_expressions: None,
        };
        assert_eq!(label_selector_to_query_string(&selector), "a=1,b=2");
    }
}
