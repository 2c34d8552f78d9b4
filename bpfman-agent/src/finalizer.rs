// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use kube::{
    api::{Patch, PatchParams},
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Adds `finalizer` to `object` if it is not already present. No-op
/// otherwise. Cluster-namespaced resources only; every kind this agent
/// manages is cluster-scoped, so `namespace` is always `None`.
pub async fn add<K>(client: Client, object: &K, finalizer: &str) -> Result<K, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + std::fmt::Debug + DeserializeOwned + serde::Serialize,
{
    let api: Api<K> = Api::all(client);
    let mut finalizers = object.finalizers().to_vec();
    if finalizers.iter().any(|f| f == finalizer) {
        return Ok(object.clone());
    }
    finalizers.push(finalizer.to_string());

    let patch = Patch::Merge(json!({ "metadata": { "finalizers": finalizers } }));
    api.patch(&object.name_any(), &PatchParams::default(), &patch)
        .await
}

/// Removes `finalizer` from `object`. No-op if it is not present.
pub async fn remove<K>(client: Client, object: &K, finalizer: &str) -> Result<K, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + std::fmt::Debug + DeserializeOwned + serde::Serialize,
{
    let api: Api<K> = Api::all(client);
    let finalizers: Vec<String> = object
        .finalizers()
        .iter()
        .filter(|f| f.as_str() != finalizer)
        .cloned()
        .collect();

    let patch = Patch::Merge(json!({ "metadata": { "finalizers": finalizers } }));
    api.patch(&object.name_any(), &PatchParams::default(), &patch)
        .await
}
