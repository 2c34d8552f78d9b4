// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Map-owner resolution: resolves a `map_owner_selector` to the
//! owning BpfProgram's kernel id and loaded state, if any.

use bpfman_agent_crd::{bpfprogram::BpfProgram, common, conditions};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::{
    api::{Api, ListParams},
    Client, ResourceExt,
};

use crate::{child_reconciler::MapOwnerStatus, errors::ReconcileError, loader::LoaderHandle};

/// Resolves `selector` (a Program CR's `map_owner_selector`, already
/// scoped to `host=<this node>`) to a `MapOwnerStatus`. More than one
/// match is treated as a configuration error surfaced through a
/// bounded-retry failure rather than guessed at by falling back to
/// `MapOwnerNotFound`.
pub async fn resolve_map_owner(
    client: &Client,
    loader: &LoaderHandle,
    node_name: &str,
    selector: Option<&LabelSelector>,
) -> Result<MapOwnerStatus, ReconcileError> {
    let Some(selector) = selector else {
        return Ok(MapOwnerStatus::NotSet);
    };

    let mut label_terms = Vec::new();
    if let Some(match_labels) = &selector.match_labels {
        let mut pairs: Vec<_> = match_labels.iter().collect();
        pairs.sort();
        for (k, v) in pairs {
            label_terms.push(format!("{k}={v}"));
        }
    }
    label_terms.push(format!("{}={}", common::LABEL_HOST, node_name));

    let bpf_programs: Api<BpfProgram> = Api::all(client.clone());
    let list = bpf_programs
        .list(&ListParams::default().labels(&label_terms.join(",")))
        .await?;

    match list.items.len() {
        0 => Ok(MapOwnerStatus::NotFound),
        1 => {
            let owner = &list.items[0];
            let is_loaded = owner
                .status
                .as_ref()
                .and_then(|s| conditions::current_condition_type(&s.conditions))
                == Some("Loaded");
            if !is_loaded {
                return Ok(MapOwnerStatus::NotLoaded);
            }
            let uid = owner.uid().ok_or(ReconcileError::MissingObjectKey(".metadata.uid"))?;
            match loader.get_by_uid(&uid).await? {
                Some(live) => Ok(MapOwnerStatus::Loaded {
                    kernel_id: live.kernel_id,
                }),
                None => Ok(MapOwnerStatus::NotLoaded),
            }
        }
        _ => Err(ReconcileError::AmbiguousMapOwner),
    }
}
