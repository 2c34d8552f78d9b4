// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Discovery reconciler: mirrors loader programs not owned by
//! this system into read-only `BpfProgram` records, so that the cluster's
//! view of the node converges to the loader's even for programs loaded by
//! a third party.

use std::{collections::BTreeMap, time::Duration};

use bpfman_agent_crd::{
    bpfprogram::{BpfProgram, BpfProgramSpec},
    common::{self, discovery_annotations as ann},
};
use kube::{
    api::{Api, ListParams, ObjectMeta, PostParams},
    runtime::controller::Action,
    Resource, ResourceExt,
};
use tracing::{debug, info};

use crate::{errors::ReconcileError, loader::LiveProgram, orchestrator::Context};

const DISCOVERY_POLL_SECS: u64 = 30;

/// Projects one live loader program's kernel-info block into the
/// annotation set a discovery-owned `BpfProgram` should carry.
fn project_annotations(live: &LiveProgram) -> BTreeMap<String, String> {
    let info = &live.kernel_info;
    let mut annotations = BTreeMap::new();
    annotations.insert(ann::KERNEL_ID.to_string(), info.id.to_string());
    annotations.insert(ann::NAME.to_string(), info.name.clone());
    annotations.insert(ann::PROGRAM_TYPE.to_string(), info.program_type.to_string());
    annotations.insert(ann::LOADED_AT.to_string(), info.loaded_at.clone());
    annotations.insert(ann::TAG.to_string(), info.tag.clone());
    annotations.insert(ann::GPL_COMPATIBLE.to_string(), info.gpl_compatible.to_string());
    annotations.insert(
        ann::MAP_IDS.to_string(),
        info.map_ids.iter().map(u32::to_string).collect::<Vec<_>>().join(","),
    );
    annotations.insert(ann::BTF_ID.to_string(), info.btf_id.to_string());
    annotations.insert(ann::BYTES_XLATED.to_string(), info.bytes_xlated.to_string());
    annotations.insert(ann::JITED.to_string(), info.jited.to_string());
    annotations.insert(ann::BYTES_JITED.to_string(), info.bytes_jited.to_string());
    annotations.insert(ann::BYTES_MEMLOCK.to_string(), info.bytes_memlock.to_string());
    annotations.insert(ann::VERIFIED_INSNS.to_string(), info.verified_insns.to_string());
    annotations
}

/// Synthesises the expected discovery `BpfProgram` name for one live
/// program: `<sanitised-kernel-name>-<kernel-id>-<nodeName>`, or
/// `<kernel-id>-<nodeName>` if the kernel name is empty.
pub fn discovered_name(kernel_name: &str, kernel_id: u32, node_name: &str) -> String {
    if kernel_name.is_empty() {
        format!("{kernel_id}-{node_name}")
    } else {
        format!(
            "{}-{kernel_id}-{node_name}",
            common::sanitize_name_component(kernel_name)
        )
    }
}

/// Runs one discovery pass: lists every loader program, keeps only those
/// without `uuid` metadata (not owned by this system), and reconciles the
/// cluster's discovery-labelled `BpfProgram` records to match.
pub async fn run_discovery(ctx: &Context) -> Result<Action, ReconcileError> {
    let live = ctx.loader.list_all().await?;
    let undiscovered: Vec<&LiveProgram> = live.iter().filter(|p| p.uuid().is_none()).collect();

    let api: Api<BpfProgram> = Api::all(ctx.client.clone());
    let existing = api
        .list(&ListParams::default().labels(&format!("{}=true", common::LABEL_DISCOVERED)))
        .await?;
    let mut existing_by_name: BTreeMap<String, BpfProgram> = existing
        .items
        .into_iter()
        .filter(|b| {
            b.labels().get(common::LABEL_HOST).map(String::as_str) == Some(ctx.node_name.as_str())
        })
        .map(|b| (b.name_any(), b))
        .collect();

    for live_program in undiscovered {
        let name = discovered_name(&live_program.kernel_info.name, live_program.kernel_id, &ctx.node_name);
        let annotations = project_annotations(live_program);

        match existing_by_name.remove(&name) {
            None => create_discovered(ctx, &name, annotations).await?,
            Some(current) => {
                let drifted = annotations
                    .iter()
                    .any(|(k, v)| current.annotations().get(k) != Some(v));
                if drifted {
                    update_discovered(ctx, &current, annotations).await?;
                }
            }
        }
    }

    // Anything left over no longer exists in the loader.
    for (_, stale) in existing_by_name {
        debug!(name = %stale.name_any(), "removing stale discovery record");
        api.delete(&stale.name_any(), &Default::default()).await?;
    }

    Ok(Action::requeue(Duration::from_secs(DISCOVERY_POLL_SECS)))
}

async fn create_discovered(
    ctx: &Context,
    name: &str,
    annotations: BTreeMap<String, String>,
) -> Result<(), ReconcileError> {
    info!(name = %name, "creating discovery BpfProgram");
    let mut labels = BTreeMap::new();
    labels.insert(common::LABEL_DISCOVERED.to_string(), "true".to_string());
    labels.insert(common::LABEL_HOST.to_string(), ctx.node_name.clone());

    let object = BpfProgram {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels.into_iter().collect()),
            annotations: Some(annotations.into_iter().collect()),
            ..Default::default()
        },
        spec: BpfProgramSpec {
            program_type: "Discovered".to_string(),
        },
        status: None,
    };
    let api: Api<BpfProgram> = Api::all(ctx.client.clone());
    api.create(&PostParams::default(), &object).await?;
    Ok(())
}

async fn update_discovered(
    ctx: &Context,
    current: &BpfProgram,
    annotations: BTreeMap<String, String>,
) -> Result<(), ReconcileError> {
    let api: Api<BpfProgram> = Api::all(ctx.client.clone());
    let patch = kube::api::Patch::Merge(serde_json::json!({
        "metadata": { "annotations": annotations }
    }));
    api.patch(&current.name_any(), &kube::api::PatchParams::default(), &patch)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_kernel_id_only_name_when_kernel_name_is_empty() {
        assert_eq!(discovered_name("", 693, "nodeA"), "693-nodeA");
    }

    #[test]
    fn joins_sanitised_name_kernel_id_and_node() {
        assert_eq!(
            discovered_name("dump_bpf_map", 693, "nodeA"),
            "dump-bpf-map-693-nodeA"
        );
    }
}
