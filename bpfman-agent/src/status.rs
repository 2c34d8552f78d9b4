// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Status-write helpers shared by the orchestrator and discovery
//! reconciler: patching a `BpfProgram`'s single condition and its kernel-id
//! annotation.

use bpfman_agent_crd::{
    bpfprogram::BpfProgram,
    conditions::{build_condition, BpfProgramConditionType},
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{
    api::{Patch, PatchParams},
    Api, Client,
};
use serde_json::json;

use crate::errors::ReconcileError;

fn now() -> Time {
    Time(chrono::Utc::now())
}

/// Overwrites `name`'s status with a single condition, collapsing whatever
/// was there before.
pub async fn write_condition(
    client: &Client,
    name: &str,
    condition: BpfProgramConditionType,
    message: impl Into<String>,
) -> Result<(), ReconcileError> {
    let api: Api<BpfProgram> = Api::all(client.clone());
    let built = build_condition(condition, message, now());
    let patch = Patch::Merge(json!({
        "status": { "conditions": [built] }
    }));
    api.patch_status(name, &PatchParams::default(), &patch)
        .await?;
    Ok(())
}

/// Writes the kernel-assigned program id annotation, set only after the
/// first successful load.
pub async fn write_id_annotation(
    client: &Client,
    name: &str,
    kernel_id: u32,
) -> Result<(), ReconcileError> {
    let api: Api<BpfProgram> = Api::all(client.clone());
    let patch = Patch::Merge(json!({
        "metadata": {
            "annotations": { bpfman_agent_crd::common::ANNOTATION_PROGRAM_ID: kernel_id.to_string() }
        }
    }));
    api.patch(name, &PatchParams::default(), &patch).await?;
    Ok(())
}
