// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{BpfProgramCommon, ContainerSelector};

/// A Uprobe Program: attaches `common.bpf_function_name` at every user
/// function named in `fn_names` inside `target`. When
/// `container_selector` is set, the agent attaches inside every matching
/// container's PID namespace on this node instead of the host's.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    kind = "UprobeProgram",
    group = "bpfman.io",
    version = "v1alpha1",
    status = "crate::status::ProgramStatus",
    shortname = "uprobeprog"
)]
#[serde(rename_all = "camelCase")]
pub struct UprobeProgramSpec {
    #[serde(flatten)]
    pub common: BpfProgramCommon,
    pub fn_names: Vec<String>,
    pub target: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub retprobe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_selector: Option<ContainerSelector>,
}
