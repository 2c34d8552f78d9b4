// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::BpfProgramCommon;

/// A Kprobe Program: attaches `common.bpf_function_name` at every kernel
/// function named in `fn_names`. Kprobe and Uprobe share the
/// loader's `Kprobe` kernel type — the orchestrator disambiguates
/// by `program-name` metadata when it needs to, never by kernel type alone.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    kind = "KprobeProgram",
    group = "bpfman.io",
    version = "v1alpha1",
    status = "crate::status::ProgramStatus",
    shortname = "kprobeprog"
)]
#[serde(rename_all = "camelCase")]
pub struct KprobeProgramSpec {
    #[serde(flatten)]
    pub common: BpfProgramCommon,
    pub fn_names: Vec<String>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub retprobe: bool,
}
