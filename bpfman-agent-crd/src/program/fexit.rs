// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::BpfProgramCommon;

/// An Fexit Program: attaches `common.bpf_function_name` at kernel function
/// exit of `fn_name`. Shares the loader's `Tracing` kernel type
/// with Fentry.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    kind = "FexitProgram",
    group = "bpfman.io",
    version = "v1alpha1",
    status = "crate::status::ProgramStatus",
    shortname = "fexitprog"
)]
#[serde(rename_all = "camelCase")]
pub struct FexitProgramSpec {
    #[serde(flatten)]
    pub common: BpfProgramCommon,
    pub fn_name: String,
}
