// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::BpfProgramCommon;

/// An Fentry Program: attaches `common.bpf_function_name` at kernel
/// function entry of `fn_name`. Shares the loader's `Tracing`
/// kernel type with Fexit.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    kind = "FentryProgram",
    group = "bpfman.io",
    version = "v1alpha1",
    status = "crate::status::ProgramStatus",
    shortname = "fentryprog"
)]
#[serde(rename_all = "camelCase")]
pub struct FentryProgramSpec {
    #[serde(flatten)]
    pub common: BpfProgramCommon,
    pub fn_name: String,
}
