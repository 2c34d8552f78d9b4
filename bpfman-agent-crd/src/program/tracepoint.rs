// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::BpfProgramCommon;

/// A Tracepoint Program: attaches `common.bpf_function_name` at every
/// `category/event` tracepoint named in `names`. The kernel type used below
/// is always `Tracepoint`, and the UID used to identify loaded children is
/// always the object UID — never derived from the tracepoint name.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    kind = "TracepointProgram",
    group = "bpfman.io",
    version = "v1alpha1",
    status = "crate::status::ProgramStatus",
    shortname = "tpprog"
)]
#[serde(rename_all = "camelCase")]
pub struct TracepointProgramSpec {
    #[serde(flatten)]
    pub common: BpfProgramCommon,
    pub names: Vec<String>,
}
