// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{BpfProgramCommon, InterfaceSelector};

/// An XDP Program: attaches `common.bpf_function_name` at the XDP hook of
/// every interface `interface_selector` resolves to on a selected node.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    kind = "XdpProgram",
    group = "bpfman.io",
    version = "v1alpha1",
    status = "crate::status::ProgramStatus",
    shortname = "xdpprog"
)]
#[serde(rename_all = "camelCase")]
pub struct XdpProgramSpec {
    #[serde(flatten)]
    pub common: BpfProgramCommon,
    pub interface_selector: InterfaceSelector,
    #[serde(default)]
    pub priority: u32,
    /// Action codes a dispatcher should continue past this program on;
    /// encoded bit-exactly with the loader's numbering by
    /// `bpfman_agent_api::XdpProceedOn`.
    #[serde(default)]
    pub proceed_on: Vec<String>,
}
