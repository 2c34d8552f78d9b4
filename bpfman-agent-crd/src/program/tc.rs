// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{BpfProgramCommon, InterfaceSelector};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TcDirection {
    Ingress,
    Egress,
}

/// A TC Program: attaches `common.bpf_function_name` as a traffic-control
/// classifier in the given `direction` on every interface
/// `interface_selector` resolves to.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    kind = "TcProgram",
    group = "bpfman.io",
    version = "v1alpha1",
    status = "crate::status::ProgramStatus",
    shortname = "tcprog"
)]
#[serde(rename_all = "camelCase")]
pub struct TcProgramSpec {
    #[serde(flatten)]
    pub common: BpfProgramCommon,
    pub interface_selector: InterfaceSelector,
    #[serde(default)]
    pub priority: u32,
    pub direction: TcDirection,
    #[serde(default)]
    pub proceed_on: Vec<String>,
}
