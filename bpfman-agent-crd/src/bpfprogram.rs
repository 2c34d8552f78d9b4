// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The per-attachment-point child a Program kind materialises on a node.
/// Everything the per-child reconciler needs beyond `program_type` lives in
/// labels/annotations, not spec fields — a `BpfProgram` is a thin, almost
/// entirely metadata-driven record.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    kind = "BpfProgram",
    group = "bpfman.io",
    version = "v1alpha1",
    status = "BpfProgramStatus",
    shortname = "bpfprog"
)]
#[serde(rename_all = "camelCase")]
pub struct BpfProgramSpec {
    /// Name of the owning Program kind, e.g. `"XdpProgram"`. Lets generic
    /// code (discovery, the CLI) identify a child's kind without an extra
    /// API round-trip through its owner reference.
    pub program_type: String,
}

/// Status of a `BpfProgram`. Exactly one condition is present at any
/// observable moment; see
/// `crate::conditions::collapse_to_single`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct BpfProgramStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
