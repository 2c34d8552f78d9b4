// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of a Program CR itself. This is written by the operator-side
/// aggregator that rolls up per-node `BpfProgram` conditions into a single
/// Program-level condition — the agent only ever
/// reads Program CRs, never patches this status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProgramStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
