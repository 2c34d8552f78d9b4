// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Per-child reconciler: drives one BpfProgram through its
//! state machine against the loader's live state.

use bpfman_agent_crd::conditions::BpfProgramConditionType;
use tracing::{debug, info};

use crate::{
    errors::ReconcileError,
    loader::{ExpectedLoad, LiveProgram},
};

/// Resolved map-owner status for one BpfProgram, fed in by the map-owner
/// resolution step before the per-child reconciler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapOwnerStatus {
    NotSet,
    NotFound,
    NotLoaded,
    Loaded { kernel_id: u32 },
}

/// Everything the state machine needs to decide an outcome for one
/// BpfProgram.
pub struct ChildInputs<'a> {
    pub bpf_program_uid: &'a str,
    pub expected: &'a ExpectedLoad,
    pub live: Option<&'a LiveProgram>,
    pub is_node_selected: bool,
    pub is_being_deleted: bool,
    pub no_containers_on_node: bool,
    pub map_owner: MapOwnerStatus,
    pub current_id_annotation: Option<u32>,
}

/// Result of reconciling one child: the condition to write, a human
/// message, and the kernel id to persist in the annotation (if any
/// load/unload happened and the id is known).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildOutcome {
    pub condition: BpfProgramConditionType,
    pub message: String,
    pub kernel_id: Option<u32>,
}

/// A terminal gate checked before attempting a load, in priority order.
fn terminal_gate(inputs: &ChildInputs<'_>) -> Option<BpfProgramConditionType> {
    if inputs.is_being_deleted {
        return Some(BpfProgramConditionType::Unloaded);
    }
    if !inputs.is_node_selected {
        return Some(BpfProgramConditionType::NotSelected);
    }
    if inputs.no_containers_on_node {
        return Some(BpfProgramConditionType::NoContainersOnNode);
    }
    match inputs.map_owner {
        MapOwnerStatus::NotFound => Some(BpfProgramConditionType::MapOwnerNotFound),
        MapOwnerStatus::NotLoaded => Some(BpfProgramConditionType::MapOwnerNotLoaded),
        _ => None,
    }
}

pub async fn reconcile_child(
    loader: &crate::loader::LoaderHandle,
    inputs: ChildInputs<'_>,
) -> Result<ChildOutcome, ReconcileError> {
    match inputs.live {
        None => reconcile_absent(loader, &inputs).await,
        Some(live) => reconcile_present(loader, &inputs, live).await,
    }
}

async fn reconcile_absent(
    loader: &crate::loader::LoaderHandle,
    inputs: &ChildInputs<'_>,
) -> Result<ChildOutcome, ReconcileError> {
    if let Some(condition) = terminal_gate(inputs) {
        debug!(?condition, "child not live, terminal gate short-circuits load");
        return Ok(ChildOutcome {
            condition,
            message: String::new(),
            kernel_id: None,
        });
    }

    do_load(loader, inputs).await
}

async fn reconcile_present(
    loader: &crate::loader::LoaderHandle,
    inputs: &ChildInputs<'_>,
    live: &LiveProgram,
) -> Result<ChildOutcome, ReconcileError> {
    if let Some(condition) = terminal_gate(inputs) {
        info!(?condition, kernel_id = live.kernel_id, "unloading child");
        return do_unload(loader, live.kernel_id, condition).await;
    }

    if requests_match(inputs.expected, live) {
        debug!(kernel_id = live.kernel_id, "child already matches live state");
        return Ok(ChildOutcome {
            condition: BpfProgramConditionType::Loaded,
            message: String::new(),
            kernel_id: Some(live.kernel_id),
        });
    }

    // Reload: unload must complete before load. If unload fails, no load
    // is attempted this reconcile.
    match loader.unload(live.kernel_id).await {
        Ok(()) => do_load(loader, inputs).await,
        Err(e) => {
            info!(error = %e, kernel_id = live.kernel_id, "unload failed during reload");
            Ok(ChildOutcome {
                condition: BpfProgramConditionType::NotUnloaded,
                message: e.to_string(),
                kernel_id: Some(live.kernel_id),
            })
        }
    }
}

async fn do_load(
    loader: &crate::loader::LoaderHandle,
    inputs: &ChildInputs<'_>,
) -> Result<ChildOutcome, ReconcileError> {
    match loader.load(inputs.expected, inputs.bpf_program_uid).await {
        Ok(kernel_id) => {
            info!(kernel_id, program = %inputs.expected.program_name, "loaded");
            Ok(ChildOutcome {
                condition: BpfProgramConditionType::Loaded,
                message: String::new(),
                kernel_id: Some(kernel_id),
            })
        }
        Err(ReconcileError::LoadRejected(status)) => Ok(ChildOutcome {
            condition: BpfProgramConditionType::NotLoaded,
            message: status.to_string(),
            kernel_id: None,
        }),
        Err(e) => Err(e),
    }
}

async fn do_unload(
    loader: &crate::loader::LoaderHandle,
    kernel_id: u32,
    terminal_condition: BpfProgramConditionType,
) -> Result<ChildOutcome, ReconcileError> {
    match loader.unload(kernel_id).await {
        Ok(()) => Ok(ChildOutcome {
            condition: terminal_condition,
            message: String::new(),
            kernel_id: None,
        }),
        Err(ReconcileError::UnloadRejected(status)) => Ok(ChildOutcome {
            condition: BpfProgramConditionType::NotUnloaded,
            message: status.to_string(),
            kernel_id: Some(kernel_id),
        }),
        Err(e) => Err(e),
    }
}

/// Diff rules between the expected request and the live program. The
/// fingerprint already folds in every field that matters here — program
/// type, function name, bytecode descriptor, global-data blob, map-owner
/// id, and the attach-info variant with all its scalar fields, ordered
/// `proceed-on` lists included.
fn requests_match(expected: &ExpectedLoad, live: &LiveProgram) -> bool {
    live.fingerprint() == Some(expected.fingerprint().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bpfman_agent_api::KernelProgramType;
    use std::collections::HashMap;

    fn expected() -> ExpectedLoad {
        ExpectedLoad {
            program_name: "x".to_string(),
            kernel_program_type: KernelProgramType::Xdp,
            bpf_function_name: "xdp_pass".to_string(),
            location: crate::loader::LoadLocation::File("/tmp/hello.o".to_string()),
            global_data: Default::default(),
            map_owner_id: None,
            attach: crate::loader::AttachInfo::Xdp {
                iface: "eth0".to_string(),
                priority: 0,
                proceed_on: vec![2, 31],
            },
        }
    }

    #[test]
    fn not_selected_beats_everything_when_no_live_program() {
        let exp = expected();
        let inputs = ChildInputs {
            bpf_program_uid: "uid-1",
            expected: &exp,
            live: None,
            is_node_selected: false,
            is_being_deleted: false,
            no_containers_on_node: false,
            map_owner: MapOwnerStatus::NotSet,
            current_id_annotation: None,
        };
        assert_matches!(terminal_gate(&inputs), Some(BpfProgramConditionType::NotSelected));
    }

    #[test]
    fn deletion_gate_wins_over_node_selection() {
        let exp = expected();
        let inputs = ChildInputs {
            bpf_program_uid: "uid-1",
            expected: &exp,
            live: None,
            is_node_selected: false,
            is_being_deleted: true,
            no_containers_on_node: false,
            map_owner: MapOwnerStatus::NotSet,
            current_id_annotation: None,
        };
        assert_matches!(terminal_gate(&inputs), Some(BpfProgramConditionType::Unloaded));
    }

    #[test]
    fn matching_live_program_reports_loaded_without_mutation() {
        let exp = expected();
        let mut metadata = HashMap::new();
        metadata.insert("uuid".to_string(), "uid-1".to_string());
        metadata.insert("fingerprint".to_string(), exp.fingerprint());
        let live = LiveProgram {
            kernel_id: 42,
            metadata,
            kernel_info: Default::default(),
        };
        assert!(requests_match(&exp, &live));
    }

    #[test]
    fn differing_fingerprint_is_not_a_match() {
        let exp = expected();
        let mut metadata = HashMap::new();
        metadata.insert("uuid".to_string(), "uid-1".to_string());
        metadata.insert("fingerprint".to_string(), "stale".to_string());
        let live = LiveProgram {
            kernel_id: 42,
            metadata,
            kernel_info: Default::default(),
        };
        assert!(!requests_match(&exp, &live));
    }
}
