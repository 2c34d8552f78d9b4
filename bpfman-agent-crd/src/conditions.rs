// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

/// The condition taxonomy a `BpfProgram` may carry. `None` is the
/// internal sentinel used before the first reconcile writes a real
/// condition and is never itself written to status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BpfProgramConditionType {
    Loaded,
    NotLoaded,
    Unloaded,
    NotUnloaded,
    NotSelected,
    NoContainersOnNode,
    MapOwnerNotFound,
    MapOwnerNotLoaded,
    BytecodeSelectorError,
    None,
}

impl BpfProgramConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BpfProgramConditionType::Loaded => "Loaded",
            BpfProgramConditionType::NotLoaded => "NotLoaded",
            BpfProgramConditionType::Unloaded => "Unloaded",
            BpfProgramConditionType::NotUnloaded => "NotUnloaded",
            BpfProgramConditionType::NotSelected => "NotSelected",
            BpfProgramConditionType::NoContainersOnNode => "NoContainersOnNode",
            BpfProgramConditionType::MapOwnerNotFound => "MapOwnerNotFound",
            BpfProgramConditionType::MapOwnerNotLoaded => "MapOwnerNotLoaded",
            BpfProgramConditionType::BytecodeSelectorError => "BytecodeSelectorError",
            BpfProgramConditionType::None => "None",
        }
    }

    /// Whether this condition represents a successfully-loaded program.
    pub fn is_loaded(&self) -> bool {
        matches!(self, BpfProgramConditionType::Loaded)
    }

    /// Terminal-non-Loaded conditions short-circuit the create/update flow:
    /// once one of these is observed, the orchestrator writes status and
    /// returns without touching the kernel-id annotation.
    pub fn is_terminal_non_loaded(&self) -> bool {
        matches!(
            self,
            BpfProgramConditionType::NotSelected
                | BpfProgramConditionType::MapOwnerNotFound
                | BpfProgramConditionType::MapOwnerNotLoaded
                | BpfProgramConditionType::NoContainersOnNode
        )
    }
}

/// Builds the single `Condition` that should replace whatever a
/// `BpfProgram`'s status currently holds. `message` is a short human-
/// readable supplement; `reason` mirrors the condition type itself, as the
/// legacy implementation this is grounded on does not carry a distinct
/// machine-readable reason separate from its type.
pub fn build_condition(
    condition_type: BpfProgramConditionType,
    message: impl Into<String>,
    now: Time,
) -> Condition {
    Condition {
        type_: condition_type.as_str().to_string(),
        status: if condition_type.is_loaded() {
            "True".to_string()
        } else {
            "False".to_string()
        },
        observed_generation: None,
        last_transition_time: now,
        reason: condition_type.as_str().to_string(),
        message: message.into(),
    }
}

/// Collapses a condition list down to a single entry. Any prior entries
/// beyond the most recent write are dropped; this is called on every status
/// write, not only when corruption is suspected, so the invariant holds
/// unconditionally.
pub fn collapse_to_single(conditions: &mut Vec<Condition>, new_condition: Condition) {
    conditions.clear();
    conditions.push(new_condition);
}

/// Reads the current (and, by invariant, only) condition type off a status
/// conditions list.
pub fn current_condition_type(conditions: &[Condition]) -> Option<&str> {
    conditions.first().map(|c| c.type_.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Time {
        Time(chrono::DateTime::from_timestamp(0, 0).unwrap())
    }

    #[test]
    fn collapse_truncates_multiple_entries() {
        let mut conditions = vec![
            build_condition(BpfProgramConditionType::NotLoaded, "first", now()),
            build_condition(BpfProgramConditionType::NotSelected, "second", now()),
        ];
        let fresh = build_condition(BpfProgramConditionType::Loaded, "third", now());
        collapse_to_single(&mut conditions, fresh);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].type_, "Loaded");
    }

    #[test]
    fn loaded_status_is_true_all_others_false() {
        let loaded = build_condition(BpfProgramConditionType::Loaded, "", now());
        assert_eq!(loaded.status, "True");
        let not_selected = build_condition(BpfProgramConditionType::NotSelected, "", now());
        assert_eq!(not_selected.status, "False");
    }

    #[test]
    fn terminal_non_loaded_set_matches_spec_4_8() {
        assert!(BpfProgramConditionType::NotSelected.is_terminal_non_loaded());
        assert!(BpfProgramConditionType::MapOwnerNotFound.is_terminal_non_loaded());
        assert!(BpfProgramConditionType::MapOwnerNotLoaded.is_terminal_non_loaded());
        assert!(BpfProgramConditionType::NoContainersOnNode.is_terminal_non_loaded());
        assert!(!BpfProgramConditionType::Loaded.is_terminal_non_loaded());
        assert!(!BpfProgramConditionType::NotLoaded.is_terminal_non_loaded());
    }
}
