// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label carried by every agent-owned `BpfProgram`, naming its parent
/// Program CR.
pub const LABEL_OWNER: &str = "owner";
/// Label carried by every agent-owned `BpfProgram`, naming the node it was
/// materialised for.
pub const LABEL_HOST: &str = "host";
/// Label carried only by discovery-owned `BpfProgram` records.
pub const LABEL_DISCOVERED: &str = "discovered";

/// Annotation holding the resolved interface name for XDP/TC children.
pub const ANNOTATION_INTERFACE: &str = "bpfman.io/interface";
/// Annotation holding the resolved kernel or user function name for
/// Kprobe/Fentry/Fexit children.
pub const ANNOTATION_FUNCTION: &str = "bpfman.io/function";
/// Annotation holding the target binary path for Uprobe children.
pub const ANNOTATION_TARGET: &str = "bpfman.io/target";
/// Annotation holding the tracepoint name for Tracepoint children.
pub const ANNOTATION_TRACEPOINT: &str = "bpfman.io/tracepoint";
/// Annotation holding the resolved container PID for per-container Uprobe
/// children.
pub const ANNOTATION_CONTAINER_PID: &str = "bpfman.io/container-pid";
/// Annotation holding the kernel-assigned program id, written after the
/// first successful load.
pub const ANNOTATION_PROGRAM_ID: &str = "bpfman.io/id";
/// Marker annotation set on the single placeholder child a Uprobe Program
/// materialises when its container selector matches nothing on this node.
pub const ANNOTATION_NO_CONTAINERS_ON_NODE: &str = "bpfman.io/no-containers-on-node";

/// Discriminator used by the materialiser for the no-match Uprobe
/// placeholder child.
pub const DISCRIMINATOR_NO_CONTAINERS_ON_NODE: &str = "no-containers-on-node";

/// Discovery-synthesised kernel-info annotation keys.
pub mod discovery_annotations {
    pub const KERNEL_ID: &str = "bpfman.io/kernel-id";
    pub const NAME: &str = "bpfman.io/name";
    pub const PROGRAM_TYPE: &str = "bpfman.io/program-type";
    pub const LOADED_AT: &str = "bpfman.io/loaded-at";
    pub const TAG: &str = "bpfman.io/tag";
    pub const GPL_COMPATIBLE: &str = "bpfman.io/gpl-compatible";
    pub const MAP_IDS: &str = "bpfman.io/map-ids";
    pub const BTF_ID: &str = "bpfman.io/btf-id";
    pub const BYTES_XLATED: &str = "bpfman.io/bytes-xlated";
    pub const JITED: &str = "bpfman.io/jited";
    pub const BYTES_JITED: &str = "bpfman.io/bytes-jited";
    pub const BYTES_MEMLOCK: &str = "bpfman.io/bytes-memlock";
    pub const VERIFIED_INSNS: &str = "bpfman.io/verified-insns";
}

/// One of this kind's finalizer strings. Every kind owns a distinct
/// finalizer namespace — no two kinds may
/// share a string, so each accessor below is a separate constant rather
/// than a shared format.
pub mod finalizers {
    pub const XDP_PROGRAM: &str = "bpfman.io/xdpprogram-finalizer";
    pub const TC_PROGRAM: &str = "bpfman.io/tcprogram-finalizer";
    pub const TRACEPOINT_PROGRAM: &str = "bpfman.io/tracepointprogram-finalizer";
    pub const KPROBE_PROGRAM: &str = "bpfman.io/kprobeprogram-finalizer";
    pub const UPROBE_PROGRAM: &str = "bpfman.io/uprobeprogram-finalizer";
    pub const FENTRY_PROGRAM: &str = "bpfman.io/fentryprogram-finalizer";
    pub const FEXIT_PROGRAM: &str = "bpfman.io/fexitprogram-finalizer";
}

/// Where the eBPF bytecode for a Program comes from. Modelled
/// as a tagged enum, not two optional fields, so the CRD schema itself
/// rejects a selector naming both or neither.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BytecodeSelector {
    Image {
        image_url: String,
        #[serde(default)]
        image_pull_policy: ImagePullPolicy,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_pull_secret: Option<String>,
    },
    Path(String),
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ImagePullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

/// Which network interfaces an XDP/TC Program attaches on. The legacy
/// single-`Interface` string form is intentionally not represented here.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceSelector {
    Interfaces(Vec<String>),
    PrimaryNodeInterface(bool),
}

/// Selects pods (and, within them, containers) a Uprobe Program should
/// attach inside.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSelector {
    pub pod_selector: LabelSelector,
    /// Empty means "all containers in the selected pods".
    #[serde(default)]
    pub container_names: Vec<String>,
}

/// Fields shared by every Program kind.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BpfProgramCommon {
    pub bytecode: BytecodeSelector,
    pub node_selector: LabelSelector,
    pub bpf_function_name: String,
    #[serde(default)]
    pub global_data: std::collections::BTreeMap<String, Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_owner_selector: Option<LabelSelector>,
}

/// Sanitises a discriminator fragment for use in a Kubernetes object name:
/// lower-cases nothing (names are expected to already be DNS-safe apart
/// from separators), but replaces every character invalid in a cluster
/// object name — in particular `/` and `_` — with `-`.
pub fn sanitize_name_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Builds the deterministic `BpfProgram` object name for one attachment
/// point: `<ownerName>-<nodeName>-<discriminator>`.
pub fn bpf_program_name(owner_name: &str, node_name: &str, discriminator: &str) -> String {
    format!(
        "{}-{}-{}",
        sanitize_name_component(owner_name),
        sanitize_name_component(node_name),
        sanitize_name_component(discriminator)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_slashes_and_underscores_to_dashes() {
        assert_eq!(sanitize_name_component("eth0"), "eth0");
        assert_eq!(sanitize_name_component("do_something"), "do-something");
        assert_eq!(
            sanitize_name_component("/usr/bin/bash"),
            "-usr-bin-bash"
        );
    }

    #[test]
    fn builds_deterministic_child_name() {
        assert_eq!(
            bpf_program_name("my-xdp", "node-a", "eth0"),
            "my-xdp-node-a-eth0"
        );
    }

    #[test]
    fn container_discriminator_uses_pod_dash_container() {
        let discriminator = format!("{}-{}", "p1", "c1");
        assert_eq!(
            bpf_program_name("up", "nodeA", &discriminator),
            "up-nodeA-p1-c1"
        );
    }
}
