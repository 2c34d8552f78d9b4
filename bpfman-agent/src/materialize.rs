// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Child materialiser: computes the expected set of
//! BpfProgram children for one Program CR on this node.

use std::collections::BTreeMap;

use bpfman_agent_api::{KernelProgramType, TcProceedOn, XdpProceedOn};
use bpfman_agent_crd::common::{self, BpfProgramCommon};

use crate::{
    introspection::ContainerMatch,
    loader::{AttachInfo, ExpectedLoad, LoadLocation},
};

/// One expected attachment point: a BpfProgram name, the annotations that
/// should describe it, and the load request it should carry when the
/// per-child reconciler decides it needs to be (re)loaded.
#[derive(Clone, Debug)]
pub struct ExpectedChild {
    pub discriminator: String,
    pub annotations: BTreeMap<String, String>,
    pub no_containers_on_node: bool,
    pub load: ExpectedLoad,
}

pub const DISCRIMINATOR_NO_CONTAINERS: &str = common::DISCRIMINATOR_NO_CONTAINERS_ON_NODE;

fn base_load(
    program_name: &str,
    kernel_program_type: KernelProgramType,
    common: &BpfProgramCommon,
    location: LoadLocation,
    map_owner_id: Option<u32>,
    attach: AttachInfo,
) -> ExpectedLoad {
    ExpectedLoad {
        program_name: program_name.to_string(),
        kernel_program_type,
        bpf_function_name: common.bpf_function_name.clone(),
        location,
        global_data: common.global_data.clone(),
        map_owner_id,
        attach,
    }
}

/// XDP and TC share everything but the attach-info shape and kernel type.
#[allow(clippy::too_many_arguments)]
pub fn materialize_xdp(
    program_name: &str,
    common: &BpfProgramCommon,
    location: LoadLocation,
    map_owner_id: Option<u32>,
    interfaces: &[String],
    priority: u32,
    proceed_on: &XdpProceedOn,
) -> Vec<ExpectedChild> {
    interfaces
        .iter()
        .map(|iface| {
            let discriminator = common::sanitize_name_component(iface);
            let mut annotations = BTreeMap::new();
            annotations.insert(common::ANNOTATION_INTERFACE.to_string(), iface.clone());
            ExpectedChild {
                discriminator,
                annotations,
                no_containers_on_node: false,
                load: base_load(
                    program_name,
                    KernelProgramType::Xdp,
                    common,
                    location.clone(),
                    map_owner_id,
                    AttachInfo::Xdp {
                        iface: iface.clone(),
                        priority: priority as i32,
                        proceed_on: proceed_on.as_i32_vec(),
                    },
                ),
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub fn materialize_tc(
    program_name: &str,
    common: &BpfProgramCommon,
    location: LoadLocation,
    map_owner_id: Option<u32>,
    interfaces: &[String],
    priority: u32,
    direction: &str,
    proceed_on: &TcProceedOn,
) -> Vec<ExpectedChild> {
    interfaces
        .iter()
        .map(|iface| {
            let discriminator = common::sanitize_name_component(iface);
            let mut annotations = BTreeMap::new();
            annotations.insert(common::ANNOTATION_INTERFACE.to_string(), iface.clone());
            ExpectedChild {
                discriminator,
                annotations,
                no_containers_on_node: false,
                load: base_load(
                    program_name,
                    KernelProgramType::Tc,
                    common,
                    location.clone(),
                    map_owner_id,
                    AttachInfo::Tc {
                        iface: iface.clone(),
                        priority: priority as i32,
                        direction: direction.to_string(),
                        proceed_on: proceed_on.as_i32_vec(),
                    },
                ),
            }
        })
        .collect()
}

pub fn materialize_tracepoint(
    program_name: &str,
    common: &BpfProgramCommon,
    location: LoadLocation,
    map_owner_id: Option<u32>,
    names: &[String],
) -> Vec<ExpectedChild> {
    names
        .iter()
        .map(|name| {
            let discriminator = common::sanitize_name_component(name);
            let mut annotations = BTreeMap::new();
            annotations.insert(common::ANNOTATION_TRACEPOINT.to_string(), name.clone());
            ExpectedChild {
                discriminator,
                annotations,
                no_containers_on_node: false,
                load: base_load(
                    program_name,
                    KernelProgramType::Tracepoint,
                    common,
                    location.clone(),
                    map_owner_id,
                    AttachInfo::Tracepoint {
                        tracepoint: name.clone(),
                    },
                ),
            }
        })
        .collect()
}

pub fn materialize_kprobe(
    program_name: &str,
    common: &BpfProgramCommon,
    location: LoadLocation,
    map_owner_id: Option<u32>,
    fn_names: &[String],
    offset: u64,
    retprobe: bool,
) -> Vec<ExpectedChild> {
    fn_names
        .iter()
        .map(|fn_name| {
            let discriminator = common::sanitize_name_component(fn_name);
            let mut annotations = BTreeMap::new();
            annotations.insert(common::ANNOTATION_FUNCTION.to_string(), fn_name.clone());
            ExpectedChild {
                discriminator,
                annotations,
                no_containers_on_node: false,
                load: base_load(
                    program_name,
                    KernelProgramType::Kprobe,
                    common,
                    location.clone(),
                    map_owner_id,
                    AttachInfo::Kprobe {
                        fn_name: fn_name.clone(),
                        offset,
                        retprobe,
                        container_pid: None,
                    },
                ),
            }
        })
        .collect()
}

pub fn materialize_fentry(
    program_name: &str,
    common: &BpfProgramCommon,
    location: LoadLocation,
    map_owner_id: Option<u32>,
    fn_name: &str,
) -> Vec<ExpectedChild> {
    let discriminator = common::sanitize_name_component(fn_name);
    let mut annotations = BTreeMap::new();
    annotations.insert(common::ANNOTATION_FUNCTION.to_string(), fn_name.to_string());
    vec![ExpectedChild {
        discriminator,
        annotations,
        no_containers_on_node: false,
        load: base_load(
            program_name,
            KernelProgramType::Tracing,
            common,
            location,
            map_owner_id,
            AttachInfo::Fentry {
                fn_name: fn_name.to_string(),
            },
        ),
    }]
}

pub fn materialize_fexit(
    program_name: &str,
    common: &BpfProgramCommon,
    location: LoadLocation,
    map_owner_id: Option<u32>,
    fn_name: &str,
) -> Vec<ExpectedChild> {
    let discriminator = common::sanitize_name_component(fn_name);
    let mut annotations = BTreeMap::new();
    annotations.insert(common::ANNOTATION_FUNCTION.to_string(), fn_name.to_string());
    vec![ExpectedChild {
        discriminator,
        annotations,
        no_containers_on_node: false,
        load: base_load(
            program_name,
            KernelProgramType::Tracing,
            common,
            location,
            map_owner_id,
            AttachInfo::Fexit {
                fn_name: fn_name.to_string(),
            },
        ),
    }]
}

/// Uprobe is the one kind whose expected set depends on an externally
/// resolved list (container matches), so it carries its own function.
#[allow(clippy::too_many_arguments)]
pub fn materialize_uprobe(
    program_name: &str,
    common: &BpfProgramCommon,
    location: LoadLocation,
    map_owner_id: Option<u32>,
    fn_names: &[String],
    target: &str,
    offset: u64,
    retprobe: bool,
    has_container_selector: bool,
    containers: &[ContainerMatch],
) -> Vec<ExpectedChild> {
    if !has_container_selector {
        return fn_names
            .iter()
            .map(|fn_name| uprobe_child(program_name, common, &location, map_owner_id, fn_name, target, offset, retprobe, None))
            .collect();
    }

    if containers.is_empty() {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            common::ANNOTATION_NO_CONTAINERS_ON_NODE.to_string(),
            "true".to_string(),
        );
        let fn_name = fn_names.first().cloned().unwrap_or_default();
        return vec![ExpectedChild {
            discriminator: DISCRIMINATOR_NO_CONTAINERS.to_string(),
            annotations,
            no_containers_on_node: true,
            load: base_load(
                program_name,
                KernelProgramType::Kprobe,
                common,
                location,
                map_owner_id,
                AttachInfo::Uprobe {
                    fn_name,
                    offset,
                    target: target.to_string(),
                    retprobe,
                    container_pid: None,
                },
            ),
        }];
    }

    fn_names
        .iter()
        .flat_map(|fn_name| {
            containers.iter().map(move |c| {
                uprobe_child(
                    program_name,
                    common,
                    &location,
                    map_owner_id,
                    fn_name,
                    target,
                    offset,
                    retprobe,
                    Some(c),
                )
            })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn uprobe_child(
    program_name: &str,
    common: &BpfProgramCommon,
    location: &LoadLocation,
    map_owner_id: Option<u32>,
    fn_name: &str,
    target: &str,
    offset: u64,
    retprobe: bool,
    container: Option<&ContainerMatch>,
) -> ExpectedChild {
    let mut annotations = BTreeMap::new();
    annotations.insert(common::ANNOTATION_TARGET.to_string(), target.to_string());

    let discriminator = match container {
        Some(c) => {
            annotations.insert(common::ANNOTATION_CONTAINER_PID.to_string(), c.pid.to_string());
            common::sanitize_name_component(&format!("{}-{}", c.pod_name, c.container_name))
        }
        None => common::sanitize_name_component(target),
    };

    ExpectedChild {
        discriminator,
        annotations,
        no_containers_on_node: false,
        load: base_load(
            program_name,
            KernelProgramType::Kprobe,
            common,
            location.clone(),
            map_owner_id,
            AttachInfo::Uprobe {
                fn_name: fn_name.to_string(),
                offset,
                target: target.to_string(),
                retprobe,
                container_pid: container.map(|c| c.pid),
            },
        ),
    }
}

/// Computes the BpfProgram object name for an expected child.
pub fn child_name(owner_name: &str, node_name: &str, child: &ExpectedChild) -> String {
    common::bpf_program_name(owner_name, node_name, &child.discriminator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpfman_agent_crd::common::{BytecodeSelector, ImagePullPolicy};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

    fn common_block() -> BpfProgramCommon {
        BpfProgramCommon {
            bytecode: BytecodeSelector::Path("/tmp/hello.o".to_string()),
            node_selector: LabelSelector::default(),
            bpf_function_name: "xdp_pass".to_string(),
            global_data: Default::default(),
            map_owner_selector: None,
        }
    }

    #[test]
    fn xdp_yields_one_child_per_interface() {
        let proceed_on = XdpProceedOn::from_strings(["pass".to_string()]).unwrap();
        let children = materialize_xdp(
            "x",
            &common_block(),
            LoadLocation::File("/tmp/hello.o".to_string()),
            None,
            &["eth0".to_string(), "eth1".to_string()],
            0,
            &proceed_on,
        );
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].discriminator, "eth0");
        assert_eq!(children[1].discriminator, "eth1");
    }

    #[test]
    fn uprobe_with_container_selector_and_no_matches_yields_marker_child() {
        let children = materialize_uprobe(
            "up",
            &common_block(),
            LoadLocation::File("/tmp/hello.o".to_string()),
            None,
            &["main".to_string()],
            "/usr/bin/bash",
            0,
            false,
            true,
            &[],
        );
        assert_eq!(children.len(), 1);
        assert!(children[0].no_containers_on_node);
        assert_eq!(children[0].discriminator, DISCRIMINATOR_NO_CONTAINERS);
    }

    #[test]
    fn uprobe_with_two_matching_containers_yields_two_children() {
        let containers = vec![
            ContainerMatch {
                pod_name: "p1".to_string(),
                container_name: "c1".to_string(),
                pid: 1001,
            },
            ContainerMatch {
                pod_name: "p2".to_string(),
                container_name: "c1".to_string(),
                pid: 2002,
            },
        ];
        let children = materialize_uprobe(
            "up",
            &common_block(),
            LoadLocation::File("/tmp/hello.o".to_string()),
            None,
            &["main".to_string()],
            "libc",
            0,
            false,
            true,
            &containers,
        );
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].discriminator, "p1-c1");
        assert_eq!(children[0].annotations.get(common::ANNOTATION_CONTAINER_PID).unwrap(), "1001");
        assert_eq!(children[1].discriminator, "p2-c1");
        assert_eq!(children[1].annotations.get(common::ANNOTATION_CONTAINER_PID).unwrap(), "2002");
    }

    #[test]
    fn uprobe_without_container_selector_ignores_container_pid() {
        let children = materialize_uprobe(
            "up",
            &common_block(),
            LoadLocation::File("/tmp/hello.o".to_string()),
            None,
            &["main".to_string()],
            "/usr/bin/bash",
            0,
            false,
            false,
            &[],
        );
        assert_eq!(children.len(), 1);
        assert!(!children[0].annotations.contains_key(common::ANNOTATION_CONTAINER_PID));
    }

    #[test]
    fn child_name_joins_owner_node_and_discriminator() {
        let common = common_block();
        let proceed_on = XdpProceedOn::from_strings([]).unwrap();
        let children = materialize_xdp(
            "my-xdp",
            &common,
            LoadLocation::File("/tmp/hello.o".to_string()),
            None,
            &["eth0".to_string()],
            0,
            &proceed_on,
        );
        assert_eq!(child_name("my-xdp", "node-a", &children[0]), "my-xdp-node-a-eth0");
        let _ = ImagePullPolicy::IfNotPresent;
    }
}
