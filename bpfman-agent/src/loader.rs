// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Thin wrapper over the loader's gRPC surface.
//!
//! The loader's `List`/`Get` RPCs only ever echo back kernel-assigned
//! bookkeeping (`KernelProgramInfo`) and whatever metadata the agent itself
//! attached at load time — they do not echo the original attach-info or
//! bytecode descriptor. So that the per-child reconciler can still
//! answer "does the live program match what I'd load now", this module has
//! the agent stash a `fingerprint` of the full expected request alongside
//! `uuid`/`program-name` in that same metadata map at load time, and diffs
//! against it on every subsequent reconcile instead of against fields the
//! wire does not carry.

use std::{
    collections::{BTreeMap, HashMap},
    hash::{Hash, Hasher},
    path::Path,
};

use bpfman_agent_api::{v1, KernelProgramType, METADATA_PROGRAM_NAME, METADATA_UUID};
use tonic::transport::{Channel, Endpoint, Uri};
use tracing::debug;

use crate::errors::ReconcileError;

const METADATA_FINGERPRINT: &str = "fingerprint";

/// Where the eBPF bytecode to load comes from, already resolved by the
/// bytecode resolver into something the loader accepts directly.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadLocation {
    Image {
        url: String,
        pull_policy: bpfman_agent_api::ImagePullPolicy,
        username: Option<String>,
        password: Option<String>,
    },
    File(String),
}

/// The attach-info union the loader expects, in the agent's own
/// vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub enum AttachInfo {
    Xdp {
        iface: String,
        priority: i32,
        proceed_on: Vec<i32>,
    },
    Tc {
        iface: String,
        priority: i32,
        direction: String,
        proceed_on: Vec<i32>,
    },
    Tracepoint {
        tracepoint: String,
    },
    Kprobe {
        fn_name: String,
        offset: u64,
        retprobe: bool,
        container_pid: Option<i64>,
    },
    Uprobe {
        fn_name: String,
        offset: u64,
        target: String,
        retprobe: bool,
        container_pid: Option<i64>,
    },
    Fentry {
        fn_name: String,
    },
    Fexit {
        fn_name: String,
    },
}

/// A fully-resolved request the per-child reconciler may submit to
/// the loader. One of these is built per expected BpfProgram child by the
/// materialiser, independent of whether it ever gets submitted.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpectedLoad {
    pub program_name: String,
    pub kernel_program_type: KernelProgramType,
    pub bpf_function_name: String,
    pub location: LoadLocation,
    pub global_data: BTreeMap<String, Vec<u8>>,
    pub map_owner_id: Option<u32>,
    pub attach: AttachInfo,
}

impl ExpectedLoad {
    /// A stable fingerprint of every field the per-child diff cares about.
    /// Two `ExpectedLoad`s that would reconcile to the "same" live program
    /// always hash to the same value.
    pub fn fingerprint(&self) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.program_name.hash(&mut hasher);
        u32::from(self.kernel_program_type).hash(&mut hasher);
        self.bpf_function_name.hash(&mut hasher);
        format!("{:?}", self.location).hash(&mut hasher);
        for (k, v) in &self.global_data {
            k.hash(&mut hasher);
            v.hash(&mut hasher);
        }
        self.map_owner_id.hash(&mut hasher);
        format!("{:?}", self.attach).hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    fn to_wire(&self, uid: &str) -> v1::LoadRequest {
        let mut metadata = HashMap::new();
        metadata.insert(METADATA_UUID.to_string(), uid.to_string());
        metadata.insert(METADATA_PROGRAM_NAME.to_string(), self.program_name.clone());
        metadata.insert(METADATA_FINGERPRINT.to_string(), self.fingerprint());

        let location = match &self.location {
            LoadLocation::Image {
                url,
                pull_policy,
                username,
                password,
            } => v1::load_request_common::Location::Image(v1::BytecodeImage {
                url: url.clone(),
                image_pull_policy: i32::from(*pull_policy),
                username: username.clone(),
                password: password.clone(),
            }),
            LoadLocation::File(path) => v1::load_request_common::Location::File(path.clone()),
        };

        let common = v1::LoadRequestCommon {
            program_name: self.bpf_function_name.clone(),
            program_type: u32::from(self.kernel_program_type),
            global_data: self.global_data.clone().into_iter().collect(),
            metadata,
            map_owner_id: self.map_owner_id,
            location: Some(location),
        };

        let attach_info = match &self.attach {
            AttachInfo::Xdp {
                iface,
                priority,
                proceed_on,
            } => v1::load_request::AttachInfo::Xdp(v1::XdpAttachInfo {
                iface: iface.clone(),
                priority: *priority,
                proceed_on: proceed_on.clone(),
            }),
            AttachInfo::Tc {
                iface,
                priority,
                direction,
                proceed_on,
            } => v1::load_request::AttachInfo::Tc(v1::TcAttachInfo {
                iface: iface.clone(),
                priority: *priority,
                direction: direction.clone(),
                proceed_on: proceed_on.clone(),
            }),
            AttachInfo::Tracepoint { tracepoint } => {
                v1::load_request::AttachInfo::Tracepoint(v1::TracepointAttachInfo {
                    tracepoint: tracepoint.clone(),
                })
            }
            AttachInfo::Kprobe {
                fn_name,
                offset,
                retprobe,
                container_pid,
            } => v1::load_request::AttachInfo::Kprobe(v1::KprobeAttachInfo {
                fn_name: fn_name.clone(),
                offset: *offset,
                retprobe: *retprobe,
                namespace: None,
                container_pid: *container_pid,
            }),
            AttachInfo::Uprobe {
                fn_name,
                offset,
                target,
                retprobe,
                container_pid,
            } => v1::load_request::AttachInfo::Uprobe(v1::UprobeAttachInfo {
                fn_name: fn_name.clone(),
                offset: *offset,
                target: target.clone(),
                retprobe: *retprobe,
                namespace: None,
                container_pid: *container_pid,
            }),
            AttachInfo::Fentry { fn_name } => {
                v1::load_request::AttachInfo::Fentry(v1::FentryAttachInfo {
                    fn_name: fn_name.clone(),
                })
            }
            AttachInfo::Fexit { fn_name } => {
                v1::load_request::AttachInfo::Fexit(v1::FexitAttachInfo {
                    fn_name: fn_name.clone(),
                })
            }
        };

        v1::LoadRequest {
            common: Some(common),
            attach_info: Some(attach_info),
        }
    }
}

/// A program the loader currently has loaded, as surfaced by `List`/`Get`.
/// Carries the full kernel-info block even though the per-child
/// reconciler only ever consults `kernel_id`/`metadata` — discovery
/// projects the rest into a `BpfProgram`'s annotations.
#[derive(Clone, Debug)]
pub struct LiveProgram {
    pub kernel_id: u32,
    pub metadata: HashMap<String, String>,
    pub kernel_info: v1::KernelProgramInfo,
}

impl LiveProgram {
    pub fn fingerprint(&self) -> Option<&str> {
        self.metadata.get(METADATA_FINGERPRINT).map(String::as_str)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.metadata.get(METADATA_UUID).map(String::as_str)
    }
}

fn from_list_result(result: v1::list_response::ListResult) -> Option<LiveProgram> {
    let kernel_info = result.kernel_info?;
    let metadata = result.info.map(|i| i.metadata).unwrap_or_default();
    Some(LiveProgram {
        kernel_id: kernel_info.id,
        metadata,
        kernel_info,
    })
}

#[derive(Clone)]
pub struct LoaderHandle {
    client: v1::loader_client::LoaderClient<Channel>,
}

impl LoaderHandle {
    /// Connects to the loader over the local UNIX socket at `socket_path`.
    pub async fn connect(socket_path: &Path) -> Result<Self, ReconcileError> {
        let socket_path = socket_path.to_path_buf();
        let channel = Endpoint::try_from("http://[::]:50051")
            .map_err(ReconcileError::LoaderConnectFailed)?
            .connect_with_connector(tower::service_fn(move |_: Uri| {
                let socket_path = socket_path.clone();
                async move { tokio::net::UnixStream::connect(socket_path).await }
            }))
            .await
            .map_err(ReconcileError::LoaderConnectFailed)?;
        Ok(LoaderHandle {
            client: v1::loader_client::LoaderClient::new(channel),
        })
    }

    pub async fn load(&self, expected: &ExpectedLoad, uid: &str) -> Result<u32, ReconcileError> {
        let request = expected.to_wire(uid);
        debug!(program = %expected.program_name, "sending load request to loader");
        let response = self
            .client
            .clone()
            .load(request)
            .await
            .map_err(classify_status)?
            .into_inner();
        let id = response
            .kernel_info
            .map(|i| i.id)
            .ok_or(ReconcileError::LoadRejected(tonic::Status::internal(
                "load response carried no kernel_info",
            )))?;
        Ok(id)
    }

    pub async fn unload(&self, kernel_id: u32) -> Result<(), ReconcileError> {
        self.client
            .clone()
            .unload(v1::UnloadRequest { id: kernel_id })
            .await
            .map_err(classify_unload_status)?;
        Ok(())
    }

    /// Lists every loader program of the given kernel type that carries
    /// `uuid` metadata, keyed by that UID.
    pub async fn list_by_program_type(
        &self,
        kernel_type: KernelProgramType,
    ) -> Result<HashMap<String, LiveProgram>, ReconcileError> {
        let request = v1::ListRequest {
            program_type: Some(u32::from(kernel_type)),
            bpfman_programs_only: Some(true),
            match_metadata: HashMap::new(),
        };
        let response = self
            .client
            .clone()
            .list(request)
            .await
            .map_err(classify_status)?
            .into_inner();

        Ok(response
            .results
            .into_iter()
            .filter_map(from_list_result)
            .filter_map(|p| p.uuid().map(str::to_string).map(|uid| (uid, p)))
            .collect())
    }

    /// Lists every loader program regardless of ownership, for the
    /// discovery reconciler's use.
    pub async fn list_all(&self) -> Result<Vec<LiveProgram>, ReconcileError> {
        let request = v1::ListRequest {
            program_type: None,
            bpfman_programs_only: Some(false),
            match_metadata: HashMap::new(),
        };
        let response = self
            .client
            .clone()
            .list(request)
            .await
            .map_err(classify_status)?
            .into_inner();
        Ok(response.results.into_iter().filter_map(from_list_result).collect())
    }

    /// Resolves a loader program by the BpfProgram UID it was loaded under.
    pub async fn get_by_uid(&self, uid: &str) -> Result<Option<LiveProgram>, ReconcileError> {
        let mut match_metadata = HashMap::new();
        match_metadata.insert(METADATA_UUID.to_string(), uid.to_string());
        let request = v1::ListRequest {
            program_type: None,
            bpfman_programs_only: Some(true),
            match_metadata,
        };
        let response = self
            .client
            .clone()
            .list(request)
            .await
            .map_err(classify_status)?
            .into_inner();
        Ok(response.results.into_iter().filter_map(from_list_result).next())
    }
}

fn classify_status(status: tonic::Status) -> ReconcileError {
    use tonic::Code;
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
            ReconcileError::LoaderUnavailable(status)
        }
        _ => ReconcileError::LoadRejected(status),
    }
}

fn classify_unload_status(status: tonic::Status) -> ReconcileError {
    use tonic::Code;
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
            ReconcileError::LoaderUnavailable(status)
        }
        _ => ReconcileError::UnloadRejected(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(priority: i32) -> ExpectedLoad {
        ExpectedLoad {
            program_name: "my-xdp".to_string(),
            kernel_program_type: KernelProgramType::Xdp,
            bpf_function_name: "xdp_pass".to_string(),
            location: LoadLocation::File("/tmp/hello.o".to_string()),
            global_data: BTreeMap::new(),
            map_owner_id: None,
            attach: AttachInfo::Xdp {
                iface: "eth0".to_string(),
                priority,
                proceed_on: vec![2, 31],
            },
        }
    }

    #[test]
    fn fingerprint_is_stable_for_identical_requests() {
        assert_eq!(sample(0).fingerprint(), sample(0).fingerprint());
    }

    #[test]
    fn fingerprint_changes_when_a_scalar_field_changes() {
        assert_ne!(sample(0).fingerprint(), sample(1).fingerprint());
    }
}
