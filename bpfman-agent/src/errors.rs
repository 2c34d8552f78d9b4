// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use bpfman_agent_api::ParseError;
use thiserror::Error;

/// Everything that can go wrong while reconciling a Program CR or its
/// BpfProgram children. `error_policy` inspects the variant to decide
/// whether to requeue (transient) or let the condition on status speak for
/// itself (logical).
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("missing required object key: {0}")]
    MissingObjectKey(&'static str),

    #[error("kube API error: {0}")]
    Kube(#[source] kube::Error),

    #[error("loader is unavailable: {0}")]
    LoaderUnavailable(#[source] tonic::Status),

    #[error("loader rejected the request: {0}")]
    LoadRejected(#[source] tonic::Status),

    #[error("loader rejected the unload request: {0}")]
    UnloadRejected(#[source] tonic::Status),

    #[error("failed to connect to the loader: {0}")]
    LoaderConnectFailed(#[source] tonic::transport::Error),

    #[error("failed to parse loader value: {0}")]
    Parse(#[from] ParseError),

    #[error("bytecode selector could not be resolved: {0}")]
    BytecodeSelectorError(String),

    #[error("no interfaces selected")]
    NoInterfacesSelected,

    #[error("could not resolve the node's primary interface: {0}")]
    PrimaryInterfaceResolutionFailed(String),

    #[error("container runtime lookup failed: {0}")]
    ContainerRuntimeError(String),

    #[error("map-owner selector matched more than one BpfProgram")]
    AmbiguousMapOwner,

    #[error("node {0} not found")]
    NodeNotFound(String),
}

impl ReconcileError {
    /// Whether this failure is transient and should be retried on a fixed
    /// interval, as opposed to a logical
    /// failure that is reflected purely through a condition write.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReconcileError::Kube(_)
                | ReconcileError::LoaderUnavailable(_)
                | ReconcileError::LoaderConnectFailed(_)
                | ReconcileError::AmbiguousMapOwner
                | ReconcileError::NodeNotFound(_)
        )
    }
}

impl From<kube::Error> for ReconcileError {
    fn from(value: kube::Error) -> Self {
        ReconcileError::Kube(value)
    }
}
