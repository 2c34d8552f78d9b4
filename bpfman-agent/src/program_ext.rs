// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Binds each of the seven Program kinds to the shared materialiser so the
//! orchestrator can drive all of them through one generic reconcile
//! function instead of seven duplicated ones.

use bpfman_agent_api::{TcProceedOn, XdpProceedOn};
use bpfman_agent_crd::{
    common::{BpfProgramCommon, ContainerSelector, InterfaceSelector},
    program::{
        FentryProgram, FexitProgram, KprobeProgram, ProgramKind, TcDirection, TcProgram,
        TracepointProgram, UprobeProgram, XdpProgram,
    },
};

use crate::{
    errors::ReconcileError,
    introspection::ContainerMatch,
    loader::LoadLocation,
    materialize::{
        materialize_fentry, materialize_fexit, materialize_kprobe, materialize_tc,
        materialize_tracepoint, materialize_uprobe, materialize_xdp, ExpectedChild,
    },
};

/// Implemented once per Program kind. Everything the orchestrator needs
/// beyond `BpfProgramCommon` funnels through this trait so the orchestrator
/// never branches on kind itself.
pub trait ReconcilableProgram:
    kube::Resource<DynamicType = ()> + Clone + std::fmt::Debug + Send + Sync + 'static
{
    fn kind_enum() -> ProgramKind;
    fn common(&self) -> &BpfProgramCommon;

    fn interface_selector(&self) -> Option<&InterfaceSelector> {
        None
    }

    fn container_selector(&self) -> Option<&ContainerSelector> {
        None
    }

    fn materialize(
        &self,
        program_name: &str,
        location: LoadLocation,
        map_owner_id: Option<u32>,
        interfaces: &[String],
        containers: &[ContainerMatch],
    ) -> Result<Vec<ExpectedChild>, ReconcileError>;
}

impl ReconcilableProgram for XdpProgram {
    fn kind_enum() -> ProgramKind {
        ProgramKind::Xdp
    }

    fn common(&self) -> &BpfProgramCommon {
        &self.spec.common
    }

    fn interface_selector(&self) -> Option<&InterfaceSelector> {
        Some(&self.spec.interface_selector)
    }

    fn materialize(
        &self,
        program_name: &str,
        location: LoadLocation,
        map_owner_id: Option<u32>,
        interfaces: &[String],
        _containers: &[ContainerMatch],
    ) -> Result<Vec<ExpectedChild>, ReconcileError> {
        let proceed_on = XdpProceedOn::from_strings(&self.spec.proceed_on)?;
        Ok(materialize_xdp(
            program_name,
            self.common(),
            location,
            map_owner_id,
            interfaces,
            self.spec.priority,
            &proceed_on,
        ))
    }
}

impl ReconcilableProgram for TcProgram {
    fn kind_enum() -> ProgramKind {
        ProgramKind::Tc
    }

    fn common(&self) -> &BpfProgramCommon {
        &self.spec.common
    }

    fn interface_selector(&self) -> Option<&InterfaceSelector> {
        Some(&self.spec.interface_selector)
    }

    fn materialize(
        &self,
        program_name: &str,
        location: LoadLocation,
        map_owner_id: Option<u32>,
        interfaces: &[String],
        _containers: &[ContainerMatch],
    ) -> Result<Vec<ExpectedChild>, ReconcileError> {
        let proceed_on = TcProceedOn::from_strings(&self.spec.proceed_on)?;
        let direction = match self.spec.direction {
            TcDirection::Ingress => "ingress",
            TcDirection::Egress => "egress",
        };
        Ok(materialize_tc(
            program_name,
            self.common(),
            location,
            map_owner_id,
            interfaces,
            self.spec.priority,
            direction,
            &proceed_on,
        ))
    }
}

impl ReconcilableProgram for TracepointProgram {
    fn kind_enum() -> ProgramKind {
        ProgramKind::Tracepoint
    }

    fn common(&self) -> &BpfProgramCommon {
        &self.spec.common
    }

    fn materialize(
        &self,
        program_name: &str,
        location: LoadLocation,
        map_owner_id: Option<u32>,
        _interfaces: &[String],
        _containers: &[ContainerMatch],
    ) -> Result<Vec<ExpectedChild>, ReconcileError> {
        Ok(materialize_tracepoint(
            program_name,
            self.common(),
            location,
            map_owner_id,
            &self.spec.names,
        ))
    }
}

impl ReconcilableProgram for KprobeProgram {
    fn kind_enum() -> ProgramKind {
        ProgramKind::Kprobe
    }

    fn common(&self) -> &BpfProgramCommon {
        &self.spec.common
    }

    fn materialize(
        &self,
        program_name: &str,
        location: LoadLocation,
        map_owner_id: Option<u32>,
        _interfaces: &[String],
        _containers: &[ContainerMatch],
    ) -> Result<Vec<ExpectedChild>, ReconcileError> {
        Ok(materialize_kprobe(
            program_name,
            self.common(),
            location,
            map_owner_id,
            &self.spec.fn_names,
            self.spec.offset,
            self.spec.retprobe,
        ))
    }
}

impl ReconcilableProgram for UprobeProgram {
    fn kind_enum() -> ProgramKind {
        ProgramKind::Uprobe
    }

    fn common(&self) -> &BpfProgramCommon {
        &self.spec.common
    }

    fn container_selector(&self) -> Option<&ContainerSelector> {
        self.spec.container_selector.as_ref()
    }

    fn materialize(
        &self,
        program_name: &str,
        location: LoadLocation,
        map_owner_id: Option<u32>,
        _interfaces: &[String],
        containers: &[ContainerMatch],
    ) -> Result<Vec<ExpectedChild>, ReconcileError> {
        Ok(materialize_uprobe(
            program_name,
            self.common(),
            location,
            map_owner_id,
            &self.spec.fn_names,
            &self.spec.target,
            self.spec.offset,
            self.spec.retprobe,
            self.spec.container_selector.is_some(),
            containers,
        ))
    }
}

impl ReconcilableProgram for FentryProgram {
    fn kind_enum() -> ProgramKind {
        ProgramKind::Fentry
    }

    fn common(&self) -> &BpfProgramCommon {
        &self.spec.common
    }

    fn materialize(
        &self,
        program_name: &str,
        location: LoadLocation,
        map_owner_id: Option<u32>,
        _interfaces: &[String],
        _containers: &[ContainerMatch],
    ) -> Result<Vec<ExpectedChild>, ReconcileError> {
        Ok(materialize_fentry(
            program_name,
            self.common(),
            location,
            map_owner_id,
            &self.spec.fn_name,
        ))
    }
}

impl ReconcilableProgram for FexitProgram {
    fn kind_enum() -> ProgramKind {
        ProgramKind::Fexit
    }

    fn common(&self) -> &BpfProgramCommon {
        &self.spec.common
    }

    fn materialize(
        &self,
        program_name: &str,
        location: LoadLocation,
        map_owner_id: Option<u32>,
        _interfaces: &[String],
        _containers: &[ContainerMatch],
    ) -> Result<Vec<ExpectedChild>, ReconcileError> {
        Ok(materialize_fexit(
            program_name,
            self.common(),
            location,
            map_owner_id,
            &self.spec.fn_name,
        ))
    }
}

/// Kernel program type the loader should be queried with for this kind.
pub fn kernel_program_type(kind: ProgramKind) -> bpfman_agent_api::KernelProgramType {
    use bpfman_agent_api::KernelProgramType as K;
    match kind {
        ProgramKind::Xdp => K::Xdp,
        ProgramKind::Tc => K::Tc,
        ProgramKind::Tracepoint => K::Tracepoint,
        ProgramKind::Kprobe | ProgramKind::Uprobe => K::Kprobe,
        ProgramKind::Fentry | ProgramKind::Fexit => K::Tracing,
    }
}
