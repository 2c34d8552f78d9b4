// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

pub mod fentry;
pub mod fexit;
pub mod kprobe;
pub mod tc;
pub mod tracepoint;
pub mod uprobe;
pub mod xdp;

pub use fentry::{FentryProgram, FentryProgramSpec};
pub use fexit::{FexitProgram, FexitProgramSpec};
pub use kprobe::{KprobeProgram, KprobeProgramSpec};
pub use tc::{TcDirection, TcProgram, TcProgramSpec};
pub use tracepoint::{TracepointProgram, TracepointProgramSpec};
pub use uprobe::{UprobeProgram, UprobeProgramSpec};
pub use xdp::{XdpProgram, XdpProgramSpec};

use crate::common::finalizers;

/// Enumerates every Program kind the agent reconciles. Lets the
/// orchestrator
/// switch on a single value instead of duplicating the per-kind plumbing
/// seven times over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Xdp,
    Tc,
    Tracepoint,
    Kprobe,
    Uprobe,
    Fentry,
    Fexit,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 7] = [
        ProgramKind::Xdp,
        ProgramKind::Tc,
        ProgramKind::Tracepoint,
        ProgramKind::Kprobe,
        ProgramKind::Uprobe,
        ProgramKind::Fentry,
        ProgramKind::Fexit,
    ];

    /// The kind name as it appears in a `BpfProgram`'s `program_type` field
    /// and in Kubernetes `kind:` strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramKind::Xdp => "XdpProgram",
            ProgramKind::Tc => "TcProgram",
            ProgramKind::Tracepoint => "TracepointProgram",
            ProgramKind::Kprobe => "KprobeProgram",
            ProgramKind::Uprobe => "UprobeProgram",
            ProgramKind::Fentry => "FentryProgram",
            ProgramKind::Fexit => "FexitProgram",
        }
    }

    /// This kind's dedicated finalizer string.
    pub fn finalizer(&self) -> &'static str {
        match self {
            ProgramKind::Xdp => finalizers::XDP_PROGRAM,
            ProgramKind::Tc => finalizers::TC_PROGRAM,
            ProgramKind::Tracepoint => finalizers::TRACEPOINT_PROGRAM,
            ProgramKind::Kprobe => finalizers::KPROBE_PROGRAM,
            ProgramKind::Uprobe => finalizers::UPROBE_PROGRAM,
            ProgramKind::Fentry => finalizers::FENTRY_PROGRAM,
            ProgramKind::Fexit => finalizers::FEXIT_PROGRAM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_distinct_finalizer() {
        let finalizers: std::collections::HashSet<_> =
            ProgramKind::ALL.iter().map(|k| k.finalizer()).collect();
        assert_eq!(finalizers.len(), ProgramKind::ALL.len());
    }
}
