// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

pub mod bpfprogram;
pub mod common;
pub mod conditions;
pub mod program;
pub mod status;

pub use bpfprogram::{BpfProgram, BpfProgramSpec, BpfProgramStatus};
pub use status::ProgramStatus;
