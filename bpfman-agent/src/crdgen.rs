// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Prints the CRD manifests the operator must apply before the agent's
//! controllers can start, one YAML document per kind. Run with
//! `cargo run --bin crdgen | kubectl apply -f -`.

use bpfman_agent_crd::{
    bpfprogram::BpfProgram,
    program::{
        FentryProgram, FexitProgram, KprobeProgram, TcProgram, TracepointProgram, UprobeProgram,
        XdpProgram,
    },
};
use kube::CustomResourceExt;

fn main() {
    let crds = vec![
        serde_yaml::to_string(&XdpProgram::crd()),
        serde_yaml::to_string(&TcProgram::crd()),
        serde_yaml::to_string(&TracepointProgram::crd()),
        serde_yaml::to_string(&KprobeProgram::crd()),
        serde_yaml::to_string(&UprobeProgram::crd()),
        serde_yaml::to_string(&FentryProgram::crd()),
        serde_yaml::to_string(&FexitProgram::crd()),
        serde_yaml::to_string(&BpfProgram::crd()),
    ];

    for crd in crds {
        match crd {
            Ok(yaml) => println!("---\n{yaml}"),
            Err(e) => eprintln!("failed to serialize CRD: {e}"),
        }
    }
}
