// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, Result};
use bpfman_agent_crd::{
    bpfprogram::BpfProgram,
    program::{
        FentryProgram, FexitProgram, KprobeProgram, TcProgram, TracepointProgram, UprobeProgram,
        XdpProgram,
    },
};
use futures::{future::try_join_all, StreamExt};
use kube::{
    runtime::{controller::Controller, watcher},
    Api, Client,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod bytecode;
mod child_reconciler;
mod config;
mod discovery;
mod errors;
mod finalizer;
mod introspection;
mod loader;
mod map_owner;
mod materialize;
mod orchestrator;
mod program_ext;
mod status;

use config::Config;
use introspection::ProcfsContainerRuntime;
use loader::LoaderHandle;
use orchestrator::Context;

/// Namespace the agent reads bytecode pull secrets from, when
/// `AGENT_NAMESPACE` is unset in the process environment.
const DEFAULT_NAMESPACE: &str = "kube-system";
const CONFIG_PATH: &str = "/etc/bpfman/agent-config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // The daemonset injects this via the downward API; without it the agent
    // cannot scope any of its queries to the local node, so refuse to start.
    let node_name = std::env::var("NODE_NAME").context("NODE_NAME must be set")?;
    let namespace =
        std::env::var("AGENT_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

    let config = Config::load(std::path::Path::new(CONFIG_PATH)).await?;

    info!(node = %node_name, socket = ?config.loader.socket_path, "starting bpfman-agent");

    let loader = LoaderHandle::connect(&config.loader.socket_path)
        .await
        .context("failed to connect to the bpfman loader")?;

    let client = Client::try_default()
        .await
        .context("failed to create kube client")?;

    let ctx = Arc::new(Context {
        client: client.clone(),
        loader,
        node_name,
        namespace,
        container_runtime: Arc::new(ProcfsContainerRuntime),
        retry_interval: Duration::from_secs(config.reconcile.retry_interval_secs),
    });

    let bpf_programs: Api<BpfProgram> = Api::all(client.clone());

    macro_rules! run_kind_controller {
        ($kind:ty) => {{
            let api: Api<$kind> = Api::all(client.clone());
            let ctx = ctx.clone();
            let bpf_programs = bpf_programs.clone();
            tokio::spawn(async move {
                Controller::new(api, watcher::Config::default())
                    .owns(bpf_programs, watcher::Config::default())
                    .shutdown_on_signal()
                    .run(
                        orchestrator::reconcile::<$kind>,
                        orchestrator::error_policy::<$kind>,
                        ctx,
                    )
                    .for_each(|res| async move {
                        match res {
                            Ok(action) => tracing::debug!(?action, "reconciled"),
                            Err(e) => error!(error = %e, "reconcile failed"),
                        }
                    })
                    .await;
                Ok::<(), anyhow::Error>(())
            })
        }};
    }

    let mut tasks = vec![
        run_kind_controller!(XdpProgram),
        run_kind_controller!(TcProgram),
        run_kind_controller!(TracepointProgram),
        run_kind_controller!(KprobeProgram),
        run_kind_controller!(UprobeProgram),
        run_kind_controller!(FentryProgram),
        run_kind_controller!(FexitProgram),
    ];

    let discovery_ctx = ctx.clone();
    let discovery_interval = Duration::from_secs(config.reconcile.discovery_poll_interval_secs);
    tasks.push(tokio::spawn(async move {
        loop {
            if let Err(e) = discovery::run_discovery(&discovery_ctx).await {
                error!(error = %e, "discovery pass failed");
            }
            tokio::time::sleep(discovery_interval).await;
        }
    }));

    try_join_all(tasks)
        .await?
        .into_iter()
        .collect::<Result<Vec<()>, anyhow::Error>>()?;

    info!("bpfman-agent terminated");
    Ok(())
}
