// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Reconcile orchestrator: the per-kind event loop that ties the bytecode
//! resolver, introspection, materialiser and per-child reconciler
//! together, driving the create/update/delete flow. One `Controller` per
//! Program kind calls [`reconcile`], generic over [`ReconcilableProgram`],
//! so the seven kinds share one state machine instead of seven duplicated
//! ones.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use bpfman_agent_crd::{
    bpfprogram::{BpfProgram, BpfProgramSpec},
    common,
    conditions::BpfProgramConditionType,
    program::ProgramKind,
};
use k8s_openapi::{
    api::core::v1::Node,
    apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement},
};
use kube::{
    api::{Api, ListParams, ObjectMeta, PostParams},
    runtime::controller::Action,
    Client, Resource, ResourceExt,
};
use tracing::{debug, info, warn};

use crate::{
    bytecode,
    child_reconciler::{reconcile_child, ChildInputs, ChildOutcome, MapOwnerStatus},
    errors::ReconcileError,
    finalizer,
    introspection::{self, ContainerRuntime},
    loader::{LoadLocation, LoaderHandle},
    map_owner,
    materialize::{child_name, ExpectedChild},
    program_ext::{kernel_program_type, ReconcilableProgram},
    status,
};

/// Shared state every per-kind controller's reconcile invocation needs.
/// Cheap to clone: `Client` and `LoaderHandle` are themselves thin handles
/// over a shared transport.
#[derive(Clone)]
pub struct Context {
    pub client: Client,
    pub loader: LoaderHandle,
    pub node_name: String,
    pub namespace: String,
    pub container_runtime: Arc<dyn ContainerRuntime>,
    pub retry_interval: Duration,
}

/// Entry point wired to `Controller::run` for each of the seven kinds.
pub async fn reconcile<P: ReconcilableProgram>(
    program: Arc<P>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let kind = P::kind_enum();
    let program_name = program.name_any();
    let program_is_deleting = program.meta().deletion_timestamp.is_some();

    debug!(kind = kind.as_str(), program = %program_name, "reconciling");

    // Step 1: fetch the local node; failure is fatal for this reconcile.
    let node = fetch_node(&ctx).await?;
    let is_node_selected =
        !program_is_deleting && matches_label_selector(&program.common().node_selector, &node);

    // Step 3: list live loader programs of this kind's kernel type once,
    // shared by every child below.
    let live = ctx
        .loader
        .list_by_program_type(kernel_program_type(kind))
        .await?;

    // Step 4: resolve the fields the materialiser needs.
    let interfaces = match program.interface_selector() {
        Some(selector) => introspection::resolve_interfaces(selector).await?,
        None => Vec::new(),
    };
    let containers = match program.container_selector() {
        Some(selector) => {
            introspection::resolve_containers(
                &ctx.client,
                ctx.container_runtime.as_ref(),
                &ctx.node_name,
                selector,
            )
            .await?
        }
        None => Vec::new(),
    };
    let map_owner = map_owner::resolve_map_owner(
        &ctx.client,
        &ctx.loader,
        &ctx.node_name,
        program.common().map_owner_selector.as_ref(),
    )
    .await?;

    let bytecode_result =
        bytecode::resolve_bytecode(&ctx.client, &ctx.namespace, &program.common().bytecode).await;

    let existing = list_existing_children(&ctx.client, kind, &program_name, &ctx.node_name).await?;
    let mut existing_by_name: BTreeMap<String, BpfProgram> =
        existing.into_iter().map(|b| (b.name_any(), b)).collect();

    let location = match &bytecode_result {
        Ok(location) => location.clone(),
        // Bytecode cannot be resolved: every expected child this produces
        // is unusable for loading, but we still need locations/names to
        // label the children consistently for a `BytecodeSelectorError`
        // condition. The placeholder is never sent to the loader —
        // `handle_bytecode_error` short-circuits before any load.
        Err(_) => LoadLocation::File(String::new()),
    };

    let expected = program.materialize(
        &program_name,
        location,
        map_owner_kernel_id(map_owner),
        &interfaces,
        &containers,
    )?;

    if let Err(e) = &bytecode_result {
        return handle_bytecode_error(&ctx, kind, &program, &program_name, &expected, &mut existing_by_name, e)
            .await;
    }

    for child in &expected {
        let name = child_name(&program_name, &ctx.node_name, child);
        match existing_by_name.remove(&name) {
            None => {
                create_child(&ctx, kind, program.as_ref(), &program_name, &name, child).await?;
                // Early return so the controller re-enters with a fresh
                // object.
                return Ok(Action::requeue(Duration::from_secs(0)));
            }
            Some(existing_child) => {
                let uid = existing_child
                    .uid()
                    .ok_or(ReconcileError::MissingObjectKey(".metadata.uid"))?;
                let current_id = current_id_annotation(&existing_child);
                let outcome = reconcile_child(
                    &ctx.loader,
                    ChildInputs {
                        bpf_program_uid: &uid,
                        expected: &child.load,
                        live: live.get(&uid),
                        is_node_selected,
                        is_being_deleted: program_is_deleting,
                        no_containers_on_node: child.no_containers_on_node,
                        map_owner,
                        current_id_annotation: current_id,
                    },
                )
                .await?;

                if let Some(action) =
                    apply_outcome(&ctx, &existing_child, &outcome, current_id).await?
                {
                    return Ok(action);
                }
            }
        }
    }

    // Remaining entries are the unexpected set: selections that shrank.
    for (_, stale) in existing_by_name {
        unload_and_remove(&ctx, &stale, map_owner).await?;
    }

    if program_is_deleting {
        // The owning Program is gone; there is nothing left for this
        // kind's controller to converge toward. No requeue — a future
        // creation will re-enter fresh.
        return Ok(Action::await_change());
    }

    Ok(Action::requeue(ctx.retry_interval))
}

/// Error policy handed to `Controller::run`: transient failures requeue on
/// the fixed interval; anything else still requeues, since a logical
/// failure here means the status write itself didn't happen and must be
/// retried.
pub fn error_policy<P: ReconcilableProgram>(
    _program: Arc<P>,
    error: &ReconcileError,
    ctx: Arc<Context>,
) -> Action {
    if error.is_transient() {
        warn!(error = %error, "transient error, requeueing");
    } else {
        warn!(error = %error, "reconcile error");
    }
    Action::requeue(ctx.retry_interval)
}

async fn fetch_node(ctx: &Context) -> Result<Node, ReconcileError> {
    let nodes: Api<Node> = Api::all(ctx.client.clone());
    nodes
        .get(&ctx.node_name)
        .await
        .map_err(|_| ReconcileError::NodeNotFound(ctx.node_name.clone()))
}

fn map_owner_kernel_id(status: MapOwnerStatus) -> Option<u32> {
    match status {
        MapOwnerStatus::Loaded { kernel_id } => Some(kernel_id),
        _ => None,
    }
}

fn current_id_annotation(child: &BpfProgram) -> Option<u32> {
    child
        .annotations()
        .get(common::ANNOTATION_PROGRAM_ID)
        .and_then(|v| v.parse().ok())
}

/// Lists the `BpfProgram` children this Program CR already owns on this
/// node.
async fn list_existing_children(
    client: &Client,
    kind: ProgramKind,
    owner_name: &str,
    node_name: &str,
) -> Result<Vec<BpfProgram>, ReconcileError> {
    let api: Api<BpfProgram> = Api::all(client.clone());
    let selector = format!(
        "{}={},{}={}",
        common::LABEL_OWNER,
        owner_name,
        common::LABEL_HOST,
        node_name
    );
    let list = api.list(&ListParams::default().labels(&selector)).await?;
    Ok(list
        .items
        .into_iter()
        .filter(|b| b.spec.program_type == kind.as_str())
        .collect())
}

async fn create_child<P: ReconcilableProgram>(
    ctx: &Context,
    kind: ProgramKind,
    program: &P,
    program_name: &str,
    child_name: &str,
    child: &ExpectedChild,
) -> Result<(), ReconcileError> {
    info!(kind = kind.as_str(), program = %program_name, child = %child_name, "creating BpfProgram");

    let mut labels = BTreeMap::new();
    labels.insert(common::LABEL_OWNER.to_string(), program_name.to_string());
    labels.insert(common::LABEL_HOST.to_string(), ctx.node_name.clone());

    let owner_ref = program
        .controller_owner_ref(&())
        .ok_or(ReconcileError::MissingObjectKey(".metadata.uid"))?;

    let object = BpfProgram {
        metadata: ObjectMeta {
            name: Some(child_name.to_string()),
            labels: Some(labels.into_iter().collect()),
            annotations: Some(child.annotations.clone().into_iter().collect()),
            owner_references: Some(vec![owner_ref]),
            finalizers: Some(vec![kind.finalizer().to_string()]),
            ..Default::default()
        },
        spec: BpfProgramSpec {
            program_type: kind.as_str().to_string(),
        },
        status: None,
    };

    let api: Api<BpfProgram> = Api::all(ctx.client.clone());
    api.create(&PostParams::default(), &object).await?;
    Ok(())
}

/// Applies one child's reconcile outcome per the create/update flow.
/// Returns `Some(action)` when the caller should return immediately
/// (a terminal-non-Loaded condition, or an annotation update), `None` when
/// the expected-children loop should continue to the next child.
async fn apply_outcome(
    ctx: &Context,
    child: &BpfProgram,
    outcome: &ChildOutcome,
    current_id: Option<u32>,
) -> Result<Option<Action>, ReconcileError> {
    let name = child.name_any();

    if outcome.condition.is_terminal_non_loaded() {
        status::write_condition(&ctx.client, &name, outcome.condition, outcome.message.clone())
            .await?;
        return Ok(Some(Action::requeue(ctx.retry_interval)));
    }

    if let Some(id) = outcome.kernel_id.filter(|id| Some(*id) != current_id) {
        status::write_id_annotation(&ctx.client, &name, id).await?;
        status::write_condition(&ctx.client, &name, outcome.condition, outcome.message.clone())
            .await?;
        return Ok(Some(Action::requeue(Duration::from_secs(0))));
    }

    status::write_condition(&ctx.client, &name, outcome.condition, outcome.message.clone()).await?;
    Ok(None)
}

/// Unloads and finalizer-frees one no-longer-expected child.
async fn unload_and_remove(
    ctx: &Context,
    child: &BpfProgram,
    map_owner: MapOwnerStatus,
) -> Result<(), ReconcileError> {
    let uid = child
        .uid()
        .ok_or(ReconcileError::MissingObjectKey(".metadata.uid"))?;
    let current_id = current_id_annotation(child);
    let live = ctx.loader.get_by_uid(&uid).await?;

    // The expected load shape no longer matters here: `is_being_deleted`
    // forces the terminal `Unloaded` gate before any diff is consulted.
    let placeholder = placeholder_expected_load();
    let outcome = reconcile_child(
        &ctx.loader,
        ChildInputs {
            bpf_program_uid: &uid,
            expected: &placeholder,
            live: live.as_ref(),
            is_node_selected: false,
            is_being_deleted: true,
            no_containers_on_node: false,
            map_owner,
            current_id_annotation: current_id,
        },
    )
    .await?;

    info!(child = %child.name_any(), condition = outcome.condition.as_str(), "unloaded unexpected child");

    let kind = ProgramKind::ALL
        .into_iter()
        .find(|k| k.as_str() == child.spec.program_type)
        .ok_or(ReconcileError::MissingObjectKey("spec.programType"))?;
    finalizer::remove(ctx.client.clone(), child, kind.finalizer()).await?;

    let api: Api<BpfProgram> = Api::all(ctx.client.clone());
    api.delete(&child.name_any(), &Default::default()).await?;
    Ok(())
}

fn placeholder_expected_load() -> crate::loader::ExpectedLoad {
    crate::loader::ExpectedLoad {
        program_name: String::new(),
        kernel_program_type: bpfman_agent_api::KernelProgramType::Xdp,
        bpf_function_name: String::new(),
        location: LoadLocation::File(String::new()),
        global_data: Default::default(),
        map_owner_id: None,
        attach: crate::loader::AttachInfo::Xdp {
            iface: String::new(),
            priority: 0,
            proceed_on: Vec::new(),
        },
    }
}

/// Bytecode resolution failed: no
/// load is attempted for any expected child this reconcile, new children
/// are still created (so the condition is observable per-attachment-point)
/// and existing live programs are left untouched rather than torn down on
/// what may be a transient secret-read hiccup.
async fn handle_bytecode_error<P: ReconcilableProgram>(
    ctx: &Context,
    kind: ProgramKind,
    program: &P,
    program_name: &str,
    expected: &[ExpectedChild],
    existing_by_name: &mut BTreeMap<String, BpfProgram>,
    error: &ReconcileError,
) -> Result<Action, ReconcileError> {
    for child in expected {
        let name = child_name(program_name, &ctx.node_name, child);
        if let Some(existing_child) = existing_by_name.remove(&name) {
            status::write_condition(
                &ctx.client,
                &existing_child.name_any(),
                BpfProgramConditionType::BytecodeSelectorError,
                error.to_string(),
            )
            .await?;
        } else {
            create_child(ctx, kind, program, program_name, &name, child).await?;
            status::write_condition(
                &ctx.client,
                &name,
                BpfProgramConditionType::BytecodeSelectorError,
                error.to_string(),
            )
            .await?;
        }
    }
    Ok(Action::requeue(ctx.retry_interval))
}

/// Evaluates a Kubernetes `LabelSelector` against the local node's labels.
fn matches_label_selector(selector: &LabelSelector, node: &Node) -> bool {
    let labels = node.metadata.labels.clone().unwrap_or_default();

    if let Some(match_labels) = &selector.match_labels {
        for (k, v) in match_labels {
            if labels.get(k) != Some(v) {
                return false;
            }
        }
    }

    if let Some(expressions) = &selector.match_expressions {
        for expr in expressions {
            if !matches_expression(expr, &labels) {
                return false;
            }
        }
    }

    true
}

fn matches_expression(
    expr: &LabelSelectorRequirement,
    labels: &std::collections::BTreeMap<String, String>,
) -> bool {
    match expr.operator.as_str() {
        "In" => {
            let values = expr.values.as_deref().unwrap_or_default();
            labels.get(&expr.key).is_some_and(|v| values.contains(v))
        }
        "NotIn" => {
            let values = expr.values.as_deref().unwrap_or_default();
            !labels.get(&expr.key).is_some_and(|v| values.contains(v))
        }
        "Exists" => labels.contains_key(&expr.key),
        "DoesNotExist" => !labels.contains_key(&expr.key),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta as K8sObjectMeta;
    use std::collections::BTreeMap as Map;

    fn node_with_labels(labels: &[(&str, &str)]) -> Node {
        let mut map = Map::new();
        for (k, v) in labels {
            map.insert(k.to_string(), v.to_string());
        }
        Node {
            metadata: K8sObjectMeta {
                labels: Some(map),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn empty_selector_matches_any_node() {
        let node = node_with_labels(&[("zone", "a")]);
        assert!(matches_label_selector(&LabelSelector::default(), &node));
    }

    #[test]
    fn match_labels_all_must_be_present() {
        let node = node_with_labels(&[("zone", "a")]);
        let mut match_labels = Map::new();
        match_labels.insert("zone".to_string(), "a".to_string());
        let selector = LabelSelector {
            match_labels: Some(match_labels),
            match_expressions: None,
        };
        assert!(matches_label_selector(&selector, &node));

        let mut wrong = Map::new();
        wrong.insert("zone".to_string(), "b".to_string());
        let selector = LabelSelector {
            match_labels: Some(wrong),
            match_expressions: None,
        };
        assert!(!matches_label_selector(&selector, &node));
    }

    #[test]
    fn exists_expression_checked() {
        let node = node_with_labels(&[("zone", "a")]);
        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "zone".to_string(),
                operator: "Exists".to_string(),
                values: None,
            }]),
        };
        assert!(matches_label_selector(&selector, &node));

        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "missing".to_string(),
                operator: "Exists".to_string(),
                values: None,
            }]),
        };
        assert!(!matches_label_selector(&selector, &node));
    }
}
