// SPDX-License-Identifier: Apache-2.0
// Copyright Authors of bpfman

//! Bytecode resolver: turns a `BytecodeSelector` into a
//! `LoadLocation` the loader accepts, reading pull credentials out of a
//! docker-config-json `Secret` when one is named.

use std::collections::HashMap;

use base64::Engine;
use bpfman_agent_crd::common::BytecodeSelector;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use oci_client::Reference;
use serde::Deserialize;
use tracing::warn;

use crate::{errors::ReconcileError, loader::LoadLocation};

const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";
const DOCKER_IO_DOMAIN: &str = "docker.io";
const DOCKER_IO_DEFAULT_DOMAIN: &str = "https://index.docker.io/v1/";

#[derive(Deserialize)]
struct DockerConfigJson {
    auths: HashMap<String, DockerConfigAuth>,
}

#[derive(Deserialize)]
struct DockerConfigAuth {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Resolves a `BytecodeSelector` to a concrete `LoadLocation`. `namespace`
/// is the agent's own namespace — secrets are only ever read from there,
/// never cluster-wide.
pub async fn resolve_bytecode(
    client: &Client,
    namespace: &str,
    selector: &BytecodeSelector,
) -> Result<LoadLocation, ReconcileError> {
    match selector {
        BytecodeSelector::Path(path) => Ok(LoadLocation::File(path.clone())),
        BytecodeSelector::Image {
            image_url,
            image_pull_policy,
            image_pull_secret,
        } => {
            let (username, password) = match image_pull_secret {
                Some(secret_name) => {
                    let (user, pass) =
                        resolve_credentials(client, namespace, secret_name, image_url).await?;
                    (Some(user), Some(pass))
                }
                None => (None, None),
            };
            Ok(LoadLocation::Image {
                url: image_url.clone(),
                pull_policy: image_pull_policy_to_api(*image_pull_policy),
                username,
                password,
            })
        }
    }
}

fn image_pull_policy_to_api(
    policy: bpfman_agent_crd::common::ImagePullPolicy,
) -> bpfman_agent_api::ImagePullPolicy {
    use bpfman_agent_crd::common::ImagePullPolicy as Crd;
    match policy {
        Crd::Always => bpfman_agent_api::ImagePullPolicy::Always,
        Crd::IfNotPresent => bpfman_agent_api::ImagePullPolicy::IfNotPresent,
        Crd::Never => bpfman_agent_api::ImagePullPolicy::Never,
    }
}

/// Normalises a registry domain the way docker's config.json does:
/// `docker.io` and the empty string both mean Docker Hub's canonical v1
/// endpoint.
fn normalize_registry_domain(domain: &str) -> String {
    if domain.is_empty() || domain == DOCKER_IO_DOMAIN {
        DOCKER_IO_DEFAULT_DOMAIN.to_string()
    } else {
        domain.to_string()
    }
}

async fn resolve_credentials(
    client: &Client,
    namespace: &str,
    secret_name: &str,
    image_url: &str,
) -> Result<(String, String), ReconcileError> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets.get(secret_name).await?;

    let raw = secret
        .data
        .as_ref()
        .and_then(|d| d.get(DOCKER_CONFIG_JSON_KEY))
        .ok_or_else(|| {
            ReconcileError::BytecodeSelectorError(format!(
                "secret {secret_name} has no {DOCKER_CONFIG_JSON_KEY} key"
            ))
        })?;

    let config: DockerConfigJson = serde_json::from_slice(&raw.0).map_err(|e| {
        ReconcileError::BytecodeSelectorError(format!("malformed {DOCKER_CONFIG_JSON_KEY}: {e}"))
    })?;

    let reference = Reference::try_from(image_url).map_err(|e| {
        ReconcileError::BytecodeSelectorError(format!("invalid image reference {image_url}: {e}"))
    })?;
    let wanted_domain = normalize_registry_domain(reference.registry());

    let entry = config
        .auths
        .iter()
        .find(|(domain, _)| normalize_registry_domain(domain) == wanted_domain)
        .map(|(_, auth)| auth)
        .ok_or_else(|| {
            ReconcileError::BytecodeSelectorError(format!(
                "no credentials for registry {wanted_domain} in secret {secret_name}"
            ))
        })?;

    if let (Some(username), Some(password)) = (&entry.username, &entry.password) {
        return Ok((username.clone(), password.clone()));
    }

    let auth = entry.auth.as_deref().ok_or_else(|| {
        ReconcileError::BytecodeSelectorError(format!(
            "credentials entry for {wanted_domain} carries neither auth nor username/password"
        ))
    })?;
    decode_basic_auth(auth)
}

fn decode_basic_auth(auth: &str) -> Result<(String, String), ReconcileError> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth)
        .map_err(|e| ReconcileError::BytecodeSelectorError(format!("invalid auth field: {e}")))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| ReconcileError::BytecodeSelectorError(format!("invalid auth field: {e}")))?;
    match decoded.split_once(':') {
        Some((user, pass)) => Ok((user.to_string(), pass.to_string())),
        None => {
            warn!("auth field carried no ':' separator");
            Err(ReconcileError::BytecodeSelectorError(
                "auth field is not user:pass".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_io_normalizes_to_v1_endpoint() {
        assert_eq!(normalize_registry_domain(DOCKER_IO_DOMAIN), DOCKER_IO_DEFAULT_DOMAIN);
    }

    #[test]
    fn empty_domain_normalizes_to_v1_endpoint_too() {
        assert_eq!(normalize_registry_domain(""), DOCKER_IO_DEFAULT_DOMAIN);
    }

    #[test]
    fn other_registries_pass_through_unchanged() {
        assert_eq!(
            normalize_registry_domain("quay.io"),
            "quay.io".to_string()
        );
    }

    #[test]
    fn decodes_user_pass_from_base64_auth_field() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:hunter2");
        let (user, pass) = decode_basic_auth(&encoded).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "hunter2");
    }

    #[test]
    fn rejects_auth_field_without_separator() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("no-separator-here");
        assert!(decode_basic_auth(&encoded).is_err());
    }
}
