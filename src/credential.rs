// Copyright (c) 2025 - Cowboy AI, Inc.
//! Access Credential Component
//!
//! One SSH key identity per deployment. Either the configured name is
//! referenced as-is (it must already exist), or a name unique to the
//! deployment is derived and a new key pair is declared under it. Fixed
//! names collide when two deployments share an account, so a created key
//! always carries the deployment suffix.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::domain::{LogicalId, ResourceType};
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::graph::{Resource, ResourceGraph, Token};

/// Characters of the deployment id appended to generated names
pub const UNIQUE_SUFFIX_LEN: usize = 8;

/// Logical id of a created key pair
pub const KEY_PAIR_ID: &str = "SshKeyPair";

/// Outcome of credential resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedCredential {
    /// Name every compute unit refers to
    pub key_name: String,
    /// Whether a new key pair resource is declared
    pub creates_new_resource: bool,
}

/// Decide the key name and whether to create it
///
/// `reuse = true` returns `base_name` untouched and never creates anything;
/// a missing key surfaces as an apply-time error from the engine.
/// `reuse = false` returns `base_name-<first 8 chars of unique_suffix_source>`
/// and fails when those characters cannot tell deployments apart.
pub fn resolve_credential(
    reuse: bool,
    base_name: &str,
    unique_suffix_source: &str,
) -> InfrastructureResult<ResolvedCredential> {
    if reuse {
        return Ok(ResolvedCredential {
            key_name: base_name.to_string(),
            creates_new_resource: false,
        });
    }

    let suffix = unique_suffix(unique_suffix_source)?;
    Ok(ResolvedCredential {
        key_name: format!("{}-{}", base_name, suffix),
        creates_new_resource: true,
    })
}

/// First `UNIQUE_SUFFIX_LEN` characters of the deployment id
///
/// Letters, digits, `-` and `_` only, with at least one letter or digit.
fn unique_suffix(source: &str) -> InfrastructureResult<String> {
    let suffix: String = source.chars().take(UNIQUE_SUFFIX_LEN).collect();

    let usable = suffix.chars().count() == UNIQUE_SUFFIX_LEN
        && suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && suffix.chars().any(|c| c.is_ascii_alphanumeric());

    if !usable {
        return Err(InfrastructureError::Configuration(format!(
            "deployment id {:?} cannot suffix a generated key name: need {} leading characters \
             from [A-Za-z0-9_-] including a letter or digit",
            source, UNIQUE_SUFFIX_LEN
        )));
    }
    Ok(suffix)
}

/// Credential as wired into the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPlan {
    pub resolved: ResolvedCredential,
    /// Keep a created key pair when the stack is deleted
    pub retain_on_delete: bool,
}

impl CredentialPlan {
    pub fn new(resolved: ResolvedCredential, retain_on_delete: bool) -> Self {
        info!(
            key_name = %resolved.key_name,
            creates = resolved.creates_new_resource,
            "resolved SSH credential"
        );
        Self {
            resolved,
            retain_on_delete,
        }
    }

    /// Logical id of the declared key pair, if one is created
    pub fn key_pair_id(&self) -> InfrastructureResult<Option<LogicalId>> {
        if self.resolved.creates_new_resource {
            Ok(Some(LogicalId::new(KEY_PAIR_ID)?))
        } else {
            Ok(None)
        }
    }

    /// Token compute units use for `KeyName`
    ///
    /// Referencing the created key pair orders it before the instances.
    pub fn key_name(&self) -> InfrastructureResult<Token> {
        Ok(match self.key_pair_id()? {
            Some(id) => Token::reference(&id),
            None => Token::literal(&self.resolved.key_name),
        })
    }

    /// Declare the key pair when one is created
    pub fn declare(&self, graph: &mut ResourceGraph) -> InfrastructureResult<()> {
        let Some(id) = self.key_pair_id()? else {
            return Ok(());
        };

        let mut key_pair = Resource::new(
            ResourceType::KeyPair,
            json!({
                "KeyName": self.resolved.key_name,
                "KeyType": "ed25519",
                "KeyFormat": "pem",
            }),
        );
        if self.retain_on_delete {
            key_pair = key_pair.retained();
        }
        graph.add(&id, key_pair)
    }
}
