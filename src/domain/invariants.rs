// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Stack Invariants
//!
//! Checks run over a synthesized stack before it is handed to the
//! provisioning engine. Every function is pure and takes plain counts or
//! key sets, so the rules can be exercised without building a graph.
//!
//! # Invariant Categories
//!
//! 1. **Topology**: exactly one compute shape, no balancing under dev mode
//! 2. **Publication**: the core parameter keys are always present
//! 3. **Graph**: every reference resolves to a declared resource
//! 4. **Policy**: edge rules and credential creation are consistent

use std::collections::BTreeSet;

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No compute shape was declared
    #[error("No compute topology present in the graph")]
    NoTopology,

    /// More than one compute shape was declared
    #[error("Multiple compute topologies present: {0}")]
    MultipleTopologies(String),

    /// Balancer resources declared for a topology that has none
    #[error("{count} load balancing resources declared under a single dev instance")]
    LoadBalancingUnderSingleDev { count: usize },

    /// A load-balanced topology without exactly one balancer
    #[error("Load-balanced topology must declare exactly one load balancer, found {0}")]
    BalancerCount(usize),

    /// Core parameter key not published
    #[error("Core parameter not published: {0}")]
    MissingCoreParameter(String),

    /// Reference to an undeclared resource
    #[error("Reference to undeclared resource: {0}")]
    DanglingReference(String),

    /// Edge rules both open to all addresses and restricted
    #[error("Edge rules mix open and restricted peers")]
    MixedEdgeRules,

    /// Credential resource presence disagrees with the reuse flag
    #[error("Credential mismatch: reuse={reuse}, key pairs declared={declared}")]
    CredentialMismatch { reuse: bool, declared: usize },
}

/// Compute resources found in a graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputeCensus {
    pub scaling_groups: usize,
    pub instances: usize,
    pub load_balancers: usize,
    /// Listeners, listener rules and target groups
    pub balancing_parts: usize,
}

/// Validate the compute shape matches the selected topology
///
/// # Rules
/// - At least one compute unit exists
/// - Scaling groups and standalone instances never coexist
/// - Load-balanced topologies declare exactly one balancer
/// - A dev instance stands alone: one instance, no balancer parts
pub fn validate_topology_shape(census: &ComputeCensus, load_balanced: bool) -> ValidationResult {
    if census.scaling_groups == 0 && census.instances == 0 {
        return Err(ValidationError::NoTopology);
    }

    if census.scaling_groups > 0 && census.instances > 0 {
        return Err(ValidationError::MultipleTopologies(format!(
            "{} scaling groups alongside {} instances",
            census.scaling_groups, census.instances
        )));
    }

    if load_balanced {
        if census.load_balancers != 1 {
            return Err(ValidationError::BalancerCount(census.load_balancers));
        }
        return Ok(());
    }

    let balancing = census.load_balancers + census.balancing_parts;
    if balancing > 0 {
        return Err(ValidationError::LoadBalancingUnderSingleDev { count: balancing });
    }

    if census.instances != 1 || census.scaling_groups != 0 {
        return Err(ValidationError::MultipleTopologies(format!(
            "dev topology declares {} instances",
            census.instances
        )));
    }

    Ok(())
}

/// Validate every core key is among the published keys
pub fn validate_core_parameters<'a>(
    published: &BTreeSet<String>,
    core: impl IntoIterator<Item = &'a str>,
) -> ValidationResult {
    for key in core {
        if !published.contains(key) {
            return Err(ValidationError::MissingCoreParameter(key.to_string()));
        }
    }
    Ok(())
}

/// Validate no reference points outside the graph
pub fn validate_references<T: ToString>(dangling: &BTreeSet<T>) -> ValidationResult {
    match dangling.iter().next() {
        Some(id) => Err(ValidationError::DanglingReference(id.to_string())),
        None => Ok(()),
    }
}

/// Validate the edge rule set picks exactly one branch
pub fn validate_edge_rules(open: bool, restricted: bool) -> ValidationResult {
    if open && restricted {
        return Err(ValidationError::MixedEdgeRules);
    }
    Ok(())
}

/// Validate a key pair is declared iff the key is not reused
pub fn validate_credential(reuse: bool, key_pairs_declared: usize) -> ValidationResult {
    let expected = if reuse { 0 } else { 1 };
    if key_pairs_declared != expected {
        return Err(ValidationError::CredentialMismatch {
            reuse,
            declared: key_pairs_declared,
        });
    }
    Ok(())
}
