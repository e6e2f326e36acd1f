// Copyright (c) 2025 - Cowboy AI, Inc.
//! Infrastructure Stack
//!
//! The pure decision function: flags plus a deployment id in, a complete
//! resource graph and its published contract out. One linear pass:
//!
//! ```text
//! validate flags → network → security → bucket → role → credential
//!   → topology → self-heal document → publication → invariants
//! ```
//!
//! Running it twice with the same inputs yields the same graph.

use serde_json::Value;
use tracing::{debug, info};

use crate::bootstrap::declare_self_heal_document;
use crate::config::StackConfig;
use crate::credential::{resolve_credential, CredentialPlan};
use crate::domain::invariants::{
    validate_core_parameters, validate_credential, validate_edge_rules, validate_references,
    validate_topology_shape, ComputeCensus,
};
use crate::domain::ResourceType;
use crate::errors::InfrastructureResult;
use crate::graph::ResourceGraph;
use crate::identity::ExecutionRole;
use crate::publication::{declare_balancer_urls, publish, PublicationInputs, PublishedParameters, CORE_KEYS};
use crate::security::SecurityPlan;
use crate::service::{service_ports, ServiceKind};
use crate::storage::declare_config_bucket;
use crate::topology::{select_topology, ComputeTopology, TopologyInputs, TopologyKind};
use crate::vpc::{NetworkPlan, NetworkSpec};

/// Description of the rendered template
pub const STACK_DESCRIPTION: &str = "API and gateway services with published infrastructure parameters";

/// A synthesized infrastructure stack
#[derive(Debug, Clone, PartialEq)]
pub struct InfrastructureStack {
    pub config: StackConfig,
    pub deployment_id: String,
    pub network: NetworkPlan,
    pub security: SecurityPlan,
    pub credential: CredentialPlan,
    pub topology: ComputeTopology,
    pub parameters: PublishedParameters,
    pub graph: ResourceGraph,
}

impl InfrastructureStack {
    /// Shape that was selected
    pub fn topology_kind(&self) -> TopologyKind {
        self.topology.kind()
    }

    /// Render the template
    pub fn to_template(&self) -> Value {
        self.graph.to_template(STACK_DESCRIPTION)
    }

    /// Re-check every stack invariant against the assembled graph
    pub fn validate(&self) -> InfrastructureResult<()> {
        let graph = &self.graph;
        let census = ComputeCensus {
            scaling_groups: graph.count_of(ResourceType::AutoScalingGroup),
            instances: graph.count_of(ResourceType::Instance),
            load_balancers: graph.count_of(ResourceType::LoadBalancer),
            balancing_parts: graph.count_of(ResourceType::Listener)
                + graph.count_of(ResourceType::ListenerRule)
                + graph.count_of(ResourceType::TargetGroup),
        };
        validate_topology_shape(&census, self.topology_kind().is_load_balanced())?;
        validate_core_parameters(&self.parameters.keys(), CORE_KEYS)?;
        validate_references(&graph.dangling_references())?;

        if let Some(edge) = self.security.edge_rules() {
            validate_edge_rules(edge.is_open(), edge.is_restricted())?;
        }

        validate_credential(
            !self.credential.resolved.creates_new_resource,
            graph.count_of(ResourceType::KeyPair),
        )?;

        Ok(())
    }
}

/// Build the stack for one deployment
///
/// `deployment_id` only feeds the generated key name. When a key is created
/// its first eight characters must be usable as a name suffix.
pub fn synthesize(config: &StackConfig, deployment_id: &str) -> InfrastructureResult<InfrastructureStack> {
    config.validate()?;

    let kind = select_topology(config);
    info!(
        topology = %kind,
        architecture = %config.architecture,
        exposed = config.expose_publicly,
        deployment_id = %deployment_id,
        "synthesizing infrastructure stack"
    );

    let mut graph = ResourceGraph::new();

    let network = NetworkSpec::standard()?.plan()?;
    network.declare(&mut graph)?;

    let ports = service_ports();
    let security = SecurityPlan::plan(
        config.expose_publicly,
        config.restrict_to_cidr.as_ref(),
        kind.is_load_balanced(),
        &ports,
    )?;
    security.declare(&mut graph, &network.vpc)?;

    let bucket = declare_config_bucket(&mut graph)?;

    let role = ExecutionRole::new()?;
    role.declare(&mut graph, &bucket)?;

    let credential = CredentialPlan::new(
        resolve_credential(config.reuse_ssh_key, &config.ssh_key_name, deployment_id)?,
        kind == TopologyKind::SingleDev,
    );
    credential.declare(&mut graph)?;

    let inputs = TopologyInputs {
        config,
        network: &network,
        internal_group: &security.internal.id,
        edge_group: security.edge.as_ref().map(|group| &group.id),
        role: &role,
        key_name: credential.key_name()?,
        bucket: &bucket,
    };
    let topology = ComputeTopology::plan(&inputs)?;
    topology.declare(&mut graph, &network)?;

    declare_self_heal_document(&mut graph, &ServiceKind::BOTH)?;

    let parameters = publish(&PublicationInputs {
        topology: &topology,
        network: &network,
        security: &security,
        credential: &credential,
        bucket: &bucket,
    })?;
    parameters.declare(&mut graph)?;
    declare_balancer_urls(&mut graph, &topology)?;

    let stack = InfrastructureStack {
        config: config.clone(),
        deployment_id: deployment_id.to_string(),
        network,
        security,
        credential,
        topology,
        parameters,
        graph,
    };
    stack.validate()?;

    debug!(resources = stack.graph.len(), "stack invariants hold");
    info!(
        topology = %kind,
        resources = stack.graph.len(),
        parameters = stack.parameters.len(),
        "✅ stack synthesized"
    );
    Ok(stack)
}
