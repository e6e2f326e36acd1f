// Copyright (c) 2025 - Cowboy AI, Inc.

//! Published parameter namespace
//!
//! Every externally relevant identifier is written to a shared key/value
//! store under a fixed hierarchy, and mirrored as a stack output.
//!
//! # Path Pattern
//!
//! ```text
//! /infra/{area}/{key}
//! ```
//!
//! Downstream automation reads by path only:
//! - One value (`/infra/balancer/dns-name`)
//! - One area (`GetParametersByPath /infra/balancer/`)
//!
//! # Examples
//!
//! ```rust
//! use twin_stack::publication::{paths, Area, Key, ParameterPath, CORE_KEYS};
//!
//! let path = ParameterPath::new(Area::Storage, Key::ConfigBucket);
//! assert_eq!(path.to_string(), "/infra/storage/config-bucket");
//! assert_eq!(paths::config_bucket(), path);
//! assert!(CORE_KEYS.contains(&"/infra/storage/config-bucket"));
//! assert_eq!(Area::Balancer.prefix(), "/infra/balancer/");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::info;

use crate::credential::CredentialPlan;
use crate::domain::{LogicalId, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};
use crate::security::SecurityPlan;
use crate::service::{ServiceKind, API, GATEWAY};
use crate::topology::{ComputeTopology, TopologyKind};
use crate::vpc::NetworkPlan;

/// Root of the published namespace
pub const PARAMETER_ROOT: &str = "/infra";

/// Keys published for every topology
pub const CORE_KEYS: [&str; 4] = [
    "/infra/storage/config-bucket",
    "/infra/network/internal-sg-id",
    "/infra/access/key-name",
    "/infra/mode/persistent",
];

/// Top-level areas of the namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    /// Config bucket
    Storage,
    /// VPC and security groups
    Network,
    /// SSH credential
    Access,
    /// Deployment mode flags
    Mode,
    /// Load balancer and its target groups
    Balancer,
    /// Per-service target identifiers
    Targets,
    /// Reserved address allocations
    Addresses,
    /// The single dev instance
    Dev,
}

impl Area {
    /// Path prefix for reading the whole area, e.g. `/infra/dev/`
    pub fn prefix(&self) -> String {
        format!("{}/{}/", PARAMETER_ROOT, self)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Storage => write!(f, "storage"),
            Area::Network => write!(f, "network"),
            Area::Access => write!(f, "access"),
            Area::Mode => write!(f, "mode"),
            Area::Balancer => write!(f, "balancer"),
            Area::Targets => write!(f, "targets"),
            Area::Addresses => write!(f, "addresses"),
            Area::Dev => write!(f, "dev"),
        }
    }
}

/// Leaf names within an area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Key {
    ConfigBucket,
    VpcId,
    InternalSgId,
    EdgeSgId,
    KeyName,
    KeyPairId,
    Persistent,
    Topology,
    DnsName,
    ListenerArn,
    ApiTargetGroupArn,
    GatewayTargetGroupArn,
    Api,
    Gateway,
    ApiAsgName,
    GatewayAsgName,
    ApiAllocationId,
    GatewayAllocationId,
    InstanceId,
    PublicIp,
    ApiHealthUrl,
    GatewayDocsUrl,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Key::ConfigBucket => "config-bucket",
            Key::VpcId => "vpc-id",
            Key::InternalSgId => "internal-sg-id",
            Key::EdgeSgId => "edge-sg-id",
            Key::KeyName => "key-name",
            Key::KeyPairId => "key-pair-id",
            Key::Persistent => "persistent",
            Key::Topology => "topology",
            Key::DnsName => "dns-name",
            Key::ListenerArn => "listener-arn",
            Key::ApiTargetGroupArn => "api-target-group-arn",
            Key::GatewayTargetGroupArn => "gateway-target-group-arn",
            Key::Api => "api",
            Key::Gateway => "gateway",
            Key::ApiAsgName => "api-asg-name",
            Key::GatewayAsgName => "gateway-asg-name",
            Key::ApiAllocationId => "api-allocation-id",
            Key::GatewayAllocationId => "gateway-allocation-id",
            Key::InstanceId => "instance-id",
            Key::PublicIp => "public-ip",
            Key::ApiHealthUrl => "api-health-url",
            Key::GatewayDocsUrl => "gateway-docs-url",
        };
        write!(f, "{}", name)
    }
}

/// A full `/infra/<area>/<key>` path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterPath {
    pub area: Area,
    pub key: Key,
}

impl ParameterPath {
    pub fn new(area: Area, key: Key) -> Self {
        Self { area, key }
    }

    /// Logical id of the parameter resource, e.g. `ParamInfraStorageConfigBucket`
    pub fn parameter_id(&self) -> InfrastructureResult<LogicalId> {
        Ok(LogicalId::from_words("Param", &self.to_string())?)
    }

    /// Logical id of the mirrored output, e.g. `StorageConfigBucket`
    pub fn output_id(&self) -> InfrastructureResult<LogicalId> {
        Ok(LogicalId::from_words("", &format!("{}/{}", self.area, self.key))?)
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", PARAMETER_ROOT, self.area, self.key)
    }
}

/// Convenience constructors for every published path
pub mod paths {
    use super::*;

    // Always published
    pub fn config_bucket() -> ParameterPath {
        ParameterPath::new(Area::Storage, Key::ConfigBucket)
    }

    pub fn vpc_id() -> ParameterPath {
        ParameterPath::new(Area::Network, Key::VpcId)
    }

    pub fn internal_sg_id() -> ParameterPath {
        ParameterPath::new(Area::Network, Key::InternalSgId)
    }

    pub fn key_name() -> ParameterPath {
        ParameterPath::new(Area::Access, Key::KeyName)
    }

    pub fn persistent() -> ParameterPath {
        ParameterPath::new(Area::Mode, Key::Persistent)
    }

    pub fn topology() -> ParameterPath {
        ParameterPath::new(Area::Mode, Key::Topology)
    }

    pub fn key_pair_id() -> ParameterPath {
        ParameterPath::new(Area::Access, Key::KeyPairId)
    }

    // Load-balanced topologies
    pub fn edge_sg_id() -> ParameterPath {
        ParameterPath::new(Area::Network, Key::EdgeSgId)
    }

    pub fn dns_name() -> ParameterPath {
        ParameterPath::new(Area::Balancer, Key::DnsName)
    }

    pub fn listener_arn() -> ParameterPath {
        ParameterPath::new(Area::Balancer, Key::ListenerArn)
    }

    pub fn target_group_arn(service: ServiceKind) -> ParameterPath {
        match service {
            ServiceKind::Api => ParameterPath::new(Area::Balancer, Key::ApiTargetGroupArn),
            ServiceKind::Gateway => ParameterPath::new(Area::Balancer, Key::GatewayTargetGroupArn),
        }
    }

    pub fn target(service: ServiceKind) -> ParameterPath {
        match service {
            ServiceKind::Api => ParameterPath::new(Area::Targets, Key::Api),
            ServiceKind::Gateway => ParameterPath::new(Area::Targets, Key::Gateway),
        }
    }

    pub fn scaling_group_name(service: ServiceKind) -> ParameterPath {
        match service {
            ServiceKind::Api => ParameterPath::new(Area::Targets, Key::ApiAsgName),
            ServiceKind::Gateway => ParameterPath::new(Area::Targets, Key::GatewayAsgName),
        }
    }

    pub fn allocation_id(service: ServiceKind) -> ParameterPath {
        match service {
            ServiceKind::Api => ParameterPath::new(Area::Addresses, Key::ApiAllocationId),
            ServiceKind::Gateway => ParameterPath::new(Area::Addresses, Key::GatewayAllocationId),
        }
    }

    // Single dev instance
    pub fn dev_instance_id() -> ParameterPath {
        ParameterPath::new(Area::Dev, Key::InstanceId)
    }

    pub fn dev_public_ip() -> ParameterPath {
        ParameterPath::new(Area::Dev, Key::PublicIp)
    }

    pub fn dev_api_health_url() -> ParameterPath {
        ParameterPath::new(Area::Dev, Key::ApiHealthUrl)
    }

    pub fn dev_gateway_docs_url() -> ParameterPath {
        ParameterPath::new(Area::Dev, Key::GatewayDocsUrl)
    }
}

/// One published value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Published {
    pub value: Token,
    pub description: String,
}

/// Everything a deployment publishes, keyed by path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedParameters {
    entries: BTreeMap<ParameterPath, Published>,
}

/// What publication reads from the assembled stack
#[derive(Debug, Clone, Copy)]
pub struct PublicationInputs<'a> {
    pub topology: &'a ComputeTopology,
    pub network: &'a NetworkPlan,
    pub security: &'a SecurityPlan,
    pub credential: &'a CredentialPlan,
    pub bucket: &'a LogicalId,
}

impl PublishedParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value; a later insert for the same path replaces the earlier one
    pub fn insert(&mut self, path: ParameterPath, value: Token, description: impl Into<String>) {
        self.entries.insert(
            path,
            Published {
                value,
                description: description.into(),
            },
        );
    }

    /// Look up a value by its path string
    pub fn get(&self, path: &str) -> Option<&Token> {
        self.entries
            .iter()
            .find(|(key, _)| key.to_string() == path)
            .map(|(_, published)| &published.value)
    }

    /// Whether a path string is published
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Every published path as a string
    pub fn keys(&self) -> BTreeSet<String> {
        self.entries.keys().map(|path| path.to_string()).collect()
    }

    /// Paths within one area
    pub fn in_area(&self, area: Area) -> Vec<ParameterPath> {
        self.entries.keys().filter(|p| p.area == area).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&ParameterPath, &Published)> {
        self.entries.iter()
    }

    /// Path to display-form value, e.g. `"/infra/mode/persistent" → "false"`
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(path, published)| (path.to_string(), published.value.to_string()))
            .collect()
    }

    /// Declare each entry as a `String` parameter and mirror it as an output
    pub fn declare(&self, graph: &mut ResourceGraph) -> InfrastructureResult<()> {
        for (path, published) in &self.entries {
            graph.add(
                &path.parameter_id()?,
                Resource::new(
                    ResourceType::Parameter,
                    json!({
                        "Name": path.to_string(),
                        "Type": "String",
                        "Value": published.value.to_json(),
                        "Description": published.description,
                    }),
                ),
            )?;
            graph.add_output(
                &path.output_id()?,
                published.value.clone(),
                published.description.clone(),
            )?;
        }
        Ok(())
    }
}

/// Derive the published contract from the assembled stack
pub fn publish(inputs: &PublicationInputs<'_>) -> InfrastructureResult<PublishedParameters> {
    let mut published = PublishedParameters::new();
    let kind = inputs.topology.kind();

    // Core
    published.insert(
        paths::config_bucket(),
        Token::reference(inputs.bucket),
        "Config bucket holding compose bundles",
    );
    published.insert(
        paths::internal_sg_id(),
        inputs.security.internal.group_id(),
        "Security group shared by every compute unit",
    );
    published.insert(
        paths::key_name(),
        inputs.credential.key_name()?,
        "SSH key pair name",
    );
    published.insert(
        paths::persistent(),
        Token::literal((kind == TopologyKind::SingleDev).to_string()),
        "Whether the single dev instance is deployed",
    );

    published.insert(paths::vpc_id(), inputs.network.vpc_id(), "VPC id");
    published.insert(paths::topology(), Token::literal(kind.to_string()), "Compute topology");

    if let Some(key_pair) = inputs.credential.key_pair_id()? {
        published.insert(
            paths::key_pair_id(),
            Token::attribute(&key_pair, "KeyPairId"),
            "Id of the created key pair; private key under /ec2/keypair/<id>",
        );
    }

    if let Some(balancer) = inputs.topology.balancer() {
        published.insert(paths::dns_name(), balancer.dns_name(), "Load balancer DNS name");
        published.insert(paths::listener_arn(), balancer.listener_arn(), "HTTP listener ARN");
        published.insert(
            paths::edge_sg_id(),
            Token::attribute(&balancer.edge_group, "GroupId"),
            "Load balancer security group",
        );

        for service in ServiceKind::BOTH {
            if let Some(group) = balancer.target_group(service) {
                published.insert(
                    paths::target_group_arn(service),
                    group.arn(),
                    format!("{} target group ARN", service),
                );
            }
            if let Some(target) = inputs.topology.target_identifier(service) {
                published.insert(
                    paths::target(service),
                    target,
                    format!("{} target identifier", service),
                );
            }
            if let Some(group) = inputs.topology.scaling_group(service) {
                published.insert(
                    paths::scaling_group_name(service),
                    group.group_name(),
                    format!("{} auto scaling group name", service),
                );
            }
        }

        if let Some(reserved) = inputs.topology.reserved_addresses() {
            for service in ServiceKind::BOTH {
                published.insert(
                    paths::allocation_id(service),
                    Token::attribute(reserved.for_service(service), "AllocationId"),
                    format!("{} reserved address allocation", service),
                );
            }
        }
    }

    if let (Some(instance), Some(address)) =
        (inputs.topology.dev_instance(), inputs.topology.dev_address())
    {
        published.insert(paths::dev_instance_id(), instance.instance_id(), "Dev instance id");
        published.insert(paths::dev_public_ip(), address.clone(), "Dev instance public address");
        published.insert(
            paths::dev_api_health_url(),
            Token::sub(format!("http://{}:{}{}", address, API.port, API.health_path)),
            "API health URL",
        );
        published.insert(
            paths::dev_gateway_docs_url(),
            Token::sub(format!("http://{}:{}{}", address, GATEWAY.port, GATEWAY.docs_path)),
            "Gateway docs URL",
        );
    }

    info!(
        topology = %kind,
        parameters = published.len(),
        "derived published parameters"
    );
    Ok(published)
}

/// Convenience URL outputs of the load-balanced shapes
pub fn declare_balancer_urls(
    graph: &mut ResourceGraph,
    topology: &ComputeTopology,
) -> InfrastructureResult<()> {
    let Some(balancer) = topology.balancer() else {
        return Ok(());
    };
    let base = format!("http://{}", balancer.dns_name());

    graph.add_output(
        &LogicalId::new("SwaggerAlbUrl")?,
        Token::sub(base.clone()),
        "Load balancer base URL",
    )?;
    graph.add_output(
        &LogicalId::new("FastAPISwaggerUrl")?,
        Token::sub(format!("{}{}", base, API.routed_docs_path())),
        "API docs through the load balancer",
    )?;
    graph.add_output(
        &LogicalId::new("GatewaySwaggerUrl")?,
        Token::sub(format!("{}{}", base, GATEWAY.routed_docs_path())),
        "Gateway docs through the load balancer",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        assert_eq!(paths::config_bucket().to_string(), "/infra/storage/config-bucket");
        assert_eq!(paths::target(ServiceKind::Gateway).to_string(), "/infra/targets/gateway");
        assert_eq!(
            paths::allocation_id(ServiceKind::Api).to_string(),
            "/infra/addresses/api-allocation-id"
        );
        assert_eq!(paths::dev_gateway_docs_url().to_string(), "/infra/dev/gateway-docs-url");
        assert_eq!(
            paths::scaling_group_name(ServiceKind::Api).to_string(),
            "/infra/targets/api-asg-name"
        );
        assert_eq!(
            paths::scaling_group_name(ServiceKind::Gateway).output_id().unwrap().as_str(),
            "TargetsGatewayAsgName"
        );
    }

    #[test]
    fn test_core_keys_match_paths() {
        let core: Vec<String> = [
            paths::config_bucket(),
            paths::internal_sg_id(),
            paths::key_name(),
            paths::persistent(),
        ]
        .iter()
        .map(|p| p.to_string())
        .collect();
        assert_eq!(core, CORE_KEYS.to_vec());
    }

    #[test]
    fn test_area_prefix() {
        assert_eq!(Area::Dev.prefix(), "/infra/dev/");
        assert!(paths::dev_public_ip().to_string().starts_with(&Area::Dev.prefix()));
    }

    #[test]
    fn test_ids() {
        let path = paths::config_bucket();
        assert_eq!(path.parameter_id().unwrap().as_str(), "ParamInfraStorageConfigBucket");
        assert_eq!(path.output_id().unwrap().as_str(), "StorageConfigBucket");
    }

    #[test]
    fn test_declare_parameters_and_outputs() {
        let mut published = PublishedParameters::new();
        published.insert(paths::persistent(), Token::literal("false"), "mode");
        published.insert(paths::topology(), Token::literal("fixed_pair"), "shape");

        let mut graph = ResourceGraph::new();
        published.declare(&mut graph).unwrap();

        assert_eq!(graph.count_of(ResourceType::Parameter), 2);
        let param = graph.get_by_name("ParamInfraModePersistent").unwrap();
        assert_eq!(param.properties["Type"], json!("String"));
        assert_eq!(param.properties["Value"], json!("false"));
        assert_eq!(graph.output("ModeTopology").unwrap().value, Token::literal("fixed_pair"));

        assert_eq!(
            published.to_string_map().get("/infra/mode/persistent"),
            Some(&"false".to_string())
        );
        assert_eq!(published.in_area(Area::Mode).len(), 2);
    }
}
