// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Topology
//!
//! The one decision point of the stack. The flags select exactly one shape,
//! once, at synthesis time:
//!
//! ```text
//! persistent_mode = true                     → SingleDev
//! persistent_mode = false, fleet_mode = autoscaled → Autoscaled
//! persistent_mode = false, fleet_mode = fixed_pair → FixedPair
//! ```
//!
//! The two load-balanced shapes share the same path-routing contract and
//! differ only in how targets register. The dev shape has no balancer; its
//! ports are reached directly.

pub mod compute;
pub mod load_balancing;

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::info;

use crate::bootstrap::BootPayload;
use crate::config::{FleetMode, StackConfig};
use crate::domain::{LogicalId, ResourceType};
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::graph::{Resource, ResourceGraph, Token};
use crate::identity::ExecutionRole;
use crate::service::{ServiceKind, ServiceSpec, API, GATEWAY};
use crate::vpc::NetworkPlan;

pub use compute::{Capacity, ComputeUnit, MachineImage, ScalingGroup, Workload};
pub use load_balancing::{LoadBalancingPath, PathRoute, RouteDecision, TargetGroupPlan, TargetRegistration};

/// Which shape a deployment takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    Autoscaled,
    FixedPair,
    SingleDev,
}

impl TopologyKind {
    pub const ALL: [TopologyKind; 3] = [Self::Autoscaled, Self::FixedPair, Self::SingleDev];

    /// Whether traffic enters through the load balancer
    pub fn is_load_balanced(&self) -> bool {
        !matches!(self, Self::SingleDev)
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Autoscaled => write!(f, "autoscaled"),
            Self::FixedPair => write!(f, "fixed_pair"),
            Self::SingleDev => write!(f, "single_dev"),
        }
    }
}

/// Select the topology from the flags
pub fn select_topology(config: &StackConfig) -> TopologyKind {
    if config.persistent_mode {
        return TopologyKind::SingleDev;
    }
    match config.fleet_mode {
        FleetMode::Autoscaled => TopologyKind::Autoscaled,
        FleetMode::FixedPair => TopologyKind::FixedPair,
    }
}

/// Reserved addresses of the two services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedAddresses {
    pub api: LogicalId,
    pub gateway: LogicalId,
}

impl ReservedAddresses {
    fn plan() -> InfrastructureResult<Self> {
        Ok(Self {
            api: reserved_ip_id(&API)?,
            gateway: reserved_ip_id(&GATEWAY)?,
        })
    }

    /// Address of one service
    pub fn for_service(&self, service: ServiceKind) -> &LogicalId {
        match service {
            ServiceKind::Api => &self.api,
            ServiceKind::Gateway => &self.gateway,
        }
    }
}

fn reserved_ip_id(spec: &ServiceSpec) -> InfrastructureResult<LogicalId> {
    Ok(LogicalId::new(format!("{}EIP", spec.id_prefix))?)
}

/// Resources every compute unit binds to
#[derive(Debug, Clone)]
pub struct TopologyInputs<'a> {
    pub config: &'a StackConfig,
    pub network: &'a NetworkPlan,
    pub internal_group: &'a LogicalId,
    /// Present for load-balanced shapes
    pub edge_group: Option<&'a LogicalId>,
    pub role: &'a ExecutionRole,
    pub key_name: Token,
    pub bucket: &'a LogicalId,
}

impl TopologyInputs<'_> {
    fn unit(&self, id: LogicalId, workload: Workload, zone: usize) -> InfrastructureResult<ComputeUnit> {
        let subnets = &self.network.subnets;
        let subnet = subnets
            .get(zone % subnets.len().max(1))
            .ok_or_else(|| InfrastructureError::Configuration("network has no subnets".to_string()))?;

        Ok(ComputeUnit {
            id,
            workload,
            image: MachineImage::for_architecture(self.config.architecture),
            instance_type: workload.instance_type(self.config.architecture).to_string(),
            security_group: self.internal_group.clone(),
            payload: BootPayload::consolidated(&workload.services(), self.bucket),
            key_name: self.key_name.clone(),
            instance_profile: self.role.instance_profile.clone(),
            subnet: subnet.id.clone(),
        })
    }

    fn subnet_ids(&self) -> Vec<LogicalId> {
        self.network.subnets.iter().map(|s| s.id.clone()).collect()
    }

    fn edge_group(&self) -> InfrastructureResult<&LogicalId> {
        self.edge_group.ok_or_else(|| {
            InfrastructureError::Configuration(
                "load-balanced topology requires an edge security group".to_string(),
            )
        })
    }
}

/// The selected shape with everything it declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeTopology {
    Autoscaled {
        api: ScalingGroup,
        gateway: ScalingGroup,
        balancer: LoadBalancingPath,
        reserved: Option<ReservedAddresses>,
    },
    FixedPair {
        api: ComputeUnit,
        gateway: ComputeUnit,
        balancer: LoadBalancingPath,
        reserved: Option<ReservedAddresses>,
    },
    SingleDev {
        instance: ComputeUnit,
        reserved_ip: Option<LogicalId>,
    },
}

impl ComputeTopology {
    /// Plan the shape selected by the flags
    pub fn plan(inputs: &TopologyInputs<'_>) -> InfrastructureResult<Self> {
        let kind = select_topology(inputs.config);
        let reserve = inputs.config.use_reserved_ip;
        info!(topology = %kind, reserved_ip = reserve, "selected compute topology");

        match kind {
            TopologyKind::Autoscaled => {
                let group = |spec: &ServiceSpec, zone: usize| -> InfrastructureResult<ScalingGroup> {
                    let instance = LogicalId::new(format!("{}Instance", spec.id_prefix))?;
                    Ok(ScalingGroup {
                        id: LogicalId::new(format!("{}ASG", spec.id_prefix))?,
                        launch_template: LogicalId::new(format!("{}LaunchTemplate", spec.id_prefix))?,
                        unit: inputs.unit(instance, Workload::Single(spec.kind), zone)?,
                        capacity: Capacity::SUPERVISED_SINGLE,
                        subnets: inputs.subnet_ids(),
                        target_group: LogicalId::new(format!("{}TG", spec.id_prefix))?,
                    })
                };
                let api = group(&API, 0)?;
                let gateway = group(&GATEWAY, 1)?;

                let balancer = LoadBalancingPath::plan(
                    inputs.edge_group()?,
                    inputs.config.expose_publicly,
                    inputs.subnet_ids(),
                    |spec| {
                        Ok(TargetRegistration::ScalingGroup(LogicalId::new(format!(
                            "{}ASG",
                            spec.id_prefix
                        ))?))
                    },
                )?;

                Ok(Self::Autoscaled {
                    api,
                    gateway,
                    balancer,
                    reserved: reserve.then(ReservedAddresses::plan).transpose()?,
                })
            }
            TopologyKind::FixedPair => {
                let unit = |spec: &ServiceSpec, zone: usize| -> InfrastructureResult<ComputeUnit> {
                    let id = LogicalId::new(format!("{}Instance", spec.id_prefix))?;
                    inputs.unit(id, Workload::Single(spec.kind), zone)
                };
                let api = unit(&API, 0)?;
                let gateway = unit(&GATEWAY, 1)?;

                let balancer = LoadBalancingPath::plan(
                    inputs.edge_group()?,
                    inputs.config.expose_publicly,
                    inputs.subnet_ids(),
                    |spec| {
                        let id = match spec.kind {
                            ServiceKind::Api => &api.id,
                            ServiceKind::Gateway => &gateway.id,
                        };
                        Ok(TargetRegistration::Instance(id.clone()))
                    },
                )?;

                Ok(Self::FixedPair {
                    api,
                    gateway,
                    balancer,
                    reserved: reserve.then(ReservedAddresses::plan).transpose()?,
                })
            }
            TopologyKind::SingleDev => {
                let id = LogicalId::new("DevInstance")?;
                Ok(Self::SingleDev {
                    instance: inputs.unit(id, Workload::Consolidated, 0)?,
                    reserved_ip: reserve.then(|| LogicalId::new("DevEIP")).transpose()?,
                })
            }
        }
    }

    /// Shape of this topology
    pub fn kind(&self) -> TopologyKind {
        match self {
            Self::Autoscaled { .. } => TopologyKind::Autoscaled,
            Self::FixedPair { .. } => TopologyKind::FixedPair,
            Self::SingleDev { .. } => TopologyKind::SingleDev,
        }
    }

    /// Load balancing path, absent under SingleDev
    pub fn balancer(&self) -> Option<&LoadBalancingPath> {
        match self {
            Self::Autoscaled { balancer, .. } | Self::FixedPair { balancer, .. } => Some(balancer),
            Self::SingleDev { .. } => None,
        }
    }

    /// Every compute unit, scaling groups' templates included
    pub fn compute_units(&self) -> Vec<&ComputeUnit> {
        match self {
            Self::Autoscaled { api, gateway, .. } => vec![&api.unit, &gateway.unit],
            Self::FixedPair { api, gateway, .. } => vec![api, gateway],
            Self::SingleDev { instance, .. } => vec![instance],
        }
    }

    /// What `/infra/targets/<service>` publishes: the target group ARN under
    /// Autoscaled, the instance id under FixedPair
    pub fn target_identifier(&self, service: ServiceKind) -> Option<Token> {
        match self {
            Self::Autoscaled { balancer, .. } => balancer.target_group(service).map(|tg| tg.arn()),
            Self::FixedPair { api, gateway, .. } => Some(match service {
                ServiceKind::Api => api.instance_id(),
                ServiceKind::Gateway => gateway.instance_id(),
            }),
            Self::SingleDev { .. } => None,
        }
    }

    /// Scaling group of one service, Autoscaled only
    pub fn scaling_group(&self, service: ServiceKind) -> Option<&ScalingGroup> {
        match self {
            Self::Autoscaled { api, gateway, .. } => Some(match service {
                ServiceKind::Api => api,
                ServiceKind::Gateway => gateway,
            }),
            _ => None,
        }
    }

    /// Reserved addresses of the load-balanced shapes
    pub fn reserved_addresses(&self) -> Option<&ReservedAddresses> {
        match self {
            Self::Autoscaled { reserved, .. } | Self::FixedPair { reserved, .. } => reserved.as_ref(),
            Self::SingleDev { .. } => None,
        }
    }

    /// The dev instance, if this is the dev shape
    pub fn dev_instance(&self) -> Option<&ComputeUnit> {
        match self {
            Self::SingleDev { instance, .. } => Some(instance),
            _ => None,
        }
    }

    /// Public address of the dev instance; the reserved address when present
    pub fn dev_address(&self) -> Option<Token> {
        match self {
            Self::SingleDev {
                reserved_ip: Some(eip),
                ..
            } => Some(Token::reference(eip)),
            Self::SingleDev { instance, .. } => Some(instance.public_ip()),
            _ => None,
        }
    }

    /// Declare compute, balancing and reserved addresses
    pub fn declare(&self, graph: &mut ResourceGraph, network: &NetworkPlan) -> InfrastructureResult<()> {
        match self {
            Self::Autoscaled {
                api,
                gateway,
                balancer,
                reserved,
            } => {
                balancer.declare(graph, &network.vpc, &network.default_route()?)?;
                api.declare(graph)?;
                gateway.declare(graph)?;
                if let Some(reserved) = reserved {
                    declare_address(graph, &reserved.api, None)?;
                    declare_address(graph, &reserved.gateway, None)?;
                }
            }
            Self::FixedPair {
                api,
                gateway,
                balancer,
                reserved,
            } => {
                api.declare(graph)?;
                gateway.declare(graph)?;
                balancer.declare(graph, &network.vpc, &network.default_route()?)?;
                if let Some(reserved) = reserved {
                    declare_address(graph, &reserved.api, Some(&api.id))?;
                    declare_address(graph, &reserved.gateway, Some(&gateway.id))?;
                }
            }
            Self::SingleDev {
                instance,
                reserved_ip,
            } => {
                instance.declare(graph)?;
                if let Some(eip) = reserved_ip {
                    declare_address(graph, eip, Some(&instance.id))?;
                }
            }
        }
        Ok(())
    }
}

/// Declare a VPC address, associated with an instance when one is given
fn declare_address(
    graph: &mut ResourceGraph,
    id: &LogicalId,
    instance: Option<&LogicalId>,
) -> InfrastructureResult<()> {
    graph.add(id, Resource::new(ResourceType::ElasticIp, json!({ "Domain": "vpc" })))?;

    if let Some(instance) = instance {
        graph.add(
            &id.child("Association")?,
            Resource::new(
                ResourceType::ElasticIpAssociation,
                json!({
                    "AllocationId": Token::attribute(id, "AllocationId").to_json(),
                    "InstanceId": Token::reference(instance).to_json(),
                }),
            ),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpc::NetworkSpec;

    struct Fixture {
        network: NetworkPlan,
        internal: LogicalId,
        edge: LogicalId,
        role: ExecutionRole,
        bucket: LogicalId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                network: NetworkSpec::standard().unwrap().plan().unwrap(),
                internal: LogicalId::new("InternalSG").unwrap(),
                edge: LogicalId::new("AlbSG").unwrap(),
                role: ExecutionRole::new().unwrap(),
                bucket: LogicalId::new("AppConfigBucket").unwrap(),
            }
        }

        fn plan(&self, config: &StackConfig) -> ComputeTopology {
            let inputs = TopologyInputs {
                config,
                network: &self.network,
                internal_group: &self.internal,
                edge_group: select_topology(config).is_load_balanced().then_some(&self.edge),
                role: &self.role,
                key_name: Token::literal("debug-key"),
                bucket: &self.bucket,
            };
            ComputeTopology::plan(&inputs).unwrap()
        }
    }

    #[test]
    fn test_selection_rule() {
        let config = StackConfig::default();
        assert_eq!(select_topology(&config), TopologyKind::FixedPair);
        assert_eq!(
            select_topology(&config.clone().with_fleet_mode(FleetMode::Autoscaled)),
            TopologyKind::Autoscaled
        );
        assert_eq!(
            select_topology(
                &config
                    .with_fleet_mode(FleetMode::Autoscaled)
                    .with_persistent_mode(true)
            ),
            TopologyKind::SingleDev
        );
    }

    #[test]
    fn test_fixed_pair_targets_are_instances() {
        let fixture = Fixture::new();
        let topology = fixture.plan(&StackConfig::default());

        assert_eq!(topology.kind(), TopologyKind::FixedPair);
        assert_eq!(
            topology.target_identifier(ServiceKind::Api),
            Some(Token::reference(&LogicalId::new("FastAPIInstance").unwrap()))
        );
        let balancer = topology.balancer().unwrap();
        assert!(matches!(
            &balancer.target_group(ServiceKind::Gateway).unwrap().registration,
            TargetRegistration::Instance(id) if id.as_str() == "GatewayInstance"
        ));
    }

    #[test]
    fn test_autoscaled_targets_are_groups() {
        let fixture = Fixture::new();
        let config = StackConfig::default().with_fleet_mode(FleetMode::Autoscaled);
        let topology = fixture.plan(&config);

        assert_eq!(
            topology.target_identifier(ServiceKind::Gateway),
            Some(Token::reference(&LogicalId::new("GatewayTG").unwrap()))
        );

        let mut graph = ResourceGraph::new();
        topology.declare(&mut graph, &fixture.network).unwrap();
        assert_eq!(graph.count_of(ResourceType::AutoScalingGroup), 2);
        assert_eq!(graph.count_of(ResourceType::Instance), 0);
        assert_eq!(graph.count_of(ResourceType::LaunchTemplate), 2);

        let asg = graph.get_by_name("FastAPIASG").unwrap();
        assert_eq!(asg.properties["MaxSize"], json!("1"));
        assert_eq!(asg.properties["HealthCheckGracePeriod"], json!(300));
    }

    #[test]
    fn test_single_dev_has_no_balancer() {
        let fixture = Fixture::new();
        let config = StackConfig::default().with_persistent_mode(true);
        let topology = fixture.plan(&config);

        assert!(topology.balancer().is_none());
        assert_eq!(topology.compute_units().len(), 1);
        assert_eq!(topology.compute_units()[0].instance_type, "t4g.medium");
        assert_eq!(
            topology.compute_units()[0].payload.services,
            ServiceKind::BOTH.to_vec()
        );
        assert_eq!(topology.dev_address().unwrap().to_string(), "${DevInstance.PublicIp}");
    }

    #[test]
    fn test_reserved_address_becomes_dev_address() {
        let fixture = Fixture::new();
        let config = StackConfig::default()
            .with_persistent_mode(true)
            .with_reserved_ip(true);
        let topology = fixture.plan(&config);
        assert_eq!(topology.dev_address().unwrap().to_string(), "${DevEIP}");

        let mut graph = ResourceGraph::new();
        topology.declare(&mut graph, &fixture.network).unwrap();
        assert_eq!(graph.count_of(ResourceType::ElasticIp), 1);
        assert_eq!(graph.count_of(ResourceType::ElasticIpAssociation), 1);
    }

    #[test]
    fn test_load_balanced_requires_edge_group() {
        let fixture = Fixture::new();
        let config = StackConfig::default();
        let inputs = TopologyInputs {
            config: &config,
            network: &fixture.network,
            internal_group: &fixture.internal,
            edge_group: None,
            role: &fixture.role,
            key_name: Token::literal("debug-key"),
            bucket: &fixture.bucket,
        };
        assert!(matches!(
            ComputeTopology::plan(&inputs),
            Err(InfrastructureError::Configuration(_))
        ));
    }
}
