// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Component
//!
//! One flat VPC with public subnets only, spread over the first availability
//! zones of the region, and no NAT gateways. Every compute unit attaches to
//! these subnets; there is no private path.

use serde_json::json;

use crate::domain::{Ipv4Cidr, LogicalId, NetworkError, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};

/// Address block of the VPC
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";

/// Number of availability zones spanned
pub const DEFAULT_MAX_AZS: usize = 2;

/// Prefix length of each public subnet
pub const DEFAULT_SUBNET_PREFIX: u8 = 24;

/// Network shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    pub cidr: Ipv4Cidr,
    pub max_azs: usize,
    pub subnet_prefix: u8,
}

impl NetworkSpec {
    pub fn new(cidr: Ipv4Cidr, max_azs: usize, subnet_prefix: u8) -> Self {
        Self {
            cidr,
            max_azs,
            subnet_prefix,
        }
    }

    /// Default shape: `10.0.0.0/16`, two zones, `/24` subnets
    pub fn standard() -> Result<Self, NetworkError> {
        Ok(Self::new(
            Ipv4Cidr::new(DEFAULT_VPC_CIDR)?,
            DEFAULT_MAX_AZS,
            DEFAULT_SUBNET_PREFIX,
        ))
    }

    /// NAT gateways are never declared
    pub fn nat_gateways(&self) -> usize {
        0
    }

    /// Resolve the plan with concrete subnet blocks
    pub fn plan(&self) -> InfrastructureResult<NetworkPlan> {
        let vpc = LogicalId::new("AppVPC")?;
        let blocks = self.cidr.subnets(self.subnet_prefix, self.max_azs)?;

        let subnets = blocks
            .into_iter()
            .enumerate()
            .map(|(index, cidr)| {
                Ok(PublicSubnet {
                    id: vpc.child(&format!("publicSubnet{}", index + 1))?,
                    cidr,
                    zone_index: index,
                })
            })
            .collect::<InfrastructureResult<Vec<_>>>()?;

        Ok(NetworkPlan {
            internet_gateway: vpc.child("IGW")?,
            route_table: vpc.child("PublicRouteTable")?,
            vpc,
            cidr: self.cidr,
            subnets,
        })
    }
}

/// One public subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicSubnet {
    pub id: LogicalId,
    pub cidr: Ipv4Cidr,
    pub zone_index: usize,
}

/// Resolved network with logical ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlan {
    pub vpc: LogicalId,
    pub cidr: Ipv4Cidr,
    pub subnets: Vec<PublicSubnet>,
    pub internet_gateway: LogicalId,
    pub route_table: LogicalId,
}

impl NetworkPlan {
    /// Token for the VPC id
    pub fn vpc_id(&self) -> Token {
        Token::reference(&self.vpc)
    }

    /// Subnet id tokens as template JSON, in zone order
    pub fn subnet_ids(&self) -> Vec<serde_json::Value> {
        self.subnets
            .iter()
            .map(|s| Token::reference(&s.id).to_json())
            .collect()
    }

    /// Default internet route; internet-facing resources wait for it
    pub fn default_route(&self) -> InfrastructureResult<LogicalId> {
        Ok(self.route_table.child("DefaultRoute")?)
    }

    /// Subnet of the first zone, used by standalone instances
    pub fn first_subnet(&self) -> Option<&PublicSubnet> {
        self.subnets.first()
    }

    /// Declare VPC, gateway, route table and subnets
    pub fn declare(&self, graph: &mut ResourceGraph) -> InfrastructureResult<()> {
        graph.add(
            &self.vpc,
            Resource::new(
                ResourceType::Vpc,
                json!({
                    "CidrBlock": self.cidr.as_cidr(),
                    "EnableDnsHostnames": true,
                    "EnableDnsSupport": true,
                    "InstanceTenancy": "default",
                }),
            ),
        )?;

        graph.add(
            &self.internet_gateway,
            Resource::new(ResourceType::InternetGateway, json!({})),
        )?;

        let attachment = self.vpc.child("VPCGW")?;
        graph.add(
            &attachment,
            Resource::new(
                ResourceType::GatewayAttachment,
                json!({
                    "VpcId": self.vpc_id().to_json(),
                    "InternetGatewayId": Token::reference(&self.internet_gateway).to_json(),
                }),
            ),
        )?;

        graph.add(
            &self.route_table,
            Resource::new(
                ResourceType::RouteTable,
                json!({ "VpcId": self.vpc_id().to_json() }),
            ),
        )?;

        graph.add(
            &self.default_route()?,
            Resource::new(
                ResourceType::Route,
                json!({
                    "RouteTableId": Token::reference(&self.route_table).to_json(),
                    "DestinationCidrBlock": Ipv4Cidr::ANY.as_cidr(),
                    "GatewayId": Token::reference(&self.internet_gateway).to_json(),
                }),
            )
            .depends_on(&attachment),
        )?;

        for subnet in &self.subnets {
            graph.add(
                &subnet.id,
                Resource::new(
                    ResourceType::Subnet,
                    json!({
                        "VpcId": self.vpc_id().to_json(),
                        "CidrBlock": subnet.cidr.as_cidr(),
                        "AvailabilityZone": {
                            "Fn::Select": [subnet.zone_index, { "Fn::GetAZs": "" }]
                        },
                        "MapPublicIpOnLaunch": true,
                    }),
                ),
            )?;

            graph.add(
                &subnet.id.child("RouteTableAssociation")?,
                Resource::new(
                    ResourceType::SubnetRouteTableAssociation,
                    json!({
                        "SubnetId": Token::reference(&subnet.id).to_json(),
                        "RouteTableId": Token::reference(&self.route_table).to_json(),
                    }),
                ),
            )?;
        }

        Ok(())
    }
}
