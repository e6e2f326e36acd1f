// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declarable Resource Type Model
//!
//! The closed vocabulary of resource kinds a stack may declare, with the type
//! names the provisioning engine expects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declarable resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    // Storage
    /// Object storage bucket
    Bucket,
    /// Bucket access policy
    BucketPolicy,
    /// Custom resource emptying a bucket before it is deleted
    BucketCleanup,

    // Network
    /// Virtual private cloud
    Vpc,
    /// Subnet inside the VPC
    Subnet,
    /// Internet gateway
    InternetGateway,
    /// Gateway to VPC attachment
    GatewayAttachment,
    /// Route table
    RouteTable,
    /// Single route
    Route,
    /// Subnet to route table association
    SubnetRouteTableAssociation,
    /// Security group
    SecurityGroup,
    /// Stand-alone ingress rule
    SecurityGroupIngress,
    /// Reserved public address
    ElasticIp,
    /// Reserved address to instance binding
    ElasticIpAssociation,

    // Identity
    /// Execution role
    Role,
    /// Instance profile wrapping a role
    InstanceProfile,
    /// SSH key pair
    KeyPair,

    // Compute
    /// Launch template
    LaunchTemplate,
    /// Auto scaling group
    AutoScalingGroup,
    /// Standalone instance
    Instance,
    /// Serverless function
    Function,

    // Load balancing
    /// Application load balancer
    LoadBalancer,
    /// Backend target group
    TargetGroup,
    /// Listener
    Listener,
    /// Path-routing listener rule
    ListenerRule,

    // Parameters and management
    /// Published key/value parameter
    Parameter,
    /// Management command document
    ManagementDocument,

    // Content delivery
    /// CDN distribution
    Distribution,
    /// CDN origin access control
    OriginAccessControl,
}

impl ResourceType {
    /// Every kind, in declaration order
    pub const ALL: [ResourceType; 29] = [
        Self::Bucket,
        Self::BucketPolicy,
        Self::BucketCleanup,
        Self::Vpc,
        Self::Subnet,
        Self::InternetGateway,
        Self::GatewayAttachment,
        Self::RouteTable,
        Self::Route,
        Self::SubnetRouteTableAssociation,
        Self::SecurityGroup,
        Self::SecurityGroupIngress,
        Self::ElasticIp,
        Self::ElasticIpAssociation,
        Self::Role,
        Self::InstanceProfile,
        Self::KeyPair,
        Self::LaunchTemplate,
        Self::AutoScalingGroup,
        Self::Instance,
        Self::Function,
        Self::LoadBalancer,
        Self::TargetGroup,
        Self::Listener,
        Self::ListenerRule,
        Self::Parameter,
        Self::ManagementDocument,
        Self::Distribution,
        Self::OriginAccessControl,
    ];

    /// Type name understood by the provisioning engine
    pub fn cloudformation_type(&self) -> &'static str {
        match self {
            Self::Bucket => "AWS::S3::Bucket",
            Self::BucketPolicy => "AWS::S3::BucketPolicy",
            Self::BucketCleanup => "Custom::S3AutoDeleteObjects",
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::GatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::Route => "AWS::EC2::Route",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::ElasticIp => "AWS::EC2::EIP",
            Self::ElasticIpAssociation => "AWS::EC2::EIPAssociation",
            Self::Role => "AWS::IAM::Role",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
            Self::KeyPair => "AWS::EC2::KeyPair",
            Self::LaunchTemplate => "AWS::EC2::LaunchTemplate",
            Self::AutoScalingGroup => "AWS::AutoScaling::AutoScalingGroup",
            Self::Instance => "AWS::EC2::Instance",
            Self::Function => "AWS::Lambda::Function",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::ListenerRule => "AWS::ElasticLoadBalancingV2::ListenerRule",
            Self::Parameter => "AWS::SSM::Parameter",
            Self::ManagementDocument => "AWS::SSM::Document",
            Self::Distribution => "AWS::CloudFront::Distribution",
            Self::OriginAccessControl => "AWS::CloudFront::OriginAccessControl",
        }
    }

    /// Parse from a provisioning engine type name
    pub fn from_cloudformation_type(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.cloudformation_type() == s)
    }

    /// Get the resource category
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Bucket | Self::BucketPolicy | Self::BucketCleanup => ResourceCategory::Storage,
            Self::Vpc
            | Self::Subnet
            | Self::InternetGateway
            | Self::GatewayAttachment
            | Self::RouteTable
            | Self::Route
            | Self::SubnetRouteTableAssociation
            | Self::ElasticIp
            | Self::ElasticIpAssociation => ResourceCategory::Network,
            Self::SecurityGroup | Self::SecurityGroupIngress => ResourceCategory::Security,
            Self::Role | Self::InstanceProfile | Self::KeyPair => ResourceCategory::Identity,
            Self::LaunchTemplate | Self::AutoScalingGroup | Self::Instance | Self::Function => {
                ResourceCategory::Compute
            }
            Self::LoadBalancer | Self::TargetGroup | Self::Listener | Self::ListenerRule => {
                ResourceCategory::LoadBalancing
            }
            Self::Parameter | Self::ManagementDocument => ResourceCategory::Management,
            Self::Distribution | Self::OriginAccessControl => ResourceCategory::ContentDelivery,
        }
    }

    /// Whether this kind only exists on a load-balanced path
    pub fn is_load_balancing(&self) -> bool {
        self.category() == ResourceCategory::LoadBalancing
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cloudformation_type())
    }
}

/// Resource category for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Storage,
    Network,
    Security,
    Identity,
    Compute,
    LoadBalancing,
    Management,
    ContentDelivery,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(ResourceType::Vpc.cloudformation_type(), "AWS::EC2::VPC");
        assert_eq!(
            ResourceType::LoadBalancer.cloudformation_type(),
            "AWS::ElasticLoadBalancingV2::LoadBalancer"
        );
        assert_eq!(ResourceType::Parameter.to_string(), "AWS::SSM::Parameter");
    }

    #[test]
    fn test_type_name_lookup_covers_all() {
        for kind in ResourceType::ALL {
            assert_eq!(
                ResourceType::from_cloudformation_type(kind.cloudformation_type()),
                Some(kind)
            );
        }
        assert_eq!(ResourceType::from_cloudformation_type("AWS::Nope::Thing"), None);
    }

    #[test]
    fn test_categories() {
        assert!(ResourceType::TargetGroup.is_load_balancing());
        assert!(ResourceType::ListenerRule.is_load_balancing());
        assert!(!ResourceType::Instance.is_load_balancing());
        assert_eq!(ResourceType::KeyPair.category(), ResourceCategory::Identity);
        assert_eq!(ResourceType::SecurityGroupIngress.category(), ResourceCategory::Security);
    }
}
