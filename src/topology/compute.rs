// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute units: standalone instances and single-instance scaling groups

use serde_json::{json, Value};

use crate::bootstrap::BootPayload;
use crate::config::Architecture;
use crate::domain::{LogicalId, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};
use crate::service::ServiceKind;

/// Public parameter tree holding the latest Amazon Linux 2023 images
pub const IMAGE_PARAMETER_PREFIX: &str = "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default";

/// Seconds a new scaling group instance is spared from health checks
pub const HEALTH_CHECK_GRACE_SECS: u32 = 300;

/// Machine image, resolved by the engine from the architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineImage {
    pub architecture: Architecture,
}

impl MachineImage {
    pub fn for_architecture(architecture: Architecture) -> Self {
        Self { architecture }
    }

    /// Public parameter the image id is read from
    pub fn parameter_name(&self) -> String {
        format!("{}-{}", IMAGE_PARAMETER_PREFIX, self.architecture.image_suffix())
    }

    /// Dynamic reference the engine resolves at apply time
    pub fn image_id(&self) -> Token {
        Token::literal(format!("{{{{resolve:ssm:{}}}}}", self.parameter_name()))
    }
}

/// What a compute unit runs; decides its size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    Single(ServiceKind),
    Consolidated,
}

impl Workload {
    /// Instance type for the workload on an architecture
    pub fn instance_type(&self, architecture: Architecture) -> &'static str {
        match (self, architecture) {
            (Self::Single(ServiceKind::Api), Architecture::Arm64) => "t4g.micro",
            (Self::Single(ServiceKind::Api), Architecture::X86_64) => "t3.micro",
            (_, Architecture::Arm64) => "t4g.medium",
            (_, Architecture::X86_64) => "t3.medium",
        }
    }

    /// Services started on the unit
    pub fn services(&self) -> Vec<ServiceKind> {
        match self {
            Self::Single(kind) => vec![*kind],
            Self::Consolidated => ServiceKind::BOTH.to_vec(),
        }
    }
}

/// Everything one instance binds: image, size, policy, payload, key, role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeUnit {
    pub id: LogicalId,
    pub workload: Workload,
    pub image: MachineImage,
    pub instance_type: String,
    pub security_group: LogicalId,
    pub payload: BootPayload,
    pub key_name: Token,
    pub instance_profile: LogicalId,
    pub subnet: LogicalId,
}

impl ComputeUnit {
    /// Token for the instance id
    pub fn instance_id(&self) -> Token {
        Token::reference(&self.id)
    }

    /// Token for the instance's public address
    pub fn public_ip(&self) -> Token {
        Token::attribute(&self.id, "PublicIp")
    }

    fn security_group_ids(&self) -> Value {
        json!([Token::attribute(&self.security_group, "GroupId").to_json()])
    }

    /// Properties shared by instances and launch templates
    fn machine_properties(&self) -> Value {
        json!({
            "ImageId": self.image.image_id().to_json(),
            "InstanceType": self.instance_type,
            "KeyName": self.key_name.to_json(),
            "SecurityGroupIds": self.security_group_ids(),
            "UserData": self.payload.user_data(),
        })
    }

    /// Launch template data for a scaling group
    pub fn launch_template_data(&self) -> Value {
        let mut data = self.machine_properties();
        data["IamInstanceProfile"] =
            json!({ "Arn": Token::attribute(&self.instance_profile, "Arn").to_json() });
        data["Monitoring"] = json!({ "Enabled": true });
        data
    }

    /// Declare a standalone instance
    pub fn declare(&self, graph: &mut ResourceGraph) -> InfrastructureResult<()> {
        let mut properties = self.machine_properties();
        properties["IamInstanceProfile"] = Token::reference(&self.instance_profile).to_json();
        properties["SubnetId"] = Token::reference(&self.subnet).to_json();
        properties["Tags"] = json!([{ "Key": "Name", "Value": self.id.as_str() }]);

        graph.add(&self.id, Resource::new(ResourceType::Instance, properties))
    }
}

/// Scaling group bounds; `max == desired == 1` for every group declared here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub min: u32,
    pub max: u32,
    pub desired: u32,
}

impl Capacity {
    /// A supervised single instance
    pub const SUPERVISED_SINGLE: Capacity = Capacity {
        min: 1,
        max: 1,
        desired: 1,
    };
}

/// One service as a launch template plus a scaling group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingGroup {
    pub id: LogicalId,
    pub launch_template: LogicalId,
    pub unit: ComputeUnit,
    pub capacity: Capacity,
    pub subnets: Vec<LogicalId>,
    pub target_group: LogicalId,
}

impl ScalingGroup {
    /// Token for the group name
    pub fn group_name(&self) -> Token {
        Token::reference(&self.id)
    }

    /// Declare launch template and group; the group is retained on delete
    pub fn declare(&self, graph: &mut ResourceGraph) -> InfrastructureResult<()> {
        graph.add(
            &self.launch_template,
            Resource::new(
                ResourceType::LaunchTemplate,
                json!({ "LaunchTemplateData": self.unit.launch_template_data() }),
            ),
        )?;

        let subnets: Vec<Value> = self
            .subnets
            .iter()
            .map(|id| Token::reference(id).to_json())
            .collect();

        graph.add(
            &self.id,
            Resource::new(
                ResourceType::AutoScalingGroup,
                json!({
                    "MinSize": self.capacity.min.to_string(),
                    "MaxSize": self.capacity.max.to_string(),
                    "DesiredCapacity": self.capacity.desired.to_string(),
                    "LaunchTemplate": {
                        "LaunchTemplateId": Token::reference(&self.launch_template).to_json(),
                        "Version": Token::attribute(&self.launch_template, "LatestVersionNumber").to_json(),
                    },
                    "VPCZoneIdentifier": subnets,
                    "HealthCheckType": "EC2",
                    "HealthCheckGracePeriod": HEALTH_CHECK_GRACE_SECS,
                    "TargetGroupARNs": [Token::reference(&self.target_group).to_json()],
                }),
            )
            .retained(),
        )
    }
}
