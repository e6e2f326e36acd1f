// Copyright (c) 2025 - Cowboy AI, Inc.
//! Identity Component
//!
//! Execution role for every compute unit: the management agent baseline,
//! read access to the config bucket, and read access to the `app/`
//! parameter and secret namespaces.

use serde_json::json;

use crate::domain::{LogicalId, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};

/// Managed policy granting the management agent its baseline access
pub const MANAGEMENT_AGENT_POLICY: &str = "AmazonSSMManagedInstanceCore";

/// Parameter namespace the services may read
pub const APP_PARAMETER_PREFIX: &str = "app/";

/// Secret namespace the services may read
pub const APP_SECRET_PREFIX: &str = "app/";

/// Actions on the config bucket
pub const BUCKET_READ_ACTIONS: [&str; 3] = ["s3:GetObject*", "s3:GetBucket*", "s3:List*"];

/// Actions on the parameter and secret namespaces
pub const CONFIG_READ_ACTIONS: [&str; 5] = [
    "ssm:GetParameter",
    "ssm:GetParameters",
    "ssm:GetParametersByPath",
    "secretsmanager:GetSecretValue",
    "secretsmanager:DescribeSecret",
];

/// Role plus instance profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRole {
    pub role: LogicalId,
    pub instance_profile: LogicalId,
}

impl ExecutionRole {
    pub fn new() -> InfrastructureResult<Self> {
        Ok(Self {
            role: LogicalId::new("EC2Role")?,
            instance_profile: LogicalId::new("EC2InstanceProfile")?,
        })
    }

    /// Declare role and profile; `bucket` is the config bucket's logical id
    pub fn declare(&self, graph: &mut ResourceGraph, bucket: &LogicalId) -> InfrastructureResult<()> {
        let bucket_arn = Token::attribute(bucket, "Arn").to_json();
        let bucket_objects = Token::sub(format!("${{{}.Arn}}/*", bucket)).to_json();

        graph.add(
            &self.role,
            Resource::new(
                ResourceType::Role,
                json!({
                    "AssumeRolePolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": { "Service": "ec2.amazonaws.com" },
                            "Action": "sts:AssumeRole",
                        }],
                    },
                    "ManagedPolicyArns": [
                        Token::sub(format!(
                            "arn:${{AWS::Partition}}:iam::aws:policy/{}",
                            MANAGEMENT_AGENT_POLICY
                        ))
                        .to_json(),
                    ],
                    "Policies": [
                        {
                            "PolicyName": "ConfigBucketRead",
                            "PolicyDocument": {
                                "Version": "2012-10-17",
                                "Statement": [{
                                    "Effect": "Allow",
                                    "Action": BUCKET_READ_ACTIONS,
                                    "Resource": [bucket_arn, bucket_objects],
                                }],
                            },
                        },
                        {
                            "PolicyName": "AppConfigRead",
                            "PolicyDocument": {
                                "Version": "2012-10-17",
                                "Statement": [{
                                    "Effect": "Allow",
                                    "Action": CONFIG_READ_ACTIONS,
                                    "Resource": [
                                        Token::sub(format!(
                                            "arn:${{AWS::Partition}}:ssm:${{AWS::Region}}:${{AWS::AccountId}}:parameter/{}*",
                                            APP_PARAMETER_PREFIX
                                        ))
                                        .to_json(),
                                        Token::sub(format!(
                                            "arn:${{AWS::Partition}}:secretsmanager:${{AWS::Region}}:${{AWS::AccountId}}:secret:{}*",
                                            APP_SECRET_PREFIX
                                        ))
                                        .to_json(),
                                    ],
                                }],
                            },
                        },
                    ],
                }),
            ),
        )?;

        graph.add(
            &self.instance_profile,
            Resource::new(
                ResourceType::InstanceProfile,
                json!({ "Roles": [Token::reference(&self.role).to_json()] }),
            ),
        )
    }
}
