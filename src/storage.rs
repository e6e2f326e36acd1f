// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration bucket holding each service's compose bundle

use serde_json::json;

use crate::domain::{LogicalId, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};

/// Logical id of the config bucket
pub const CONFIG_BUCKET_ID: &str = "AppConfigBucket";

/// Versioned, encrypted, private, and kept when the stack is deleted
pub fn declare_config_bucket(graph: &mut ResourceGraph) -> InfrastructureResult<LogicalId> {
    let id = LogicalId::new(CONFIG_BUCKET_ID)?;
    graph.add(
        &id,
        Resource::new(
            ResourceType::Bucket,
            json!({
                "VersioningConfiguration": { "Status": "Enabled" },
                "BucketEncryption": {
                    "ServerSideEncryptionConfiguration": [{
                        "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                    }]
                },
                "PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true,
                },
            }),
        )
        .retained(),
    )?;
    Ok(id)
}

/// Token for the bucket name
pub fn bucket_name(id: &LogicalId) -> Token {
    Token::reference(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RemovalPolicy;

    #[test]
    fn test_bucket_is_private_versioned_and_retained() {
        let mut graph = ResourceGraph::new();
        let id = declare_config_bucket(&mut graph).unwrap();
        let bucket = graph.get(&id).unwrap();

        assert_eq!(bucket.removal, RemovalPolicy::Retain);
        assert_eq!(bucket.properties["VersioningConfiguration"]["Status"], json!("Enabled"));
        assert_eq!(
            bucket.properties["PublicAccessBlockConfiguration"]["BlockPublicPolicy"],
            json!(true)
        );
        assert_eq!(bucket_name(&id).to_string(), "${AppConfigBucket}");
    }
}
