// Copyright (c) 2025 - Cowboy AI, Inc.
//! Frontend Stack
//!
//! Static site hosting, independent of the service stack: a private bucket
//! served only through a CDN distribution that reads it with an origin
//! access control. A cleanup function empties the bucket on stack deletion
//! so the bucket itself can be removed.

use serde_json::json;
use tracing::info;

use crate::domain::{LogicalId, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};

/// Description of the rendered template
pub const FRONTEND_DESCRIPTION: &str = "Static frontend bucket behind a CDN distribution";

/// Document served for `/` and used as the site index
pub const INDEX_DOCUMENT: &str = "index.html";

/// Inline handler of the cleanup function; deletes every object on `Delete`
const CLEANUP_HANDLER: &str = r#"import boto3
import cfnresponse


def handler(event, context):
    status = cfnresponse.SUCCESS
    try:
        if event["RequestType"] == "Delete":
            bucket = event["ResourceProperties"]["BucketName"]
            boto3.resource("s3").Bucket(bucket).objects.all().delete()
    except Exception as err:
        print(err)
        status = cfnresponse.FAILED
    cfnresponse.send(event, context, status, {})
"#;

/// Managed policy letting the cleanup function write its logs
const LAMBDA_LOGGING_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

/// Managed cache policy `CachingOptimized`
const CACHING_OPTIMIZED_POLICY: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

/// The frontend stack
#[derive(Debug, Clone, PartialEq)]
pub struct FrontendStack {
    pub bucket: LogicalId,
    pub distribution: LogicalId,
    pub origin_access: LogicalId,
    /// Custom resource that empties the bucket on delete
    pub cleanup: LogicalId,
    pub graph: ResourceGraph,
}

impl FrontendStack {
    /// Assemble bucket, access control, distribution, policy and outputs
    pub fn synthesize() -> InfrastructureResult<Self> {
        let bucket = LogicalId::new("FrontendBucket")?;
        let distribution = LogicalId::new("FrontendDistribution")?;
        let origin_access = distribution.child("OriginAccessControl")?;
        let mut graph = ResourceGraph::new();

        graph.add(
            &bucket,
            Resource::new(
                ResourceType::Bucket,
                json!({
                    "WebsiteConfiguration": { "IndexDocument": INDEX_DOCUMENT },
                    "PublicAccessBlockConfiguration": {
                        "BlockPublicAcls": true,
                        "BlockPublicPolicy": true,
                        "IgnorePublicAcls": true,
                        "RestrictPublicBuckets": true,
                    },
                }),
            ),
        )?;

        graph.add(
            &origin_access,
            Resource::new(
                ResourceType::OriginAccessControl,
                json!({
                    "OriginAccessControlConfig": {
                        "Name": Token::sub("${AWS::StackName}-frontend-oac").to_json(),
                        "OriginAccessControlOriginType": "s3",
                        "SigningBehavior": "always",
                        "SigningProtocol": "sigv4",
                    }
                }),
            ),
        )?;

        let origin_id = "FrontendOrigin";
        graph.add(
            &distribution,
            Resource::new(
                ResourceType::Distribution,
                json!({
                    "DistributionConfig": {
                        "Enabled": true,
                        "DefaultRootObject": INDEX_DOCUMENT,
                        "Origins": [{
                            "Id": origin_id,
                            "DomainName": Token::attribute(&bucket, "RegionalDomainName").to_json(),
                            "OriginAccessControlId": Token::attribute(&origin_access, "Id").to_json(),
                            "S3OriginConfig": { "OriginAccessIdentity": "" },
                        }],
                        "DefaultCacheBehavior": {
                            "TargetOriginId": origin_id,
                            "ViewerProtocolPolicy": "redirect-to-https",
                            "CachePolicyId": CACHING_OPTIMIZED_POLICY,
                            "Compress": true,
                        },
                        "HttpVersion": "http2",
                        "IPV6Enabled": true,
                    }
                }),
            ),
        )?;

        let bucket_arn = Token::attribute(&bucket, "Arn").to_json();
        let objects = Token::sub(format!("${{{}.Arn}}/*", bucket)).to_json();
        let policy = bucket.child("Policy")?;
        graph.add(
            &policy,
            Resource::new(
                ResourceType::BucketPolicy,
                json!({
                    "Bucket": Token::reference(&bucket).to_json(),
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [
                            {
                                "Sid": "DistributionRead",
                                "Effect": "Allow",
                                "Principal": { "Service": "cloudfront.amazonaws.com" },
                                "Action": "s3:GetObject",
                                "Resource": objects,
                                "Condition": {
                                    "StringEquals": {
                                        "AWS:SourceArn": Token::sub(format!(
                                            "arn:${{AWS::Partition}}:cloudfront::${{AWS::AccountId}}:distribution/${{{}}}",
                                            distribution
                                        ))
                                        .to_json(),
                                    }
                                },
                            },
                            {
                                "Sid": "AccountReadWrite",
                                "Effect": "Allow",
                                "Principal": {
                                    "AWS": Token::sub("arn:${AWS::Partition}:iam::${AWS::AccountId}:root").to_json()
                                },
                                "Action": [
                                    "s3:GetObject*",
                                    "s3:GetBucket*",
                                    "s3:List*",
                                    "s3:DeleteObject*",
                                    "s3:PutObject",
                                    "s3:PutObjectLegalHold",
                                    "s3:PutObjectRetention",
                                    "s3:PutObjectTagging",
                                    "s3:PutObjectVersionTagging",
                                    "s3:Abort*",
                                ],
                                "Resource": [bucket_arn, objects],
                            },
                        ],
                    },
                }),
            ),
        )?;

        let cleanup = declare_bucket_cleanup(&mut graph, &bucket, &policy)?;

        graph.add_output(
            &LogicalId::new("BucketName")?,
            Token::reference(&bucket),
            "S3 Bucket name for frontend",
        )?;
        graph.add_output(
            &LogicalId::new("CloudFrontDomain")?,
            Token::attribute(&distribution, "DomainName"),
            "CloudFront distribution domain",
        )?;
        graph.add_output(
            &LogicalId::new("CloudFrontDistributionId")?,
            Token::reference(&distribution),
            "CloudFront distribution ID for invalidation",
        )?;

        info!(resources = graph.len(), "synthesized frontend stack");
        Ok(Self {
            bucket,
            distribution,
            origin_access,
            cleanup,
            graph,
        })
    }

    /// Render the template
    pub fn to_template(&self) -> serde_json::Value {
        self.graph.to_template(FRONTEND_DESCRIPTION)
    }
}

/// Role, function and custom resource that empty `bucket` before removal
///
/// The custom resource references the bucket and depends on its policy, so
/// the engine deletes it, and runs the handler, before either of them.
fn declare_bucket_cleanup(
    graph: &mut ResourceGraph,
    bucket: &LogicalId,
    policy: &LogicalId,
) -> InfrastructureResult<LogicalId> {
    let role = bucket.child("CleanupRole")?;
    let function = bucket.child("CleanupFunction")?;
    let cleanup = bucket.child("AutoDeleteObjects")?;

    graph.add(
        &role,
        Resource::new(
            ResourceType::Role,
            json!({
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": "lambda.amazonaws.com" },
                        "Action": "sts:AssumeRole",
                    }],
                },
                "ManagedPolicyArns": [
                    Token::sub(format!(
                        "arn:${{AWS::Partition}}:iam::aws:policy/{}",
                        LAMBDA_LOGGING_POLICY
                    ))
                    .to_json(),
                ],
                "Policies": [{
                    "PolicyName": "EmptyBucket",
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [
                            {
                                "Effect": "Allow",
                                "Action": "s3:ListBucket",
                                "Resource": Token::attribute(bucket, "Arn").to_json(),
                            },
                            {
                                "Effect": "Allow",
                                "Action": "s3:DeleteObject",
                                "Resource": Token::sub(format!("${{{}.Arn}}/*", bucket)).to_json(),
                            },
                        ],
                    },
                }],
            }),
        ),
    )?;

    graph.add(
        &function,
        Resource::new(
            ResourceType::Function,
            json!({
                "Runtime": "python3.12",
                "Handler": "index.handler",
                "Timeout": 900,
                "MemorySize": 128,
                "Role": Token::attribute(&role, "Arn").to_json(),
                "Code": { "ZipFile": CLEANUP_HANDLER },
            }),
        ),
    )?;

    graph.add(
        &cleanup,
        Resource::new(
            ResourceType::BucketCleanup,
            json!({
                "ServiceToken": Token::attribute(&function, "Arn").to_json(),
                "BucketName": Token::reference(bucket).to_json(),
            }),
        )
        .depends_on(policy),
    )?;

    Ok(cleanup)
}
