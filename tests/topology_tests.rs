// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Selection Tests
//!
//! Flag matrices against the shape of the synthesized graph.

mod fixtures;

use anyhow::Result;
use pretty_assertions::assert_eq;
use test_case::test_case;

use fixtures::*;
use twin_stack::domain::ResourceType;
use twin_stack::security::Peer;
use twin_stack::topology::RouteDecision;
use twin_stack::service::ServiceKind;
use twin_stack::{synthesize, Architecture, FleetMode, StackConfig, TopologyKind};

#[test_case(false, FleetMode::FixedPair, TopologyKind::FixedPair ; "fixed pair by default")]
#[test_case(false, FleetMode::Autoscaled, TopologyKind::Autoscaled ; "autoscaled on request")]
#[test_case(true, FleetMode::FixedPair, TopologyKind::SingleDev ; "persistent wins over fixed pair")]
#[test_case(true, FleetMode::Autoscaled, TopologyKind::SingleDev ; "persistent wins over autoscaled")]
fn test_selection(persistent: bool, fleet: FleetMode, expected: TopologyKind) -> Result<()> {
    let config = StackConfig::default()
        .with_persistent_mode(persistent)
        .with_fleet_mode(fleet);
    let stack = synthesize(&config, DEPLOYMENT_ID_1)?;
    assert_eq!(stack.topology_kind(), expected);
    Ok(())
}

#[test_case(TopologyKind::FixedPair, 2, 0, 1, 2 ; "fixed pair")]
#[test_case(TopologyKind::Autoscaled, 0, 2, 1, 2 ; "autoscaled")]
#[test_case(TopologyKind::SingleDev, 1, 0, 0, 0 ; "single dev")]
fn test_resource_counts(
    kind: TopologyKind,
    instances: usize,
    groups: usize,
    balancers: usize,
    target_groups: usize,
) -> Result<()> {
    let config = match kind {
        TopologyKind::FixedPair => default_flags(),
        TopologyKind::Autoscaled => autoscaled_flags(),
        TopologyKind::SingleDev => persistent_flags(),
    };
    let stack = synthesize(&config, DEPLOYMENT_ID_1)?;
    let graph = &stack.graph;

    assert_eq!(graph.count_of(ResourceType::Instance), instances);
    assert_eq!(graph.count_of(ResourceType::AutoScalingGroup), groups);
    assert_eq!(graph.count_of(ResourceType::LoadBalancer), balancers);
    assert_eq!(graph.count_of(ResourceType::TargetGroup), target_groups);
    assert_eq!(graph.count_of(ResourceType::ManagementDocument), 1);
    assert_eq!(graph.count_of(ResourceType::Vpc), 1);
    assert_eq!(graph.count_of(ResourceType::Subnet), 2);
    Ok(())
}

#[test]
fn test_unmatched_paths_get_404() -> Result<()> {
    let stack = synthesize(&default_flags(), DEPLOYMENT_ID_1)?;
    let balancer = stack.topology.balancer().expect("fixed pair has a balancer");

    assert_eq!(balancer.route("/swagger/api/docs"), RouteDecision::Forward(ServiceKind::Api));
    assert_eq!(balancer.route("/swagger/gw/api-docs"), RouteDecision::Forward(ServiceKind::Gateway));
    assert_eq!(balancer.route("/admin"), RouteDecision::FixedResponse(404));
    Ok(())
}

#[test_case(true, "internet-facing" ; "exposed")]
#[test_case(false, "internal" ; "not exposed")]
fn test_balancer_scheme(expose: bool, scheme: &str) -> Result<()> {
    let stack = synthesize(&default_flags().with_exposure(expose), DEPLOYMENT_ID_1)?;
    let balancer = stack.graph.get_by_name("SwaggerALB").expect("balancer declared");
    assert_eq!(balancer.properties["Scheme"], scheme);
    Ok(())
}

#[test]
fn test_edge_rules_follow_exposure() -> Result<()> {
    let closed = synthesize(&default_flags().with_exposure(false), DEPLOYMENT_ID_1)?;
    assert!(closed.security.edge_rules().expect("edge rules").is_empty());

    let open = synthesize(&default_flags(), DEPLOYMENT_ID_1)?;
    let rules = open.security.edge_rules().expect("edge rules");
    assert!(rules.is_open());
    assert!(!rules.is_restricted());

    let restricted = synthesize(&restricted_flags(), DEPLOYMENT_ID_1)?;
    let rules = restricted.security.edge_rules().expect("edge rules");
    assert!(!rules.is_open());
    assert!(rules.rules.iter().all(|r| r.peer == Peer::Cidr(restricted_cidr())));
    Ok(())
}

#[test]
fn test_dev_ports_open_to_anyone() -> Result<()> {
    let stack = synthesize(&persistent_flags(), DEPLOYMENT_ID_1)?;
    let group = stack.graph.get_by_name("InternalSG").expect("internal group declared");
    let inline = group.properties["SecurityGroupIngress"]
        .as_array()
        .expect("inline rules");

    for port in [8000, 3000, 22] {
        assert!(
            inline
                .iter()
                .any(|rule| rule["FromPort"] == port && rule["CidrIp"] == "0.0.0.0/0"),
            "port {} not open",
            port
        );
    }
    Ok(())
}

#[test_case(Architecture::Arm64, "t4g.micro", "arm64" ; "arm")]
#[test_case(Architecture::X86_64, "t3.micro", "x86_64" ; "x86")]
fn test_architecture_drives_image_and_size(
    architecture: Architecture,
    api_type: &str,
    image_suffix: &str,
) -> Result<()> {
    let stack = synthesize(&default_flags().with_architecture(architecture), DEPLOYMENT_ID_1)?;
    let api = stack.graph.get_by_name("FastAPIInstance").expect("api instance");

    assert_eq!(api.properties["InstanceType"], api_type);
    let image = api.properties["ImageId"].as_str().expect("image id is a dynamic reference");
    assert!(image.ends_with(&format!("al2023-ami-kernel-default-{}}}}}", image_suffix)));
    Ok(())
}

#[test]
fn test_reserved_addresses() -> Result<()> {
    let fixed = synthesize(&default_flags().with_reserved_ip(true), DEPLOYMENT_ID_1)?;
    assert_eq!(fixed.graph.count_of(ResourceType::ElasticIp), 2);
    assert_eq!(fixed.graph.count_of(ResourceType::ElasticIpAssociation), 2);

    let scaled = synthesize(&autoscaled_flags().with_reserved_ip(true), DEPLOYMENT_ID_1)?;
    assert_eq!(scaled.graph.count_of(ResourceType::ElasticIp), 2);
    assert_eq!(scaled.graph.count_of(ResourceType::ElasticIpAssociation), 0);

    let dev = synthesize(&persistent_flags().with_reserved_ip(true), DEPLOYMENT_ID_1)?;
    assert_eq!(dev.graph.count_of(ResourceType::ElasticIp), 1);

    let none = synthesize(&default_flags(), DEPLOYMENT_ID_1)?;
    assert_eq!(none.graph.count_of(ResourceType::ElasticIp), 0);
    Ok(())
}

#[test]
fn test_credential_modes() -> Result<()> {
    let created = synthesize(&default_flags(), DEPLOYMENT_ID_1)?;
    assert_eq!(created.credential.resolved.key_name, GENERATED_KEY_1);
    assert_eq!(created.graph.count_of(ResourceType::KeyPair), 1);

    let reused = synthesize(&default_flags().with_ssh_key("team-key", true), DEPLOYMENT_ID_1)?;
    assert_eq!(reused.credential.resolved.key_name, "team-key");
    assert_eq!(reused.graph.count_of(ResourceType::KeyPair), 0);

    let other = synthesize(&default_flags(), DEPLOYMENT_ID_2)?;
    assert!(other.credential.resolved.key_name != created.credential.resolved.key_name);
    Ok(())
}

#[test]
fn test_strict_flags_reject_ignored_restriction() {
    let config = restricted_flags().with_exposure(false).with_strict_flags(true);
    assert!(synthesize(&config, DEPLOYMENT_ID_1).is_err());

    let lenient = restricted_flags().with_exposure(false);
    assert!(synthesize(&lenient, DEPLOYMENT_ID_1).is_ok());
}
