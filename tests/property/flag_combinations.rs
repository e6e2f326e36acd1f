// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests over Flag Combinations
//!
//! Every flag combination must produce exactly one topology, a complete
//! core parameter set, a closed reference graph, and the same graph when
//! synthesized twice.

use proptest::prelude::*;

use crate::fixtures::flags;
use twin_stack::domain::ResourceType;
use twin_stack::{synthesize, StackConfig, TopologyKind, CORE_KEYS};

// ============================================================================
// Strategies
// ============================================================================

/// Every flag combination, fleet choice included
fn flags_strategy() -> impl Strategy<Value = StackConfig> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(arm, expose, restrict, reserved_ip, persistent, autoscaled, reuse_key)| {
            flags(arm, expose, restrict, reserved_ip, persistent, autoscaled, reuse_key)
        })
}

/// Deployment ids in UUID v4 form
fn deployment_id_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}"
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Exactly one topology: never empty, never two shapes at once
    #[test]
    fn prop_exactly_one_topology(config in flags_strategy(), id in deployment_id_strategy()) {
        let stack = synthesize(&config, &id).unwrap();
        let graph = &stack.graph;

        let scaling = graph.count_of(ResourceType::AutoScalingGroup);
        let instances = graph.count_of(ResourceType::Instance);
        prop_assert!(scaling + instances > 0, "graph has no compute");
        prop_assert!(scaling == 0 || instances == 0, "two topologies coexist");

        match stack.topology_kind() {
            TopologyKind::Autoscaled => prop_assert_eq!(scaling, 2),
            TopologyKind::FixedPair => prop_assert_eq!(instances, 2),
            TopologyKind::SingleDev => prop_assert_eq!(instances, 1),
        }
    }

    /// Persistent mode never declares load balancing
    #[test]
    fn prop_persistent_means_no_balancer(config in flags_strategy(), id in deployment_id_strategy()) {
        let stack = synthesize(&config, &id).unwrap();
        let balancing = [
            ResourceType::LoadBalancer,
            ResourceType::Listener,
            ResourceType::ListenerRule,
            ResourceType::TargetGroup,
        ]
        .iter()
        .map(|kind| stack.graph.count_of(*kind))
        .sum::<usize>();

        if config.persistent_mode {
            prop_assert_eq!(stack.topology_kind(), TopologyKind::SingleDev);
            prop_assert_eq!(balancing, 0);
        } else {
            prop_assert!(balancing > 0);
        }
    }

    /// The four core keys are always published
    #[test]
    fn prop_core_keys_present(config in flags_strategy(), id in deployment_id_strategy()) {
        let stack = synthesize(&config, &id).unwrap();
        for key in CORE_KEYS {
            prop_assert!(stack.parameters.contains(key), "{} missing", key);
        }
    }

    /// Every reference resolves inside the graph
    #[test]
    fn prop_no_dangling_references(config in flags_strategy(), id in deployment_id_strategy()) {
        let stack = synthesize(&config, &id).unwrap();
        prop_assert!(stack.graph.dangling_references().is_empty());
    }

    /// Same flags and id produce the same graph and template
    #[test]
    fn prop_synthesis_is_deterministic(config in flags_strategy(), id in deployment_id_strategy()) {
        let first = synthesize(&config, &id).unwrap();
        let second = synthesize(&config, &id).unwrap();

        prop_assert_eq!(&first.graph, &second.graph);
        prop_assert_eq!(first.to_template(), second.to_template());
        prop_assert_eq!(first.parameters.to_string_map(), second.parameters.to_string_map());
    }

    /// Edge rules are closed when not exposed, whatever the restriction
    #[test]
    fn prop_unexposed_edge_is_closed(config in flags_strategy(), id in deployment_id_strategy()) {
        let stack = synthesize(&config, &id).unwrap();
        if let Some(edge) = stack.security.edge_rules() {
            prop_assert!(!(edge.is_open() && edge.is_restricted()));
            if !config.expose_publicly {
                prop_assert!(edge.is_empty());
            }
        }
    }
}
