// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for twin-stack
//!
//! Deterministic flag sets and deployment ids. No random ids: every
//! synthesized graph in the tests is reproducible.

#![allow(dead_code)]

use twin_stack::domain::Ipv4Cidr;
use twin_stack::{Architecture, FleetMode, StackConfig};

// Fixed deployment ids (UUID v4 format)
pub const DEPLOYMENT_ID_1: &str = "5e1b7c2a-93d4-4f60-8a1e-2b3c4d5e6f70";
pub const DEPLOYMENT_ID_2: &str = "c0ffee00-1234-4abc-9def-0123456789ab";

/// Key name generated for `DEPLOYMENT_ID_1`
pub const GENERATED_KEY_1: &str = "debug-key-5e1b7c2a";

pub const RESTRICTED_CIDR: &str = "10.0.0.0/8";

/// Every flag at its default
pub fn default_flags() -> StackConfig {
    StackConfig::default()
}

/// Default flags with the autoscaled fleet
pub fn autoscaled_flags() -> StackConfig {
    StackConfig::default().with_fleet_mode(FleetMode::Autoscaled)
}

/// The single dev instance
pub fn persistent_flags() -> StackConfig {
    StackConfig::default().with_persistent_mode(true)
}

/// Edge restricted to [`RESTRICTED_CIDR`]
pub fn restricted_flags() -> StackConfig {
    StackConfig::default().with_restriction(restricted_cidr())
}

pub fn restricted_cidr() -> Ipv4Cidr {
    Ipv4Cidr::new(RESTRICTED_CIDR).expect("Invalid CIDR in test fixture")
}

/// Flags from the seven raw switches plus the fleet choice
pub fn flags(
    arm: bool,
    expose: bool,
    restrict: bool,
    reserved_ip: bool,
    persistent: bool,
    autoscaled: bool,
    reuse_key: bool,
) -> StackConfig {
    let mut config = StackConfig::default()
        .with_architecture(if arm {
            Architecture::Arm64
        } else {
            Architecture::X86_64
        })
        .with_exposure(expose)
        .with_reserved_ip(reserved_ip)
        .with_persistent_mode(persistent)
        .with_fleet_mode(if autoscaled {
            FleetMode::Autoscaled
        } else {
            FleetMode::FixedPair
        })
        .with_ssh_key("debug-key", reuse_key);
    if restrict {
        config = config.with_restriction(restricted_cidr());
    }
    config
}
