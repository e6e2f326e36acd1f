// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Domain Models
//!
//! Validated value objects the rest of the crate builds on, plus the pure
//! invariants checked over a synthesized stack.
//!
//! # Value Objects with Invariants
//!
//! - [`Ipv4Cidr`] - IPv4 block in CIDR notation
//! - [`PortSpec`] - TCP port or all ICMP
//! - [`LogicalId`] - template logical id (alphanumeric, 1-255 chars)
//! - [`ResourceType`] - resource taxonomy with template type names

pub mod invariants;
pub mod logical_id;
pub mod network;
pub mod resource_type;

pub use invariants::{ComputeCensus, ValidationError, ValidationResult};
pub use logical_id::{LogicalId, LogicalIdError};
pub use network::{Ipv4Cidr, NetworkError, PortSpec};
pub use resource_type::{ResourceCategory, ResourceType};
