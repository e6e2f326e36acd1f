//! Stack synthesis for the API and gateway services
//!
//! Turns a small set of deployment flags into a declarative resource graph:
//! network, security groups, execution role, SSH credential, one of three
//! compute topologies, and the `/infra/...` parameters downstream automation
//! reads. The graph renders as a CloudFormation-compatible template; nothing
//! here talks to a cloud API.

pub mod bootstrap;
pub mod config;
pub mod credential;
pub mod domain;
pub mod errors;
pub mod frontend;
pub mod graph;
pub mod identity;
pub mod publication;
pub mod security;
pub mod service;
pub mod stack;
pub mod storage;
pub mod topology;
pub mod vpc;

// Re-export commonly used types
pub use config::{Architecture, FleetMode, StackConfig};
pub use errors::{InfrastructureError, InfrastructureResult};
pub use frontend::FrontendStack;
pub use graph::{ResourceGraph, Token};
pub use publication::{PublishedParameters, CORE_KEYS};
pub use stack::{synthesize, InfrastructureStack};
pub use topology::{select_topology, ComputeTopology, TopologyKind};
