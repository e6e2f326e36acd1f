// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack configuration flags
//!
//! Flags are an explicit value handed to synthesis, never read from an
//! ambient context object. They can be loaded from a JSON context map (the
//! `"context"` object of a `cdk.json`-style file) and overridden from the
//! environment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::domain::Ipv4Cidr;
use crate::errors::{InfrastructureError, InfrastructureResult};

/// Key pair name used when none is configured
pub const DEFAULT_SSH_KEY_NAME: &str = "debug-key";

/// Environment variable naming a context file
pub const CONTEXT_FILE_ENV: &str = "STACK_CONTEXT_FILE";

/// Prefix for per-flag environment overrides, e.g. `STACK_PERSISTENT_MODE`
pub const ENV_PREFIX: &str = "STACK_";

/// Context keys
pub mod keys {
    pub const ARCH: &str = "arch";
    pub const EXPOSE_PUBLICLY: &str = "expose_swagger_public";
    pub const RESTRICT_TO_CIDR: &str = "restrict_swagger_to_cidr";
    pub const USE_RESERVED_IP: &str = "use_eip";
    pub const PERSISTENT_MODE: &str = "persistent_mode";
    pub const FLEET_MODE: &str = "fleet_mode";
    pub const SSH_KEY_NAME: &str = "ssh_key_name";
    pub const REUSE_SSH_KEY: &str = "reuse_ssh_key";
    pub const STRICT_FLAGS: &str = "strict_flags";

    /// Every recognised key
    pub const ALL: [&str; 9] = [
        ARCH,
        EXPOSE_PUBLICLY,
        RESTRICT_TO_CIDR,
        USE_RESERVED_IP,
        PERSISTENT_MODE,
        FLEET_MODE,
        SSH_KEY_NAME,
        REUSE_SSH_KEY,
        STRICT_FLAGS,
    ];
}

/// CPU architecture of every compute unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    #[default]
    Arm64,
    X86_64,
}

impl Architecture {
    /// Parse a context value; anything that is not an ARM spelling is x86_64
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "arm_64" | "arm64" | "aarch64" => Self::Arm64,
            _ => Self::X86_64,
        }
    }

    /// Suffix used by the public image parameters
    pub fn image_suffix(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arm64 => write!(f, "ARM_64"),
            Self::X86_64 => write!(f, "X86_64"),
        }
    }
}

/// Which load-balanced topology to build when not in persistent mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetMode {
    /// One supervised scaling group per service
    Autoscaled,
    /// One standalone instance per service
    #[default]
    FixedPair,
}

impl FleetMode {
    /// Parse a context value
    pub fn parse(s: &str) -> InfrastructureResult<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "autoscaled" | "asg" => Ok(Self::Autoscaled),
            "fixed_pair" | "fixed" | "instances" => Ok(Self::FixedPair),
            other => Err(InfrastructureError::Configuration(format!(
                "unknown {}: {}",
                keys::FLEET_MODE,
                other
            ))),
        }
    }
}

impl fmt::Display for FleetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Autoscaled => write!(f, "autoscaled"),
            Self::FixedPair => write!(f, "fixed_pair"),
        }
    }
}

/// Deployment flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    pub architecture: Architecture,
    pub expose_publicly: bool,
    pub restrict_to_cidr: Option<Ipv4Cidr>,
    pub use_reserved_ip: bool,
    pub persistent_mode: bool,
    pub fleet_mode: FleetMode,
    pub ssh_key_name: String,
    pub reuse_ssh_key: bool,
    /// Reject ignorable flag combinations instead of warning
    pub strict_flags: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::Arm64,
            expose_publicly: true,
            restrict_to_cidr: None,
            use_reserved_ip: false,
            persistent_mode: false,
            fleet_mode: FleetMode::FixedPair,
            ssh_key_name: DEFAULT_SSH_KEY_NAME.to_string(),
            reuse_ssh_key: false,
            strict_flags: false,
        }
    }
}

impl StackConfig {
    /// Set the architecture
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    /// Set public exposure
    pub fn with_exposure(mut self, expose_publicly: bool) -> Self {
        self.expose_publicly = expose_publicly;
        self
    }

    /// Restrict edge ingress to a CIDR block
    pub fn with_restriction(mut self, cidr: Ipv4Cidr) -> Self {
        self.restrict_to_cidr = Some(cidr);
        self
    }

    /// Toggle reserved public addresses
    pub fn with_reserved_ip(mut self, use_reserved_ip: bool) -> Self {
        self.use_reserved_ip = use_reserved_ip;
        self
    }

    /// Toggle persistent (single dev instance) mode
    pub fn with_persistent_mode(mut self, persistent_mode: bool) -> Self {
        self.persistent_mode = persistent_mode;
        self
    }

    /// Select the load-balanced topology
    pub fn with_fleet_mode(mut self, fleet_mode: FleetMode) -> Self {
        self.fleet_mode = fleet_mode;
        self
    }

    /// Set the key pair base name and reuse mode
    pub fn with_ssh_key(mut self, name: impl Into<String>, reuse: bool) -> Self {
        self.ssh_key_name = name.into();
        self.reuse_ssh_key = reuse;
        self
    }

    /// Toggle strict flag checking
    pub fn with_strict_flags(mut self, strict_flags: bool) -> Self {
        self.strict_flags = strict_flags;
        self
    }

    /// Build from a context map; missing keys keep their defaults
    pub fn from_context(context: &Map<String, Value>) -> InfrastructureResult<Self> {
        let mut config = Self::default();
        for (key, value) in context {
            config.apply(key, value)?;
        }
        Ok(config)
    }

    /// Load the `"context"` object of a JSON file
    pub fn from_context_file(path: impl AsRef<Path>) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| InfrastructureError::Io(format!("{}: {}", path.display(), e)))?;
        let document: Value = serde_json::from_str(&raw)?;

        match document.get("context") {
            Some(Value::Object(context)) => Self::from_context(context),
            Some(_) => Err(InfrastructureError::Configuration(format!(
                "{}: \"context\" must be an object",
                path.display()
            ))),
            None => Ok(Self::default()),
        }
    }

    /// Load from `STACK_CONTEXT_FILE` (if set) then apply `STACK_<KEY>`
    /// overrides
    pub fn from_env() -> InfrastructureResult<Self> {
        let mut config = match std::env::var(CONTEXT_FILE_ENV) {
            Ok(path) => Self::from_context_file(path)?,
            Err(_) => Self::default(),
        };

        for key in keys::ALL {
            let var = format!("{}{}", ENV_PREFIX, key.to_ascii_uppercase());
            if let Ok(raw) = std::env::var(&var) {
                config.apply(key, &Value::String(raw))?;
            }
        }

        Ok(config)
    }

    /// Apply one context entry
    pub fn apply(&mut self, key: &str, value: &Value) -> InfrastructureResult<()> {
        match key {
            keys::ARCH => {
                if let Some(raw) = optional_string(key, value)? {
                    self.architecture = Architecture::parse(&raw);
                }
            }
            keys::EXPOSE_PUBLICLY => {
                if let Some(flag) = optional_bool(key, value)? {
                    self.expose_publicly = flag;
                }
            }
            keys::RESTRICT_TO_CIDR => {
                self.restrict_to_cidr = match optional_string(key, value)? {
                    Some(raw) if !raw.trim().is_empty() => Some(Ipv4Cidr::new(&raw).map_err(
                        |e| InfrastructureError::Configuration(format!("{}: {}", key, e)),
                    )?),
                    _ => None,
                };
            }
            keys::USE_RESERVED_IP => {
                if let Some(flag) = optional_bool(key, value)? {
                    self.use_reserved_ip = flag;
                }
            }
            keys::PERSISTENT_MODE => {
                if let Some(flag) = optional_bool(key, value)? {
                    self.persistent_mode = flag;
                }
            }
            keys::FLEET_MODE => {
                if let Some(raw) = optional_string(key, value)? {
                    self.fleet_mode = FleetMode::parse(&raw)?;
                }
            }
            keys::SSH_KEY_NAME => {
                if let Some(raw) = optional_string(key, value)? {
                    self.ssh_key_name = raw;
                }
            }
            keys::REUSE_SSH_KEY => {
                if let Some(flag) = optional_bool(key, value)? {
                    self.reuse_ssh_key = flag;
                }
            }
            keys::STRICT_FLAGS => {
                if let Some(flag) = optional_bool(key, value)? {
                    self.strict_flags = flag;
                }
            }
            // Context files carry unrelated keys too
            _ => {}
        }
        Ok(())
    }

    /// Check flag combinations before synthesis
    ///
    /// A restriction while not exposed has no effect; it is reported as a
    /// warning, or rejected when `strict_flags` is set.
    pub fn validate(&self) -> InfrastructureResult<()> {
        if self.ssh_key_name.trim().is_empty() {
            return Err(InfrastructureError::Configuration(format!(
                "{} must not be empty",
                keys::SSH_KEY_NAME
            )));
        }

        if !self.expose_publicly {
            if let Some(cidr) = &self.restrict_to_cidr {
                if self.strict_flags {
                    return Err(InfrastructureError::Configuration(format!(
                        "{}={} has no effect while {}=false",
                        keys::RESTRICT_TO_CIDR,
                        cidr,
                        keys::EXPOSE_PUBLICLY
                    )));
                }
                warn!(
                    cidr = %cidr,
                    "edge restriction ignored because the load balancer is not exposed"
                );
            }
        }

        if self.persistent_mode && self.fleet_mode == FleetMode::Autoscaled && self.strict_flags {
            return Err(InfrastructureError::Configuration(format!(
                "{}=autoscaled has no effect while {}=true",
                keys::FLEET_MODE,
                keys::PERSISTENT_MODE
            )));
        }

        Ok(())
    }
}

fn optional_bool(key: &str, value: &Value) -> InfrastructureResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(flag) => Ok(Some(*flag)),
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            other => Err(InfrastructureError::Configuration(format!(
                "{}: expected a boolean, got {:?}",
                key, other
            ))),
        },
        other => Err(InfrastructureError::Configuration(format!(
            "{}: expected a boolean, got {}",
            key, other
        ))),
    }
}

fn optional_string(key: &str, value: &Value) -> InfrastructureResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(raw) => Ok(Some(raw.clone())),
        other => Err(InfrastructureError::Configuration(format!(
            "{}: expected a string, got {}",
            key, other
        ))),
    }
}
