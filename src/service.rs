// Copyright (c) 2025 - Cowboy AI, Inc.
//! The two deployed services
//!
//! Ports, paths and default images for the API service and the gateway.
//! Everything that routes to, health-checks or boots a service reads it from
//! here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which of the two services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Api,
    Gateway,
}

impl ServiceKind {
    /// Both services, API first
    pub const BOTH: [ServiceKind; 2] = [ServiceKind::Api, ServiceKind::Gateway];

    /// Static description of the service
    pub fn spec(&self) -> &'static ServiceSpec {
        match self {
            Self::Api => &API,
            Self::Gateway => &GATEWAY,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Gateway => write!(f, "gateway"),
        }
    }
}

/// Static description of one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub kind: ServiceKind,
    /// Bundle name; also the key prefix in the config bucket
    pub name: &'static str,
    /// Prefix used for logical ids
    pub id_prefix: &'static str,
    /// Working directory on the instance
    pub directory: &'static str,
    pub port: u16,
    /// Liveness endpoint
    pub health_path: &'static str,
    /// Documentation endpoint, also the load balancer health check
    pub docs_path: &'static str,
    /// Load balancer path prefix
    pub route_prefix: &'static str,
    /// Listener rule priority
    pub route_priority: u16,
    /// Default bundle used when the bucket has none
    pub default_compose: &'static str,
}

impl ServiceSpec {
    /// Listener path pattern, e.g. `/swagger/api/*`
    pub fn route_pattern(&self) -> String {
        format!("{}/*", self.route_prefix)
    }

    /// Docs path as reached through the load balancer
    pub fn routed_docs_path(&self) -> String {
        format!("{}{}", self.route_prefix, self.docs_path)
    }
}

/// The API service
pub static API: ServiceSpec = ServiceSpec {
    kind: ServiceKind::Api,
    name: "fastapi",
    id_prefix: "FastAPI",
    directory: "/opt/app",
    port: 8000,
    health_path: "/health",
    docs_path: "/docs",
    route_prefix: "/swagger/api",
    route_priority: 10,
    default_compose: r#"version: '3.8'
services:
  fastapi:
    image: python:3.11-slim
    ports:
      - '8000:8000'
    restart: always
    command: >
      sh -c "pip install fastapi uvicorn &&
             printf 'from fastapi import FastAPI\napp = FastAPI()\n@app.get(\"/health\")\ndef health():\n    return {\"status\": \"ok\"}\n' > main.py &&
             uvicorn main:app --host 0.0.0.0 --port 8000"
"#,
};

/// The gateway service
pub static GATEWAY: ServiceSpec = ServiceSpec {
    kind: ServiceKind::Gateway,
    name: "gateway",
    id_prefix: "Gateway",
    directory: "/opt/gateway",
    port: 3000,
    health_path: "/health",
    docs_path: "/api-docs",
    route_prefix: "/swagger/gw",
    route_priority: 20,
    default_compose: r#"version: '3.8'
services:
  gateway:
    image: node:18-alpine
    ports:
      - '3000:3000'
    restart: always
    command: >
      sh -c "npm install -g express &&
             printf 'const express = require(\"express\");\nconst app = express();\nconst ok = (req, res) => res.json({status: \"ok\"});\napp.get(\"/health\", ok);\napp.get(\"/api-docs\", ok);\napp.listen(3000, \"0.0.0.0\");\n' > server.js &&
             NODE_PATH=$(npm root -g) node server.js"
"#,
};

/// Ports of both services
pub fn service_ports() -> BTreeSet<u16> {
    ServiceKind::BOTH.iter().map(|s| s.spec().port).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports() {
        assert_eq!(service_ports(), [3000, 8000].into_iter().collect());
    }

    #[test]
    fn test_routes() {
        assert_eq!(API.route_pattern(), "/swagger/api/*");
        assert_eq!(GATEWAY.route_pattern(), "/swagger/gw/*");
        assert_eq!(GATEWAY.routed_docs_path(), "/swagger/gw/api-docs");
        assert!(API.route_priority < GATEWAY.route_priority);
    }

    #[test]
    fn test_default_bundles_have_no_substitution_markers() {
        for kind in ServiceKind::BOTH {
            assert!(!kind.spec().default_compose.contains("${"));
        }
    }
}
