// Copyright (c) 2025 - Cowboy AI, Inc.
//! Load Balancing Path
//!
//! One application load balancer with an HTTP listener. Requests are routed
//! by path prefix to one target group per service; anything unmatched gets a
//! fixed 404.
//!
//! ```text
//! :80 ─┬─ /swagger/api/*  (priority 10) → FastAPITG  :8000  health /docs
//!      ├─ /swagger/gw/*   (priority 20) → GatewayTG  :3000  health /api-docs
//!      └─ default                       → 404 "Not Found"
//! ```

use serde_json::{json, Value};

use crate::domain::{LogicalId, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};
use crate::service::{ServiceKind, ServiceSpec};

/// Listener port
pub const LISTENER_PORT: u16 = 80;

/// Status of the default action
pub const UNMATCHED_STATUS: u16 = 404;

/// Body of the default action
pub const UNMATCHED_BODY: &str = "Not Found";

/// Target group health check timing
pub const HEALTH_CHECK_INTERVAL_SECS: u32 = 30;
pub const HEALTH_CHECK_TIMEOUT_SECS: u32 = 10;
pub const HEALTHY_THRESHOLD: u32 = 2;
pub const UNHEALTHY_THRESHOLD: u32 = 3;
pub const DEREGISTRATION_DELAY_SECS: u32 = 30;

/// How targets join a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRegistration {
    /// The scaling group registers its own instances
    ScalingGroup(LogicalId),
    /// A standalone instance registered directly
    Instance(LogicalId),
}

/// Target group for one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroupPlan {
    pub id: LogicalId,
    pub service: ServiceKind,
    pub registration: TargetRegistration,
}

impl TargetGroupPlan {
    /// Token for the group ARN
    pub fn arn(&self) -> Token {
        Token::reference(&self.id)
    }

    fn declare(&self, graph: &mut ResourceGraph, vpc: &LogicalId) -> InfrastructureResult<()> {
        let spec = self.service.spec();
        let mut properties = json!({
            "Port": spec.port,
            "Protocol": "HTTP",
            "TargetType": "instance",
            "VpcId": Token::reference(vpc).to_json(),
            "HealthCheckEnabled": true,
            "HealthCheckPath": spec.docs_path,
            "HealthCheckProtocol": "HTTP",
            "HealthCheckIntervalSeconds": HEALTH_CHECK_INTERVAL_SECS,
            "HealthCheckTimeoutSeconds": HEALTH_CHECK_TIMEOUT_SECS,
            "HealthyThresholdCount": HEALTHY_THRESHOLD,
            "UnhealthyThresholdCount": UNHEALTHY_THRESHOLD,
            "Matcher": { "HttpCode": "200" },
            "TargetGroupAttributes": [{
                "Key": "deregistration_delay.timeout_seconds",
                "Value": DEREGISTRATION_DELAY_SECS.to_string(),
            }],
        });
        if let TargetRegistration::Instance(instance) = &self.registration {
            properties["Targets"] = json!([{
                "Id": Token::reference(instance).to_json(),
                "Port": spec.port,
            }]);
        }

        graph.add(&self.id, Resource::new(ResourceType::TargetGroup, properties))
    }
}

/// Path-routing rule on the listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRoute {
    pub id: LogicalId,
    pub priority: u16,
    pub pattern: String,
    pub service: ServiceKind,
    pub target_group: LogicalId,
}

impl PathRoute {
    /// Whether a request path matches the rule's pattern
    pub fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => path == self.pattern,
        }
    }
}

/// Where the listener sends a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Forward(ServiceKind),
    FixedResponse(u16),
}

/// Balancer, listener, target groups and rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancingPath {
    pub load_balancer: LogicalId,
    pub listener: LogicalId,
    pub edge_group: LogicalId,
    pub internet_facing: bool,
    pub subnets: Vec<LogicalId>,
    pub target_groups: Vec<TargetGroupPlan>,
    pub routes: Vec<PathRoute>,
}

impl LoadBalancingPath {
    /// Plan the path; `target_for` decides how each service registers
    pub fn plan(
        edge_group: &LogicalId,
        internet_facing: bool,
        subnets: Vec<LogicalId>,
        target_for: impl Fn(&ServiceSpec) -> InfrastructureResult<TargetRegistration>,
    ) -> InfrastructureResult<Self> {
        let mut target_groups = Vec::new();
        let mut routes = Vec::new();

        for kind in ServiceKind::BOTH {
            let spec = kind.spec();
            let group = LogicalId::new(format!("{}TG", spec.id_prefix))?;
            routes.push(PathRoute {
                id: LogicalId::new(format!("{}Rule", spec.id_prefix))?,
                priority: spec.route_priority,
                pattern: spec.route_pattern(),
                service: kind,
                target_group: group.clone(),
            });
            target_groups.push(TargetGroupPlan {
                id: group,
                service: kind,
                registration: target_for(spec)?,
            });
        }
        routes.sort_by_key(|route| route.priority);

        Ok(Self {
            load_balancer: LogicalId::new("SwaggerALB")?,
            listener: LogicalId::new("HttpListener")?,
            edge_group: edge_group.clone(),
            internet_facing,
            subnets,
            target_groups,
            routes,
        })
    }

    /// `internet-facing` or `internal`
    pub fn scheme(&self) -> &'static str {
        if self.internet_facing {
            "internet-facing"
        } else {
            "internal"
        }
    }

    /// Token for the balancer DNS name
    pub fn dns_name(&self) -> Token {
        Token::attribute(&self.load_balancer, "DNSName")
    }

    /// Token for the listener ARN
    pub fn listener_arn(&self) -> Token {
        Token::reference(&self.listener)
    }

    /// Target group of one service
    pub fn target_group(&self, service: ServiceKind) -> Option<&TargetGroupPlan> {
        self.target_groups.iter().find(|tg| tg.service == service)
    }

    /// Evaluate the listener for a request path, lowest priority first
    pub fn route(&self, path: &str) -> RouteDecision {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(|route| RouteDecision::Forward(route.service))
            .unwrap_or(RouteDecision::FixedResponse(UNMATCHED_STATUS))
    }

    /// Declare everything; `wait_for` orders an internet-facing balancer
    /// after the default internet route
    pub fn declare(
        &self,
        graph: &mut ResourceGraph,
        vpc: &LogicalId,
        wait_for: &LogicalId,
    ) -> InfrastructureResult<()> {
        let subnets: Vec<Value> = self
            .subnets
            .iter()
            .map(|id| Token::reference(id).to_json())
            .collect();

        let mut balancer = Resource::new(
            ResourceType::LoadBalancer,
            json!({
                "Type": "application",
                "Scheme": self.scheme(),
                "IpAddressType": "ipv4",
                "Subnets": subnets,
                "SecurityGroups": [Token::attribute(&self.edge_group, "GroupId").to_json()],
                "LoadBalancerAttributes": [{
                    "Key": "deletion_protection.enabled",
                    "Value": "false",
                }],
            }),
        );
        if self.internet_facing {
            balancer = balancer.depends_on(wait_for);
        }
        graph.add(&self.load_balancer, balancer)?;

        graph.add(
            &self.listener,
            Resource::new(
                ResourceType::Listener,
                json!({
                    "LoadBalancerArn": Token::reference(&self.load_balancer).to_json(),
                    "Port": LISTENER_PORT,
                    "Protocol": "HTTP",
                    "DefaultActions": [{
                        "Type": "fixed-response",
                        "FixedResponseConfig": {
                            "StatusCode": UNMATCHED_STATUS.to_string(),
                            "ContentType": "text/plain",
                            "MessageBody": UNMATCHED_BODY,
                        },
                    }],
                }),
            ),
        )?;

        for group in &self.target_groups {
            group.declare(graph, vpc)?;
        }

        for route in &self.routes {
            graph.add(
                &route.id,
                Resource::new(
                    ResourceType::ListenerRule,
                    json!({
                        "ListenerArn": self.listener_arn().to_json(),
                        "Priority": route.priority,
                        "Conditions": [{
                            "Field": "path-pattern",
                            "PathPatternConfig": { "Values": [route.pattern] },
                        }],
                        "Actions": [{
                            "Type": "forward",
                            "TargetGroupArn": Token::reference(&route.target_group).to_json(),
                        }],
                    }),
                ),
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> LoadBalancingPath {
        let edge = LogicalId::new("AlbSG").unwrap();
        LoadBalancingPath::plan(&edge, true, Vec::new(), |spec| {
            Ok(TargetRegistration::Instance(LogicalId::new(format!(
                "{}Instance",
                spec.id_prefix
            ))?))
        })
        .unwrap()
    }

    #[test]
    fn test_path_routing() {
        let lb = path();
        assert_eq!(lb.route("/swagger/api/docs"), RouteDecision::Forward(ServiceKind::Api));
        assert_eq!(lb.route("/swagger/gw/api-docs"), RouteDecision::Forward(ServiceKind::Gateway));
        assert_eq!(lb.route("/"), RouteDecision::FixedResponse(404));
        assert_eq!(lb.route("/swagger/other"), RouteDecision::FixedResponse(404));
    }

    #[test]
    fn test_routes_ordered_by_priority() {
        let lb = path();
        let priorities: Vec<u16> = lb.routes.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![10, 20]);
        assert_eq!(lb.target_group(ServiceKind::Gateway).unwrap().id.as_str(), "GatewayTG");
    }

    #[test]
    fn test_declared_listener_defaults_to_404() {
        let lb = path();
        let vpc = LogicalId::new("AppVPC").unwrap();
        let route = LogicalId::new("DefaultRoute").unwrap();
        let mut graph = ResourceGraph::new();
        lb.declare(&mut graph, &vpc, &route).unwrap();

        let listener = graph.get(&lb.listener).unwrap();
        let action = &listener.properties["DefaultActions"][0];
        assert_eq!(action["Type"], json!("fixed-response"));
        assert_eq!(action["FixedResponseConfig"]["StatusCode"], json!("404"));
        assert_eq!(action["FixedResponseConfig"]["MessageBody"], json!("Not Found"));

        let balancer = graph.get(&lb.load_balancer).unwrap();
        assert_eq!(balancer.properties["Scheme"], json!("internet-facing"));
        assert!(balancer.depends_on.contains(&route));

        let api_tg = graph.get_by_name("FastAPITG").unwrap();
        assert_eq!(api_tg.properties["HealthCheckPath"], json!("/docs"));
        assert_eq!(api_tg.properties["Port"], json!(8000));
        assert_eq!(api_tg.properties["Targets"][0]["Id"], json!({ "Ref": "FastAPIInstance" }));
        assert_eq!(graph.count_of(ResourceType::ListenerRule), 2);
    }
}
