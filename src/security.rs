// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Component
//!
//! Named ingress rule sets derived from the exposure flags, and their
//! declaration as security groups.
//!
//! | rule set            | peers                          | ports             |
//! |---------------------|--------------------------------|-------------------|
//! | `internal`          | own group, SSH from anywhere   | service ports, ICMP, 22 |
//! | `edge`              | anywhere *or* one CIDR *or* none | 80, 443         |
//! | `balancer-to-service` | edge group                   | service ports     |
//! | `dev-direct`        | anywhere                       | service ports     |

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::{Ipv4Cidr, LogicalId, PortSpec, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};

/// Where ingress traffic may come from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    /// Any IPv4 address
    AnyIpv4,
    /// One IPv4 block
    Cidr(Ipv4Cidr),
    /// Members of the group the rule is attached to
    SameGroup,
    /// Members of another declared group
    Group(LogicalId),
}

impl Peer {
    /// The CIDR this peer stands for, if it is address based
    pub fn cidr(&self) -> Option<Ipv4Cidr> {
        match self {
            Self::AnyIpv4 => Some(Ipv4Cidr::ANY),
            Self::Cidr(cidr) => Some(*cidr),
            Self::SameGroup | Self::Group(_) => None,
        }
    }

    /// Whether this peer admits every address
    pub fn is_open(&self) -> bool {
        self.cidr().map(|c| c.is_any()).unwrap_or(false)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyIpv4 => write!(f, "0.0.0.0/0"),
            Self::Cidr(cidr) => write!(f, "{}", cidr),
            Self::SameGroup => write!(f, "self"),
            Self::Group(id) => write!(f, "sg:{}", id),
        }
    }
}

/// One ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: PortSpec,
    pub description: String,
}

impl IngressRule {
    pub fn new(peer: Peer, port: PortSpec, description: impl Into<String>) -> Self {
        Self {
            peer,
            port,
            description: description.into(),
        }
    }
}

/// Named set of ingress rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<IngressRule>,
}

impl RuleSet {
    /// Create an empty (closed) rule set
    pub fn closed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no ingress is allowed
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Ports admitted by any rule
    pub fn ports(&self) -> BTreeSet<PortSpec> {
        self.rules.iter().map(|r| r.port).collect()
    }

    /// Whether any rule admits every address
    pub fn is_open(&self) -> bool {
        self.rules.iter().any(|r| r.peer.is_open())
    }

    /// Whether any rule admits a proper CIDR subset
    pub fn is_restricted(&self) -> bool {
        self.rules
            .iter()
            .any(|r| matches!(&r.peer, Peer::Cidr(c) if !c.is_any()))
    }

    /// Append rules from another set
    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }
}

/// Rule set name for the service mesh group
pub const INTERNAL_RULES: &str = "internal";
/// Rule set name for the load-balancer-facing group
pub const EDGE_RULES: &str = "edge";
/// Rule set name for load balancer to service traffic
pub const BALANCER_RULES: &str = "balancer-to-service";
/// Rule set name for direct exposure of the dev instance
pub const DEV_DIRECT_RULES: &str = "dev-direct";

/// Internal mesh rules: each service port and ICMP from the group itself,
/// plus SSH from anywhere
pub fn build_internal_rules(ports: &BTreeSet<u16>) -> RuleSet {
    let mut rules: Vec<IngressRule> = ports
        .iter()
        .map(|port| {
            IngressRule::new(
                Peer::SameGroup,
                PortSpec::Tcp(*port),
                format!("Internal service traffic on {}", port),
            )
        })
        .collect();
    rules.push(IngressRule::new(
        Peer::SameGroup,
        PortSpec::AllIcmp,
        "Internal ICMP",
    ));
    rules.push(IngressRule::new(
        Peer::AnyIpv4,
        PortSpec::SSH,
        "SSH debug access",
    ));
    RuleSet {
        name: INTERNAL_RULES.to_string(),
        rules,
    }
}

/// Edge rules: closed when not exposed, HTTP/HTTPS from the CIDR when one
/// is given, otherwise HTTP/HTTPS from anywhere
pub fn build_edge_rules(expose_publicly: bool, restrict_to_cidr: Option<&Ipv4Cidr>) -> RuleSet {
    if !expose_publicly {
        return RuleSet::closed(EDGE_RULES);
    }

    let (peer, label) = match restrict_to_cidr {
        Some(cidr) => (Peer::Cidr(*cidr), " from restricted CIDR"),
        None => (Peer::AnyIpv4, ""),
    };

    RuleSet {
        name: EDGE_RULES.to_string(),
        rules: vec![
            IngressRule::new(peer.clone(), PortSpec::HTTP, format!("HTTP{}", label)),
            IngressRule::new(peer, PortSpec::HTTPS, format!("HTTPS{}", label)),
        ],
    }
}

/// Load balancer to service rules, attached to the internal group
pub fn build_balancer_rules(edge_group: &LogicalId, ports: &BTreeSet<u16>) -> RuleSet {
    RuleSet {
        name: BALANCER_RULES.to_string(),
        rules: ports
            .iter()
            .map(|port| {
                IngressRule::new(
                    Peer::Group(edge_group.clone()),
                    PortSpec::Tcp(*port),
                    format!("Load balancer to service on {}", port),
                )
            })
            .collect(),
    }
}

/// Direct exposure of the dev instance's service ports
pub fn build_dev_direct_rules(ports: &BTreeSet<u16>) -> RuleSet {
    RuleSet {
        name: DEV_DIRECT_RULES.to_string(),
        rules: ports
            .iter()
            .map(|port| {
                IngressRule::new(
                    Peer::AnyIpv4,
                    PortSpec::Tcp(*port),
                    format!("Direct access to {}", port),
                )
            })
            .collect(),
    }
}

/// A security group and the rule sets attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupPlan {
    pub id: LogicalId,
    pub description: String,
    pub rule_sets: Vec<RuleSet>,
}

impl SecurityGroupPlan {
    pub fn new(id: LogicalId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            rule_sets: Vec::new(),
        }
    }

    /// Attach a rule set
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rule_sets.push(rules);
        self
    }

    /// Look up an attached rule set by name
    pub fn rule_set(&self, name: &str) -> Option<&RuleSet> {
        self.rule_sets.iter().find(|set| set.name == name)
    }

    /// Every attached rule
    pub fn rules(&self) -> impl Iterator<Item = &IngressRule> {
        self.rule_sets.iter().flat_map(|set| set.rules.iter())
    }

    /// Token for the group id
    pub fn group_id(&self) -> Token {
        Token::attribute(&self.id, "GroupId")
    }

    /// Declare the group; address rules go inline, group rules become
    /// stand-alone ingress resources so self references do not form a cycle
    pub fn declare(&self, graph: &mut ResourceGraph, vpc: &LogicalId) -> InfrastructureResult<()> {
        let inline: Vec<Value> = self
            .rules()
            .filter_map(|rule| {
                rule.peer.cidr().map(|cidr| {
                    let (from, to) = rule.port.range();
                    json!({
                        "IpProtocol": rule.port.protocol(),
                        "FromPort": from,
                        "ToPort": to,
                        "CidrIp": cidr.as_cidr(),
                        "Description": rule.description,
                    })
                })
            })
            .collect();

        let mut properties = json!({
            "GroupDescription": self.description,
            "VpcId": Token::reference(vpc).to_json(),
            "SecurityGroupEgress": [{
                "IpProtocol": "-1",
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
            }],
        });
        if !inline.is_empty() {
            properties["SecurityGroupIngress"] = Value::Array(inline);
        }
        graph.add(
            &self.id,
            Resource::new(ResourceType::SecurityGroup, properties),
        )?;

        for rule in self.rules() {
            let source = match &rule.peer {
                Peer::SameGroup => &self.id,
                Peer::Group(other) => other,
                Peer::AnyIpv4 | Peer::Cidr(_) => continue,
            };
            let (from, to) = rule.port.range();
            let port_label = match rule.port {
                PortSpec::Tcp(port) => port.to_string(),
                PortSpec::AllIcmp => "ICMP".to_string(),
            };
            let ingress_id = self.id.child(&format!("from{}{}", source, port_label))?;
            graph.add(
                &ingress_id,
                Resource::new(
                    ResourceType::SecurityGroupIngress,
                    json!({
                        "GroupId": self.group_id().to_json(),
                        "SourceSecurityGroupId": Token::attribute(source, "GroupId").to_json(),
                        "IpProtocol": rule.port.protocol(),
                        "FromPort": from,
                        "ToPort": to,
                        "Description": rule.description,
                    }),
                ),
            )?;
        }

        Ok(())
    }
}

/// Logical id of the group every compute unit joins
pub const INTERNAL_GROUP_ID: &str = "InternalSG";

/// Logical id of the load balancer's group
pub const EDGE_GROUP_ID: &str = "AlbSG";

/// Every group of one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPlan {
    pub internal: SecurityGroupPlan,
    /// Present only when a load balancer fronts the services
    pub edge: Option<SecurityGroupPlan>,
}

impl SecurityPlan {
    /// Derive the groups from the exposure flags and the topology shape
    pub fn plan(
        expose_publicly: bool,
        restrict_to_cidr: Option<&Ipv4Cidr>,
        load_balanced: bool,
        ports: &BTreeSet<u16>,
    ) -> InfrastructureResult<Self> {
        let mut internal = SecurityGroupPlan::new(
            LogicalId::new(INTERNAL_GROUP_ID)?,
            "Internal service mesh and SSH debug access",
        )
        .with_rules(build_internal_rules(ports));

        let edge = if load_balanced {
            let edge = SecurityGroupPlan::new(
                LogicalId::new(EDGE_GROUP_ID)?,
                "Load balancer ingress",
            )
            .with_rules(build_edge_rules(expose_publicly, restrict_to_cidr));
            internal = internal.with_rules(build_balancer_rules(&edge.id, ports));
            Some(edge)
        } else {
            internal = internal.with_rules(build_dev_direct_rules(ports));
            None
        };

        Ok(Self { internal, edge })
    }

    /// Edge rule set, when there is an edge group
    pub fn edge_rules(&self) -> Option<&RuleSet> {
        self.edge.as_ref().and_then(|group| group.rule_set(EDGE_RULES))
    }

    /// Declare every group; the edge group first so the internal group's
    /// ingress rules can point at it
    pub fn declare(&self, graph: &mut ResourceGraph, vpc: &LogicalId) -> InfrastructureResult<()> {
        if let Some(edge) = &self.edge {
            edge.declare(graph, vpc)?;
        }
        self.internal.declare(graph, vpc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_ports() -> BTreeSet<u16> {
        [8000, 3000].into_iter().collect()
    }

    #[test]
    fn test_internal_rules() {
        let rules = build_internal_rules(&service_ports());
        assert_eq!(rules.name, INTERNAL_RULES);
        assert_eq!(rules.len(), 4);
        assert!(rules
            .rules
            .iter()
            .any(|r| r.peer == Peer::SameGroup && r.port == PortSpec::Tcp(8000)));
        assert!(rules
            .rules
            .iter()
            .any(|r| r.peer == Peer::SameGroup && r.port == PortSpec::Tcp(3000)));
        assert!(rules
            .rules
            .iter()
            .any(|r| r.peer == Peer::SameGroup && r.port == PortSpec::AllIcmp));
        assert!(rules
            .rules
            .iter()
            .any(|r| r.peer == Peer::AnyIpv4 && r.port == PortSpec::SSH));
    }

    #[test]
    fn test_edge_rules_closed_when_not_exposed() {
        let cidr = Ipv4Cidr::new("10.0.0.0/8").unwrap();
        assert!(build_edge_rules(false, None).is_empty());
        assert!(build_edge_rules(false, Some(&cidr)).is_empty());
    }

    #[test]
    fn test_edge_rules_open() {
        let rules = build_edge_rules(true, None);
        assert_eq!(rules.len(), 2);
        assert!(rules.is_open());
        assert!(!rules.is_restricted());
        assert_eq!(
            rules.ports(),
            [PortSpec::HTTP, PortSpec::HTTPS].into_iter().collect()
        );
    }

    #[test]
    fn test_edge_rules_restricted() {
        let cidr = Ipv4Cidr::new("10.0.0.0/8").unwrap();
        let rules = build_edge_rules(true, Some(&cidr));
        assert_eq!(rules.len(), 2);
        assert!(rules.is_restricted());
        assert!(!rules.is_open());
        assert!(rules.rules.iter().all(|r| r.peer == Peer::Cidr(cidr)));
    }

    #[test]
    fn test_declare_splits_inline_and_group_rules() {
        let vpc = LogicalId::new("AppVPC").unwrap();
        let group = SecurityGroupPlan::new(LogicalId::new("InternalSG").unwrap(), "internal")
            .with_rules(build_internal_rules(&service_ports()));

        let mut graph = ResourceGraph::new();
        graph
            .add(&vpc, Resource::new(ResourceType::Vpc, json!({})))
            .unwrap();
        group.declare(&mut graph, &vpc).unwrap();

        assert_eq!(graph.count_of(ResourceType::SecurityGroup), 1);
        // 8000, 3000 and ICMP from self
        assert_eq!(graph.count_of(ResourceType::SecurityGroupIngress), 3);

        let sg = graph.get_by_name("InternalSG").unwrap();
        let inline = sg.property("SecurityGroupIngress").unwrap().as_array().unwrap();
        assert_eq!(inline.len(), 1);
        assert_eq!(inline[0]["FromPort"], json!(22));
        assert!(graph.dangling_references().is_empty());
    }

    #[test]
    fn test_plan_for_balanced_and_dev() {
        let balanced = SecurityPlan::plan(true, None, true, &service_ports()).unwrap();
        let edge = balanced.edge.as_ref().unwrap();
        assert_eq!(edge.id.as_str(), EDGE_GROUP_ID);
        assert!(balanced.edge_rules().unwrap().is_open());
        assert!(balanced.internal.rule_set(BALANCER_RULES).is_some());
        assert!(balanced.internal.rule_set(DEV_DIRECT_RULES).is_none());

        let dev = SecurityPlan::plan(true, None, false, &service_ports()).unwrap();
        assert!(dev.edge.is_none());
        assert!(dev.edge_rules().is_none());
        let direct = dev.internal.rule_set(DEV_DIRECT_RULES).unwrap();
        assert!(direct.rules.iter().all(|r| r.peer == Peer::AnyIpv4));
        assert_eq!(direct.len(), 2);
    }
}
