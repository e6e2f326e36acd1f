// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declarative Resource Graph
//!
//! A stack is nothing more than a set of resource descriptors keyed by
//! logical id, with references between them expressed as tokens. The
//! provisioning engine derives ordering from those references; this module
//! only records them and renders the template the engine consumes.
//!
//! ```text
//! Token::Ref(AppVPC)                 → {"Ref": "AppVPC"}
//! Token::GetAtt(SwaggerALB, DNSName) → {"Fn::GetAtt": ["SwaggerALB", "DNSName"]}
//! Token::Sub("http://${X.DNSName}")  → {"Fn::Sub": "http://${X.DNSName}"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use crate::domain::{LogicalId, ResourceType};
use crate::errors::{InfrastructureError, InfrastructureResult};

/// Template format version understood by the provisioning engine
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A value that is either known now or resolved by the engine at apply time
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    /// Fixed string
    Literal(String),
    /// Primary identifier of another resource
    Ref(LogicalId),
    /// Named attribute of another resource
    GetAtt {
        resource: LogicalId,
        attribute: String,
    },
    /// String with `${Id}` / `${Id.Attr}` placeholders
    Sub(String),
}

impl Token {
    /// Fixed string token
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Reference to a resource's primary identifier
    pub fn reference(id: &LogicalId) -> Self {
        Self::Ref(id.clone())
    }

    /// Reference to a resource attribute
    pub fn attribute(id: &LogicalId, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            resource: id.clone(),
            attribute: attribute.into(),
        }
    }

    /// Substitution string
    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub(template.into())
    }

    /// Render as template JSON
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => Value::String(value.clone()),
            Self::Ref(id) => json!({ "Ref": id.as_str() }),
            Self::GetAtt {
                resource,
                attribute,
            } => json!({ "Fn::GetAtt": [resource.as_str(), attribute] }),
            Self::Sub(template) => json!({ "Fn::Sub": template }),
        }
    }

    /// Resources this token points at
    pub fn references(&self) -> BTreeSet<LogicalId> {
        let mut refs = BTreeSet::new();
        collect_references(&self.to_json(), &mut refs);
        refs
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) | Self::Sub(value) => write!(f, "{}", value),
            Self::Ref(id) => write!(f, "${{{}}}", id),
            Self::GetAtt {
                resource,
                attribute,
            } => write!(f, "${{{}.{}}}", resource, attribute),
        }
    }
}

/// What the engine does with a resource when the stack is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    #[default]
    Destroy,
    Retain,
}

/// One declared resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceType,
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub depends_on: BTreeSet<LogicalId>,
    #[serde(default)]
    pub removal: RemovalPolicy,
}

impl Resource {
    /// Create a resource; non-object `properties` are treated as empty
    pub fn new(kind: ResourceType, properties: Value) -> Self {
        let properties = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind,
            properties,
            depends_on: BTreeSet::new(),
            removal: RemovalPolicy::Destroy,
        }
    }

    /// Add an explicit ordering dependency
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        self.depends_on.insert(id.clone());
        self
    }

    /// Keep the resource when the stack is deleted
    pub fn retained(mut self) -> Self {
        self.removal = RemovalPolicy::Retain;
        self
    }

    /// Look up a top-level property
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Resources referenced by properties or dependencies
    pub fn references(&self) -> BTreeSet<LogicalId> {
        let mut refs = self.depends_on.clone();
        for value in self.properties.values() {
            collect_references(value, &mut refs);
        }
        refs
    }

    fn to_template(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            "Type".to_string(),
            Value::String(self.kind.cloudformation_type().to_string()),
        );
        if !self.properties.is_empty() {
            body.insert(
                "Properties".to_string(),
                Value::Object(self.properties.clone()),
            );
        }
        if !self.depends_on.is_empty() {
            body.insert(
                "DependsOn".to_string(),
                self.depends_on
                    .iter()
                    .map(|id| Value::String(id.to_string()))
                    .collect(),
            );
        }
        if self.removal == RemovalPolicy::Retain {
            body.insert("DeletionPolicy".to_string(), json!("Retain"));
            body.insert("UpdateReplacePolicy".to_string(), json!("Retain"));
        }
        Value::Object(body)
    }
}

/// Stack-level output for operators and CI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: Token,
    pub description: String,
}

/// Ordered set of resources and outputs forming one stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGraph {
    resources: BTreeMap<LogicalId, Resource>,
    outputs: BTreeMap<LogicalId, Output>,
}

impl ResourceGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource; ids are unique within a graph
    pub fn add(&mut self, id: &LogicalId, resource: Resource) -> InfrastructureResult<()> {
        if self.resources.contains_key(id) {
            return Err(InfrastructureError::DuplicateResource(id.to_string()));
        }
        debug!(id = %id, kind = %resource.kind, "declared resource");
        self.resources.insert(id.clone(), resource);
        Ok(())
    }

    /// Declare an output; ids are unique within a graph
    pub fn add_output(
        &mut self,
        id: &LogicalId,
        value: Token,
        description: impl Into<String>,
    ) -> InfrastructureResult<()> {
        if self.outputs.contains_key(id) {
            return Err(InfrastructureError::DuplicateResource(format!(
                "output {}",
                id
            )));
        }
        self.outputs.insert(
            id.clone(),
            Output {
                value,
                description: description.into(),
            },
        );
        Ok(())
    }

    /// Look up a resource
    pub fn get(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Look up a resource by its raw id string
    pub fn get_by_name(&self, id: &str) -> Option<&Resource> {
        LogicalId::new(id).ok().and_then(|id| self.resources.get(&id))
    }

    /// Whether a resource is declared
    pub fn contains(&self, id: &LogicalId) -> bool {
        self.resources.contains_key(id)
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether nothing has been declared
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate resources in id order
    pub fn resources(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter()
    }

    /// Iterate outputs in id order
    pub fn outputs(&self) -> impl Iterator<Item = (&LogicalId, &Output)> {
        self.outputs.iter()
    }

    /// Look up an output
    pub fn output(&self, id: &str) -> Option<&Output> {
        LogicalId::new(id).ok().and_then(|id| self.outputs.get(&id))
    }

    /// Ids of every resource of one kind
    pub fn ids_of(&self, kind: ResourceType) -> Vec<&LogicalId> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of resources of one kind
    pub fn count_of(&self, kind: ResourceType) -> usize {
        self.resources
            .values()
            .filter(|resource| resource.kind == kind)
            .count()
    }

    /// Referenced ids that are not declared in this graph
    pub fn dangling_references(&self) -> BTreeSet<LogicalId> {
        let mut refs = BTreeSet::new();
        for resource in self.resources.values() {
            refs.extend(resource.references());
        }
        for output in self.outputs.values() {
            refs.extend(output.value.references());
        }
        refs.into_iter()
            .filter(|id| !self.resources.contains_key(id))
            .collect()
    }

    /// Render the template handed to the provisioning engine
    pub fn to_template(&self, description: &str) -> Value {
        let resources: Map<String, Value> = self
            .resources
            .iter()
            .map(|(id, resource)| (id.to_string(), resource.to_template()))
            .collect();

        let outputs: Map<String, Value> = self
            .outputs
            .iter()
            .map(|(id, output)| {
                (
                    id.to_string(),
                    json!({
                        "Value": output.value.to_json(),
                        "Description": output.description,
                    }),
                )
            })
            .collect();

        let mut template = Map::new();
        template.insert(
            "AWSTemplateFormatVersion".to_string(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        template.insert("Description".to_string(), json!(description));
        template.insert("Resources".to_string(), Value::Object(resources));
        if !outputs.is_empty() {
            template.insert("Outputs".to_string(), Value::Object(outputs));
        }
        Value::Object(template)
    }
}

/// Walk template JSON and collect every `Ref`, `Fn::GetAtt` and `Fn::Sub`
/// target. Pseudo parameters (`AWS::Region`, ...) are not resources.
fn collect_references(value: &Value, out: &mut BTreeSet<LogicalId>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    push_reference(target, out);
                    return;
                }
                if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = parts.first() {
                        push_reference(target, out);
                    }
                    return;
                }
                if let Some(Value::String(template)) = map.get("Fn::Sub") {
                    collect_sub_references(template, out);
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

fn collect_sub_references(template: &str, out: &mut BTreeSet<LogicalId>) {
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let placeholder = &after[..end];
        // `${!Literal}` is an escaped dollar sign
        if !placeholder.starts_with('!') {
            let target = placeholder.split('.').next().unwrap_or(placeholder);
            push_reference(target, out);
        }
        rest = &after[end + 1..];
    }
}

fn push_reference(target: &str, out: &mut BTreeSet<LogicalId>) {
    if target.contains("::") {
        return;
    }
    if let Ok(id) = LogicalId::new(target) {
        out.insert(id);
    }
}
