// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bootstrap payloads
//!
//! Boot scripts are opaque text from the stack's point of view. Each one
//! enables the container runtime, fetches the service's bundle from the
//! config bucket (with retries), falls back to the embedded default bundle,
//! starts it, and installs a cron entry that restarts it when it is down.
//!
//! The config bucket name is only known at apply time, so the script is a
//! substitution template with a single `${Bucket}` placeholder.

use serde_json::{json, Value};

use crate::domain::{LogicalId, ResourceType};
use crate::errors::InfrastructureResult;
use crate::graph::{Resource, ResourceGraph, Token};
use crate::service::{ServiceKind, ServiceSpec};

/// Attempts per bundle file before falling back
pub const MAX_FETCH_ATTEMPTS: u32 = 5;

/// Seconds between fetch attempts
pub const FETCH_BACKOFF_SECS: u32 = 10;

/// Cron schedule of the self-heal check
pub const SELF_HEAL_SCHEDULE: &str = "*/2 * * * *";

/// Compose bundle file names fetched from the bucket
pub const BUNDLE_FILES: [&str; 2] = ["docker-compose.yml", ".env"];

const COMPOSE_URL: &str =
    "https://github.com/docker/compose/releases/latest/download/docker-compose-$(uname -s)-$(uname -m)";

/// Boot script for one compute unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootPayload {
    pub services: Vec<ServiceKind>,
    script: String,
}

impl BootPayload {
    /// Script for an instance running the given services side by side
    pub fn consolidated(services: &[ServiceKind], bucket: &LogicalId) -> Self {
        let mut script = prelude(services);
        script.push_str(&fetch_function(bucket));
        for kind in services {
            script.push_str(&start_bundle(kind.spec()));
        }
        script.push_str(&self_heal_crontab(services));

        Self {
            services: services.to_vec(),
            script,
        }
    }

    /// The substitution template
    pub fn script(&self) -> &str {
        &self.script
    }

    /// `UserData` property value
    pub fn user_data(&self) -> Value {
        json!({ "Fn::Base64": Token::sub(self.script.clone()).to_json() })
    }
}

fn prelude(services: &[ServiceKind]) -> String {
    let directories: Vec<&str> = services.iter().map(|s| s.spec().directory).collect();
    format!(
        r#"#!/bin/bash
set -eux
yum update -y
command -v docker >/dev/null 2>&1 || yum install -y docker
systemctl enable docker && systemctl start docker
usermod -aG docker ec2-user
if ! command -v docker-compose >/dev/null 2>&1; then
  curl -fsSL "{compose_url}" -o /usr/local/bin/docker-compose
  chmod +x /usr/local/bin/docker-compose
  ln -sf /usr/local/bin/docker-compose /usr/bin/docker-compose
fi
mkdir -p {directories} /opt/data
"#,
        compose_url = COMPOSE_URL,
        directories = directories.join(" "),
    )
}

fn fetch_function(bucket: &LogicalId) -> String {
    format!(
        r#"fetch_config() {{
  for attempt in $(seq 1 {attempts}); do
    aws s3 cp "s3://${{{bucket}}}/$1" "$2" && return 0
    echo "fetch of $1 failed (attempt $attempt)"
    sleep {backoff}
  done
  return 1
}}
"#,
        attempts = MAX_FETCH_ATTEMPTS,
        backoff = FETCH_BACKOFF_SECS,
        bucket = bucket,
    )
}

fn start_bundle(service: &ServiceSpec) -> String {
    let fetches: String = BUNDLE_FILES
        .iter()
        .map(|file| {
            format!(
                "fetch_config {name}/{file} {dir}/{file} || echo '{name}/{file} not found, using default'\n",
                name = service.name,
                file = file,
                dir = service.directory,
            )
        })
        .collect();

    format!(
        r#"# {name}
{fetches}if [ ! -f {dir}/docker-compose.yml ]; then
cat > {dir}/docker-compose.yml << 'EOF'
{compose}EOF
fi
(cd {dir} && docker-compose up -d)
"#,
        name = service.name,
        fetches = fetches,
        dir = service.directory,
        compose = service.default_compose,
    )
}

fn self_heal_line(service: &ServiceSpec) -> String {
    format!(
        "{schedule} cd {dir} && (docker-compose ps | grep -q '{name}.*Up' || docker-compose up -d)",
        schedule = SELF_HEAL_SCHEDULE,
        dir = service.directory,
        name = service.name,
    )
}

fn self_heal_crontab(services: &[ServiceKind]) -> String {
    let lines: Vec<String> = services.iter().map(|s| self_heal_line(s.spec())).collect();
    format!(
        "printf '%s\\n' {} | crontab -\n",
        lines
            .iter()
            .map(|line| format!("\"{}\"", line))
            .collect::<Vec<_>>()
            .join(" ")
    )
}

/// Management document that re-checks Docker and every bundle on demand
pub fn declare_self_heal_document(
    graph: &mut ResourceGraph,
    services: &[ServiceKind],
) -> InfrastructureResult<LogicalId> {
    let id = LogicalId::new("AppStateManagerDoc")?;

    let mut commands = vec![
        "#!/bin/bash".to_string(),
        "set -e".to_string(),
        "systemctl is-active docker || systemctl start docker".to_string(),
    ];
    for kind in services {
        let spec = kind.spec();
        commands.push(format!("if [ -d {} ]; then", spec.directory));
        commands.push(format!(
            "  (cd {} && (docker-compose ps | grep -q 'Up' || docker-compose up -d))",
            spec.directory
        ));
        commands.push("fi".to_string());
    }

    graph.add(
        &id,
        Resource::new(
            ResourceType::ManagementDocument,
            json!({
                "DocumentType": "Command",
                "DocumentFormat": "YAML",
                "Content": {
                    "schemaVersion": "2.2",
                    "description": "Ensure Docker services are running",
                    "mainSteps": [{
                        "action": "aws:runShellScript",
                        "name": "ensureDockerServices",
                        "inputs": { "runCommand": commands },
                    }],
                },
            }),
        ),
    )?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Token;
    use crate::service::{API, GATEWAY};

    fn bucket() -> LogicalId {
        LogicalId::new("AppConfigBucket").unwrap()
    }

    #[test]
    fn test_single_service_script() {
        let payload = BootPayload::consolidated(&[API.kind], &bucket());
        let script = payload.script();

        assert!(script.starts_with("#!/bin/bash\nset -eux\n"));
        assert!(script.contains("s3://${AppConfigBucket}/$1"));
        assert!(script.contains("fetch_config fastapi/docker-compose.yml /opt/app/docker-compose.yml"));
        assert!(script.contains("fetch_config fastapi/.env /opt/app/.env"));
        assert!(script.contains("seq 1 5"));
        assert!(script.contains("sleep 10"));
        assert!(script.contains("image: python:3.11-slim"));
        assert!(script.contains("*/2 * * * * cd /opt/app"));
        assert!(!script.contains("/opt/gateway"));
        assert_eq!(payload.services, vec![ServiceKind::Api]);
    }

    #[test]
    fn test_only_placeholder_is_the_bucket() {
        let payload = BootPayload::consolidated(&ServiceKind::BOTH, &bucket());
        let refs = Token::sub(payload.script()).references();
        let names: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
        assert_eq!(names, vec!["AppConfigBucket"]);
    }

    #[test]
    fn test_consolidated_script_runs_both() {
        let payload = BootPayload::consolidated(&ServiceKind::BOTH, &bucket());
        let script = payload.script();
        assert!(script.contains("mkdir -p /opt/app /opt/gateway /opt/data"));
        assert!(script.contains("(cd /opt/app && docker-compose up -d)"));
        assert!(script.contains("(cd /opt/gateway && docker-compose up -d)"));
        assert!(script.contains(&format!("grep -q '{}.*Up'", GATEWAY.name)));
        // One shared prelude and one crontab install
        assert_eq!(script.matches("yum update -y").count(), 1);
        assert_eq!(script.matches("| crontab -").count(), 1);
    }

    #[test]
    fn test_user_data_is_base64_sub() {
        let payload = BootPayload::consolidated(&[GATEWAY.kind], &bucket());
        let user_data = payload.user_data();
        assert!(user_data["Fn::Base64"]["Fn::Sub"].is_string());
    }

    #[test]
    fn test_self_heal_document() {
        let mut graph = ResourceGraph::new();
        let id = declare_self_heal_document(&mut graph, &ServiceKind::BOTH).unwrap();
        let doc = graph.get(&id).unwrap();
        assert_eq!(doc.kind, ResourceType::ManagementDocument);
        let commands = doc.properties["Content"]["mainSteps"][0]["inputs"]["runCommand"]
            .as_array()
            .unwrap();
        assert!(commands.iter().any(|c| c == "if [ -d /opt/gateway ]; then"));
    }
}
