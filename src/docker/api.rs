// Container runtime abstraction
// The fixture only talks to the runtime through this trait

use crate::docker::ports::PortMapping;
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runtime-assigned container id
pub type ContainerId = String;

/// One entry of the runtime's container list
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub id: ContainerId,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub state: String,
}

impl ContainerSummary {
    /// The runtime reports names as "/name"
    pub fn has_name(&self, name: &str) -> bool {
        self.names
            .iter()
            .any(|n| n.strip_prefix('/').unwrap_or(n) == name)
    }

    pub fn matches_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.has_name(name))
    }
}

/// Empty JSON object, the value type of `ExposedPorts`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmptyObject {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct HostPortBinding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_ip: String,
    pub host_port: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub port_bindings: BTreeMap<String, Vec<HostPortBinding>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

/// Body of a container create request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateContainerConfig {
    pub image: String,
    #[serde(default)]
    pub tty: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exposed_ports: BTreeMap<String, EmptyObject>,
    #[serde(default)]
    pub host_config: HostConfig,
}

impl CreateContainerConfig {
    pub fn new(image: &str) -> Self {
        Self {
            image: image.to_string(),
            ..Default::default()
        }
    }

    pub fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Expose the container port and bind it on the host
    pub fn with_port_mapping(mut self, mapping: &PortMapping) -> Self {
        self.exposed_ports
            .insert(mapping.exposed_key(), EmptyObject::default());
        self.host_config
            .port_bindings
            .insert(mapping.exposed_key(), vec![mapping.host_binding()]);
        self
    }

    /// Link to another container so it resolves as `alias`
    pub fn with_link(mut self, target: &str, alias: &str) -> Self {
        self.host_config.links.push(format!("{}:{}", target, alias));
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub status: String,
}

/// Subset of the runtime's inspect answer
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    pub id: ContainerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: ContainerState,
}

/// Control-plane operations the fixture needs
pub trait ContainerRuntime {
    /// List containers; `all` includes stopped ones
    fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    /// Create a container under `name` and return its id
    fn create_container(&self, name: &str, config: &CreateContainerConfig) -> Result<ContainerId>;

    fn start_container(&self, id: &str) -> Result<()>;

    fn remove_container(&self, id: &str, force: bool) -> Result<()>;

    /// Make sure `image` is present locally; true if layers were downloaded
    fn pull_image(&self, image: &str) -> Result<bool>;

    fn inspect_container(&self, id_or_name: &str) -> Result<ContainerInspect>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_name_matching() {
        let summary: ContainerSummary = serde_json::from_value(json!({
            "Id": "abc",
            "Names": ["/mdms-redis"],
            "Image": "redis",
            "State": "running"
        }))
        .unwrap();

        assert!(summary.has_name("mdms-redis"));
        assert!(!summary.has_name("mdms"));
        assert!(summary.matches_any(&["mdms", "mdms-redis"]));
        assert!(!summary.matches_any(&[]));
    }

    #[test]
    fn test_create_config_serialization() {
        let config = CreateContainerConfig::new("maxleiko/mdms")
            .with_tty(true)
            .with_port_mapping(&PortMapping::same(8080))
            .with_link("mdms-redis", "mdms-redis");

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            json!({
                "Image": "maxleiko/mdms",
                "Tty": true,
                "ExposedPorts": { "8080/tcp": {} },
                "HostConfig": {
                    "PortBindings": { "8080/tcp": [{ "HostPort": "8080" }] },
                    "Links": ["mdms-redis:mdms-redis"]
                }
            })
        );
    }

    #[test]
    fn test_plain_create_config_has_no_ports_or_links() {
        let value = serde_json::to_value(CreateContainerConfig::new("redis")).unwrap();
        assert_eq!(value, json!({ "Image": "redis", "Tty": false, "HostConfig": {} }));
    }
}
