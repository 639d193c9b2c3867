// Port mapping between the web container and the host

use crate::docker::api::HostPortBinding;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// A container port published on a host port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    /// Expose `port` in the container and bind the same port on the host
    pub fn same(port: u16) -> Self {
        Self {
            container_port: port,
            host_port: port,
            protocol: Protocol::Tcp,
        }
    }

    pub fn new(container_port: u16, host_port: u16) -> Self {
        Self {
            container_port,
            host_port,
            protocol: Protocol::Tcp,
        }
    }

    /// Key used by the runtime for exposed ports and bindings, e.g. "8080/tcp"
    pub fn exposed_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol.as_str())
    }

    pub fn host_binding(&self) -> HostPortBinding {
        HostPortBinding {
            host_ip: String::new(),
            host_port: self.host_port.to_string(),
        }
    }

    pub fn host_url(&self) -> String {
        format!("http://localhost:{}/", self.host_port)
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.host_port,
            self.container_port,
            self.protocol.as_str()
        )
    }
}
