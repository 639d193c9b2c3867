use crate::errors::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "mdms-harness.yml";
pub const ENDPOINT_ENV_VAR: &str = "MDMS_HARNESS_DOCKER_URI";
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// Everything one fixture needs: runtime endpoint and container descriptors.
///
/// Owned by a single fixture instance; nothing here is process-global.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HarnessConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default = "ContainerDescriptor::default_database")]
    pub database: ContainerDescriptor,
    #[serde(default = "ContainerDescriptor::default_web")]
    pub web: ContainerDescriptor,
    #[serde(default = "default_true")]
    pub pull_images: bool,
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

/// Where the container runtime control plane listens
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

/// A container identified by a reserved name
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ContainerDescriptor {
    pub name: String,
    pub image: String,
    /// Exposed in the container and published on the same host port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Container to link to, reachable under its own name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub tty: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReadinessConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_readiness_timeout")]
    pub timeout: String,
    #[serde(default = "default_readiness_path")]
    pub path: String,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:5555".to_string()
}

fn default_request_timeout() -> String {
    "5m".to_string()
}

fn default_true() -> bool {
    true
}

fn default_readiness_timeout() -> String {
    "30s".to_string()
}

fn default_readiness_path() -> String {
    "/".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: default_readiness_timeout(),
            path: default_readiness_path(),
        }
    }
}

impl ContainerDescriptor {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            port: None,
            link: None,
            tty: false,
        }
    }

    pub fn default_database() -> Self {
        Self::new("mdms-redis", "redis")
    }

    pub fn default_web() -> Self {
        Self {
            port: Some(DEFAULT_WEB_PORT),
            link: Some("mdms-redis".to_string()),
            tty: true,
            ..Self::new("mdms", "maxleiko/mdms")
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            database: ContainerDescriptor::default_database(),
            web: ContainerDescriptor::default_web(),
            pull_images: true,
            readiness: ReadinessConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load config from `mdms-harness.yml` in `dir`, then the user config dir, then defaults.
    /// The endpoint can be overridden with `MDMS_HARNESS_DOCKER_URI`.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut config = match Self::find_config_file(dir) {
            Some(path) => Self::load_file(&path)?,
            None => HarnessConfig::default(),
        };

        if let Ok(endpoint) = env::var(ENDPOINT_ENV_VAR) {
            if !endpoint.trim().is_empty() {
                config.runtime.endpoint = endpoint.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: HarnessConfig = serde_yml::from_str(&content).map_err(|e| {
            HarnessError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    fn find_config_file(dir: &Path) -> Option<PathBuf> {
        let local = dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        let user = dirs::config_dir()?.join("mdms-harness").join("config.yml");
        user.exists().then_some(user)
    }

    /// Reject configs that would make the two reserved names collide or leave them empty
    pub fn validate(&self) -> Result<()> {
        for descriptor in [&self.database, &self.web] {
            if descriptor.name.trim().is_empty() {
                return Err(HarnessError::ConfigError(
                    "Container names must not be empty".to_string(),
                ));
            }
            if descriptor.image.trim().is_empty() {
                return Err(HarnessError::ConfigError(format!(
                    "Container '{}' has no image",
                    descriptor.name
                )));
            }
        }

        if self.database.name == self.web.name {
            return Err(HarnessError::ConfigError(format!(
                "Database and web containers share the name '{}'",
                self.web.name
            )));
        }

        for descriptor in [&self.database, &self.web] {
            if descriptor.port == Some(0) {
                return Err(HarnessError::ConfigError(format!(
                    "Container '{}' has port 0",
                    descriptor.name
                )));
            }
        }
        if self.web.port.is_none() {
            return Err(HarnessError::ConfigError(format!(
                "Web container '{}' must expose a port",
                self.web.name
            )));
        }

        // The database starts first, so only the web container can link, and only to it
        if let Some(link) = &self.database.link {
            return Err(HarnessError::ConfigError(format!(
                "Database container '{}' cannot link to '{}'",
                self.database.name, link
            )));
        }
        if let Some(link) = &self.web.link {
            if link != &self.database.name {
                return Err(HarnessError::ConfigError(format!(
                    "Web container '{}' links to '{}', expected '{}'",
                    self.web.name, link, self.database.name
                )));
            }
        }

        parse_timeout(&self.runtime.request_timeout)?;
        parse_timeout(&self.readiness.timeout)?;
        Ok(())
    }

    /// Both reserved names, database first
    pub fn reserved_names(&self) -> [&str; 2] {
        [self.database.name.as_str(), self.web.name.as_str()]
    }

    /// Host port of the web app; validated configs always carry one
    pub fn web_port(&self) -> u16 {
        self.web.port.unwrap_or(DEFAULT_WEB_PORT)
    }

    pub fn base_url(&self) -> String {
        format!("http://localhost:{}/", self.web_port())
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        parse_timeout(&self.runtime.request_timeout)
    }

    pub fn readiness_timeout(&self) -> Result<Duration> {
        parse_timeout(&self.readiness.timeout)
    }
}

/// Parse a timeout string ("30s", "2m", or bare seconds)
pub fn parse_timeout(timeout_str: &str) -> Result<Duration> {
    let timeout_str = timeout_str.trim();
    let invalid = || HarnessError::ConfigError(format!("Invalid timeout value: {}", timeout_str));

    let secs = if let Some(num_str) = timeout_str.strip_suffix('s') {
        num_str.parse::<u64>().map_err(|_| invalid())?
    } else if let Some(num_str) = timeout_str.strip_suffix('m') {
        num_str
            .parse::<u64>()
            .map_err(|_| invalid())?
            .checked_mul(60)
            .ok_or_else(invalid)?
    } else {
        timeout_str.parse::<u64>().map_err(|_| invalid())?
    };

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.runtime.endpoint, "http://127.0.0.1:5555");
        assert_eq!(config.reserved_names(), ["mdms-redis", "mdms"]);
        assert_eq!(config.web.image, "maxleiko/mdms");
        assert!(config.web.tty);
        assert!(!config.database.tty);
        assert_eq!(config.web.port, Some(8080));
        assert_eq!(config.web.link.as_deref(), Some("mdms-redis"));
        assert_eq!(config.database.port, None);
        assert_eq!(config.database.link, None);
        assert_eq!(config.base_url(), "http://localhost:8080/");
    }

    #[test]
    #[serial]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        env::remove_var(ENDPOINT_ENV_VAR);
        let config = HarnessConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.web_port(), 8080);
    }

    #[test]
    #[serial]
    fn test_load_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = r#"
runtime:
  endpoint: "unix-less.example:2375"
web:
  name: mdms-ci
  image: maxleiko/mdms:1.2
  port: 9090
  link: mdms-redis
  tty: true
readiness:
  enabled: true
  timeout: 1m
"#;
        let mut file = fs::File::create(temp_dir.path().join(CONFIG_FILE_NAME)).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        env::remove_var(ENDPOINT_ENV_VAR);
        let config = HarnessConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.runtime.endpoint, "unix-less.example:2375");
        assert_eq!(config.runtime.request_timeout, "5m");
        assert_eq!(config.web.name, "mdms-ci");
        assert_eq!(config.database, ContainerDescriptor::default_database());
        assert_eq!(config.web_port(), 9090);
        assert_eq!(config.base_url(), "http://localhost:9090/");
        assert!(config.pull_images);
        assert_eq!(config.readiness_timeout().unwrap(), Duration::from_secs(60));
        assert_eq!(config.readiness.path, "/");
    }

    #[test]
    #[serial]
    fn test_endpoint_env_override() {
        let temp_dir = TempDir::new().unwrap();
        env::set_var(ENDPOINT_ENV_VAR, "http://10.0.0.5:2375");
        let config = HarnessConfig::load(temp_dir.path());
        env::remove_var(ENDPOINT_ENV_VAR);

        assert_eq!(config.unwrap().runtime.endpoint, "http://10.0.0.5:2375");
    }

    #[test]
    fn test_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "web: [not a descriptor").unwrap();

        let result = HarnessConfig::load_file(&path);
        assert!(matches!(result, Err(HarnessError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_shared_name() {
        let mut config = HarnessConfig::default();
        config.web.name = config.database.name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_web_port() {
        let mut config = HarnessConfig::default();
        config.web.port = None;
        assert!(matches!(config.validate(), Err(HarnessError::ConfigError(_))));

        config.web.port = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_link_targets_database() {
        let mut config = HarnessConfig::default();
        config.web.link = None;
        assert!(config.validate().is_ok());

        config.web.link = Some("elsewhere".to_string());
        assert!(config.validate().is_err());

        config.web.link = Some("mdms-redis".to_string());
        config.database.link = Some("mdms".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_timeout() {
        let mut config = HarnessConfig::default();
        config.runtime.request_timeout = "999999999999999999m".to_string();
        assert!(matches!(config.validate(), Err(HarnessError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        let mut config = HarnessConfig::default();
        config.readiness.timeout = "soon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_timeout(" 45 ").unwrap(), Duration::from_secs(45));
        assert!(parse_timeout("abc").is_err());
        assert!(parse_timeout("-1s").is_err());
        assert!(matches!(
            parse_timeout("999999999999999999m"),
            Err(HarnessError::ConfigError(_))
        ));
    }
}
