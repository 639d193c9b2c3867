// HTTP client for the Docker Engine API
// Blocking calls only: every request waits for the daemon's answer

use crate::config::HarnessConfig;
use crate::docker::api::{
    ContainerId, ContainerInspect, ContainerRuntime, ContainerSummary, CreateContainerConfig,
};
use crate::errors::{HarnessError, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateContainerResponse {
    id: ContainerId,
    #[serde(default)]
    warnings: Option<Vec<String>>,
}

/// One line of the image pull progress stream
#[derive(Debug, Deserialize)]
struct PullProgress {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

const DOWNLOAD_COMPLETE: &str = "Download complete";

/// Talks to a Docker daemon exposed over TCP
pub struct DockerClient {
    endpoint: String,
    http: Client,
}

impl DockerClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: normalize_endpoint(endpoint),
            http,
        })
    }

    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Self::new(&config.runtime.endpoint, config.request_timeout()?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check that the daemon answers at all
    pub fn ping(&self) -> Result<()> {
        let response = self.http.get(self.url("/_ping")).send()?;
        Self::check(response)?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Turn non-2xx answers into `RuntimeApi` errors
    fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(HarnessError::RuntimeApi {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

impl ContainerRuntime for DockerClient {
    fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let response = self
            .http
            .get(self.url("/containers/json"))
            .query(&[("all", all)])
            .send()?;
        let containers = Self::check(response)?.json::<Vec<ContainerSummary>>()?;
        Ok(containers)
    }

    fn create_container(&self, name: &str, config: &CreateContainerConfig) -> Result<ContainerId> {
        let response = self
            .http
            .post(self.url("/containers/create"))
            .query(&[("name", name)])
            .json(config)
            .send()?;
        let created = Self::check(response)?.json::<CreateContainerResponse>()?;

        for warning in created.warnings.unwrap_or_default() {
            tracing::warn!(container = name, "{}", warning);
        }

        Ok(created.id)
    }

    fn start_container(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/containers/{}/start", id)))
            .send()?;

        // 304: already started
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(());
        }
        Self::check(response)?;
        Ok(())
    }

    fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/containers/{}", id)))
            .query(&[("force", force)])
            .send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HarnessError::ContainerNotFound(id.to_string()));
        }
        Self::check(response)?;
        Ok(())
    }

    fn pull_image(&self, image: &str) -> Result<bool> {
        let (repository, tag) = split_image_reference(image);
        let mut request = self
            .http
            .post(self.url("/images/create"))
            .query(&[("fromImage", repository.as_str())]);
        if let Some(tag) = &tag {
            request = request.query(&[("tag", tag.as_str())]);
        }

        let response = Self::check(request.send()?)?;
        let status = response.status().as_u16();
        let body = response.text()?;

        parse_pull_progress(&body).map_err(|message| HarnessError::RuntimeApi { status, message })
    }

    fn inspect_container(&self, id_or_name: &str) -> Result<ContainerInspect> {
        let response = self
            .http
            .get(self.url(&format!("/containers/{}/json", id_or_name)))
            .send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HarnessError::ContainerNotFound(id_or_name.to_string()));
        }
        let inspect = Self::check(response)?.json::<ContainerInspect>()?;
        Ok(inspect)
    }
}

/// Accept "host:port", "tcp://host:port" and full http(s) URLs
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');

    if let Some(rest) = trimmed.strip_prefix("tcp://") {
        format!("http://{}", rest)
    } else if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Split "repo[:tag]" into repository and tag; untagged images resolve to "latest".
/// Digest references are pulled as-is without a tag.
pub fn split_image_reference(image: &str) -> (String, Option<String>) {
    if image.contains('@') {
        return (image.to_string(), None);
    }

    match image.rfind(':') {
        // A colon before the last '/' belongs to a registry host:port
        Some(idx) if !image[idx + 1..].contains('/') => (
            image[..idx].to_string(),
            Some(image[idx + 1..].to_string()),
        ),
        _ => (image.to_string(), Some("latest".to_string())),
    }
}

/// Scan a pull progress stream. Ok(true) if any layer was downloaded,
/// Err with the daemon's message if the stream reports an error.
pub fn parse_pull_progress(body: &str) -> std::result::Result<bool, String> {
    let mut downloaded = false;

    for item in serde_json::Deserializer::from_str(body).into_iter::<PullProgress>() {
        match item {
            Ok(progress) => {
                if let Some(error) = progress.error {
                    return Err(error);
                }
                if progress.status.as_deref() == Some(DOWNLOAD_COMPLETE) {
                    downloaded = true;
                }
            }
            // Not JSON: fall back to a plain text scan
            Err(_) => return Ok(downloaded || body.contains(DOWNLOAD_COMPLETE)),
        }
    }

    Ok(downloaded)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
