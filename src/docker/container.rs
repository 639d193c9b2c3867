// Two-container test environment: a database and a web app linked to it
// Setup removes stale containers first; teardown always removes both

use crate::clock::{Clock, SystemClock};
use crate::config::{ContainerDescriptor, HarnessConfig};
use crate::docker::api::{ContainerId, ContainerRuntime, CreateContainerConfig};
use crate::docker::ports::PortMapping;
use crate::errors::{HarnessError, Result};
use crate::readiness::{self, HttpProbe, ReadinessProbe};
use std::sync::Arc;

/// Lifecycle of one fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureState {
    NotStarted,
    Starting,
    Running,
    Stopping,
}

impl FixtureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureState::NotStarted => "not started",
            FixtureState::Starting => "starting",
            FixtureState::Running => "running",
            FixtureState::Stopping => "stopping",
        }
    }
}

/// Ids of the two containers, valid while the fixture is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentHandles {
    pub database: ContainerId,
    pub web: ContainerId,
}

/// Container status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    pub exists: bool,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentStatus {
    pub database: ContainerStatus,
    pub web: ContainerStatus,
}

impl EnvironmentStatus {
    pub fn all_running(&self) -> bool {
        self.database.running && self.web.running
    }

    pub fn none_exist(&self) -> bool {
        !self.database.exists && !self.web.exists
    }
}

/// Owns the database and web containers for one test run
pub struct EnvironmentFixture<R: ContainerRuntime> {
    config: HarnessConfig,
    runtime: R,
    state: FixtureState,
    handles: Option<EnvironmentHandles>,
    probe: Box<dyn ReadinessProbe>,
    clock: Arc<dyn Clock>,
}

impl<R: ContainerRuntime> EnvironmentFixture<R> {
    /// Create a fixture that owns `runtime` and probes readiness over HTTP
    pub fn new(config: HarnessConfig, runtime: R) -> Result<Self> {
        let probe = Box::new(HttpProbe::new()?);
        Ok(Self::with_probe(config, runtime, probe, Arc::new(SystemClock)))
    }

    pub fn with_probe(
        config: HarnessConfig,
        runtime: R,
        probe: Box<dyn ReadinessProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            runtime,
            state: FixtureState::NotStarted,
            handles: None,
            probe,
            clock,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn state(&self) -> FixtureState {
        self.state
    }

    pub fn handles(&self) -> Option<&EnvironmentHandles> {
        self.handles.as_ref()
    }

    pub fn base_url(&self) -> String {
        self.port_mapping().host_url()
    }

    pub fn port_mapping(&self) -> PortMapping {
        PortMapping::same(self.config.web_port())
    }

    /// Make sure an image is present; true if it had to be downloaded
    pub fn pull_image(&self, image: &str) -> Result<bool> {
        tracing::info!(image, "Downloading/checking image");
        let downloaded = self.runtime.pull_image(image)?;
        if downloaded {
            tracing::info!(image, "Image downloaded");
        } else {
            tracing::debug!(image, "Image already present");
        }
        Ok(downloaded)
    }

    /// Force-remove every container (running or not) carrying one of `names`.
    /// Containers that vanish in between are ignored. A failed removal does not
    /// stop the others; the first such error is returned once all were tried.
    /// Returns the removed ids.
    pub fn remove_named_containers(&self, names: &[&str]) -> Result<Vec<ContainerId>> {
        let mut removed = Vec::new();
        let mut first_error = None;

        for container in self.runtime.list_containers(true)? {
            if !container.matches_any(names) {
                continue;
            }

            tracing::info!(id = %container.id, names = ?container.names, "Removing container");
            match self.runtime.remove_container(&container.id, true) {
                Ok(()) => removed.push(container.id),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(id = %container.id, "Container already gone");
                }
                Err(e) => {
                    tracing::warn!(id = %container.id, error = %e, "Failed to remove container");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Bring up database then web app. On error the fixture stays `NotStarted`
    /// and whatever was created is left for `stop_environment`.
    pub fn start_environment(&mut self) -> Result<EnvironmentHandles> {
        if self.state != FixtureState::NotStarted {
            return Err(HarnessError::InvalidState {
                current: self.state.as_str(),
                action: "start",
            });
        }

        self.state = FixtureState::Starting;
        match self.bring_up() {
            Ok(handles) => {
                self.state = FixtureState::Running;
                self.handles = Some(handles.clone());
                tracing::info!(url = %self.base_url(), "Success! Web application available");
                Ok(handles)
            }
            Err(e) => {
                self.state = FixtureState::NotStarted;
                tracing::error!(error = %e, "Failed to start environment");
                Err(e)
            }
        }
    }

    fn bring_up(&self) -> Result<EnvironmentHandles> {
        let database = &self.config.database;
        let web = &self.config.web;

        self.remove_named_containers(&self.config.reserved_names())?;

        if self.config.pull_images {
            self.pull_image(&database.image)?;
            self.pull_image(&web.image)?;
        }

        tracing::info!(name = %database.name, image = %database.image, "Starting database container");
        let database_id = self.create_and_start(database)?;

        tracing::info!(
            name = %web.name,
            image = %web.image,
            port = ?web.port,
            link = ?web.link,
            "Starting web container"
        );
        let web_id = self.create_and_start(web)?;

        if self.config.readiness.enabled {
            let mapping = self.port_mapping();
            let url = format!(
                "{}{}",
                mapping.host_url().trim_end_matches('/'),
                self.config.readiness.path
            );
            readiness::wait_until_ready(
                self.probe.as_ref(),
                self.clock.as_ref(),
                &url,
                self.config.readiness_timeout()?,
            )?;
        }

        Ok(EnvironmentHandles {
            database: database_id,
            web: web_id,
        })
    }

    fn create_and_start(&self, descriptor: &ContainerDescriptor) -> Result<ContainerId> {
        let config = create_config(descriptor);
        let id = self.runtime.create_container(&descriptor.name, &config)?;
        tracing::debug!(name = %descriptor.name, id = %id, "Container created");
        self.runtime.start_container(&id)?;
        Ok(id)
    }

    /// Remove both reserved-name containers. Works from any state,
    /// including after a partial start; absent containers are not an error.
    pub fn stop_environment(&mut self) -> Result<Vec<ContainerId>> {
        tracing::info!("Testing over, destroying the environment");
        self.state = FixtureState::Stopping;
        let result = self.remove_named_containers(&self.config.reserved_names());
        self.state = FixtureState::NotStarted;
        self.handles = None;
        result
    }

    /// Whether each reserved-name container exists and runs
    pub fn environment_status(&self) -> Result<EnvironmentStatus> {
        Ok(EnvironmentStatus {
            database: self.container_status(&self.config.database.name)?,
            web: self.container_status(&self.config.web.name)?,
        })
    }

    fn container_status(&self, name: &str) -> Result<ContainerStatus> {
        match self.runtime.inspect_container(name) {
            Ok(inspect) => Ok(ContainerStatus {
                name: name.to_string(),
                exists: true,
                running: inspect.state.running,
            }),
            Err(e) if e.is_not_found() => Ok(ContainerStatus {
                name: name.to_string(),
                exists: false,
                running: false,
            }),
            Err(e) => Err(e),
        }
    }

    /// Start the environment and return a guard that tears it down when dropped
    pub fn start_scoped(&mut self) -> Result<RunningEnvironment<'_, R>> {
        match self.start_environment() {
            Ok(handles) => Ok(RunningEnvironment {
                fixture: self,
                handles,
                released: false,
            }),
            Err(e) => {
                // Partial setup may have left the database container behind
                if let Err(cleanup) = self.stop_environment() {
                    tracing::warn!(error = %cleanup, "Cleanup after failed start failed");
                }
                Err(e)
            }
        }
    }

    /// Run `body` against a started environment; teardown always follows,
    /// also when `body` fails or panics. A body error wins over a teardown error.
    pub fn with_environment<T, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&RunningEnvironment<'_, R>) -> Result<T>,
    {
        let environment = self.start_scoped()?;
        let outcome = body(&environment);
        let teardown = environment.finish();

        match (outcome, teardown) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(teardown)) => {
                tracing::warn!(error = %teardown, "Teardown failed after failed run");
                Err(e)
            }
        }
    }
}

/// Create request for a descriptor: its port published on the same host port,
/// its link aliased to the target's own name
pub fn create_config(descriptor: &ContainerDescriptor) -> CreateContainerConfig {
    let mut config = CreateContainerConfig::new(&descriptor.image).with_tty(descriptor.tty);
    if let Some(port) = descriptor.port {
        config = config.with_port_mapping(&PortMapping::same(port));
    }
    if let Some(target) = &descriptor.link {
        config = config.with_link(target, target);
    }
    config
}

/// A started environment; dropping it removes the containers
pub struct RunningEnvironment<'a, R: ContainerRuntime> {
    fixture: &'a mut EnvironmentFixture<R>,
    handles: EnvironmentHandles,
    released: bool,
}

impl<'a, R: ContainerRuntime> RunningEnvironment<'a, R> {
    pub fn handles(&self) -> &EnvironmentHandles {
        &self.handles
    }

    pub fn base_url(&self) -> String {
        self.fixture.base_url()
    }

    pub fn status(&self) -> Result<EnvironmentStatus> {
        self.fixture.environment_status()
    }

    /// Tear down now and report the result
    pub fn finish(mut self) -> Result<Vec<ContainerId>> {
        self.released = true;
        self.fixture.stop_environment()
    }

    /// Leave the containers running; the fixture stays `Running`
    pub fn detach(mut self) -> EnvironmentHandles {
        self.released = true;
        self.handles.clone()
    }
}

impl<R: ContainerRuntime> Drop for RunningEnvironment<'_, R> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.fixture.stop_environment() {
            tracing::warn!(error = %e, "Best-effort teardown failed");
        }
    }
}
