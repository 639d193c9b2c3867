// Container runtime access and the two-container fixture

pub mod api;
pub mod client;
pub mod container;
pub mod ports;

pub use api::{ContainerId, ContainerRuntime};
pub use client::DockerClient;
pub use container::{EnvironmentFixture, EnvironmentHandles, FixtureState, RunningEnvironment};
