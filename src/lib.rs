// Library interface for mdms-harness
// Exposes the fixture and scenario runner for integration tests and the CLI

pub mod cli;
pub mod clock;
pub mod config;
pub mod docker;
pub mod errors;
pub mod readiness;
pub mod scenario;
