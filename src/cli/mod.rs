// Command implementations for the mdms-harness binary

pub mod docker;
pub mod run;
