// Library root: re-exports all modules so integration tests and the CLI can
// reach the crate's public API.

pub mod config;
pub mod model;
pub mod pipeline;
pub mod projection;
pub mod snapshot;
pub mod squad;
