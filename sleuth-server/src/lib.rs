//! HTTP boundary and command-line settings for the sleuth agent.

pub mod routes;
pub mod settings;
pub mod telemetry;

pub use routes::{router, AppState, MAX_BODY_BYTES};
pub use settings::{Cli, Command, LogFormat, Settings};
