//! Runtime adapter and API surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{execute, execute_json, execute_json_response, health, ExecReport, Health};
pub use tokio_spawner::TokioSpawner;
