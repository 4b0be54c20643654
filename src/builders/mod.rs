//! Builders to construct execution queues from configuration.

pub mod queue_builder;

pub use queue_builder::{build_queue, ExecQueueBuilder};
