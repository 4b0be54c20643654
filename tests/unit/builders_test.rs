//! Tests for builder modules

use prometheus_exequeue::builders::{build_queue, ExecQueueBuilder};
use prometheus_exequeue::config::QueueConfig;
use prometheus_exequeue::core::{ConfigError, KeyPolicy};
use prometheus_exequeue::runtime::TokioSpawner;

#[test]
fn test_builder_collects_config() {
    let builder = ExecQueueBuilder::new()
        .max_concurrent(3)
        .shell("/bin/sh")
        .key_policy(KeyPolicy::Canonical);
    assert_eq!(builder.config().max_concurrent, Some(3));
    assert_eq!(builder.config().key_policy, KeyPolicy::Canonical);

    let builder = builder.unbounded();
    assert_eq!(builder.config().max_concurrent, None);
}

#[tokio::test]
async fn test_builder_builds_queue() {
    let queue = ExecQueueBuilder::new().max_concurrent(2).shell("/bin/sh").build().unwrap();
    assert_eq!(queue.max_concurrent(), Some(2));
    assert_eq!(queue.shell(), std::path::Path::new("/bin/sh"));

    let queue = build_queue(&QueueConfig::new().with_max_concurrent(5)).unwrap();
    assert_eq!(queue.stats().max_concurrent, Some(5));
}

#[test]
fn test_builder_with_explicit_spawner() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let queue = ExecQueueBuilder::new()
        .max_concurrent(1)
        .build_with_spawner(TokioSpawner::new(runtime.handle().clone()))
        .unwrap();

    // Submitted from a plain thread; the spawner provides the runtime context.
    let completion = queue.run("true", Vec::<String>::new(), Default::default()).unwrap();
    let out = runtime.block_on(completion).unwrap();
    assert_eq!(out.exit_code, 0);
}

#[test]
fn test_build_outside_runtime_fails() {
    assert!(matches!(
        ExecQueueBuilder::new().build(),
        Err(ConfigError::Runtime(_))
    ));
}
