//! Tests for the tokio spawner and API helpers

use prometheus_exequeue::core::{ExecQueue, Spawn};
use prometheus_exequeue::runtime::api::{health, stats};
use prometheus_exequeue::runtime::tokio_spawner::TokioSpawner;
use prometheus_exequeue::QueueConfig;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test]
async fn test_tokio_spawner_current() {
    let spawner = TokioSpawner::current().unwrap();
    let inside = spawner.enter(|| tokio::runtime::Handle::try_current().is_ok());
    assert!(inside);
}

#[test]
fn test_tokio_spawner_current_outside_runtime() {
    assert!(TokioSpawner::current().is_err());
}

#[tokio::test]
async fn test_health_reports_occupancy() {
    let queue = ExecQueue::new(QueueConfig::new().with_max_concurrent(1)).unwrap();
    let h = health(&queue);
    assert!(h.ok);
    assert_eq!((h.running, h.waiting), (0, 0));

    let completion = queue.run("sleep", ["0.1"], Default::default()).unwrap();
    assert_eq!(health(&queue).running, 1);
    completion.await.unwrap();
    assert_eq!(stats(&queue).completed, 1);
}
