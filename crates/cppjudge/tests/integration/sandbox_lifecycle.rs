use std::collections::BTreeMap;
use std::sync::Arc;

use cppjudge::isolate::{BoxPool, IsolateBox};
use cppjudge::{IsolateSandbox, ResourceLimits, Sandbox};

use super::test_config;

#[tokio::test]
#[ignore = "requires root"]
async fn test_box_init_and_cleanup() {
    let config = test_config();
    let mut sandbox = IsolateBox::init(220, config.isolate_binary(), config.cgroup)
        .await
        .expect("Failed to create sandbox");

    assert!(sandbox.is_initialized());
    assert!(sandbox.path().exists());

    sandbox.cleanup().await.expect("Failed to cleanup");
    assert!(!sandbox.is_initialized());
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_pool_releases_box_ids() {
    let config = test_config();
    let pool = BoxPool::new(222, 2, config.isolate_binary(), config.cgroup);

    let mut first = pool.acquire().await.expect("Failed to acquire");
    let mut second = pool.acquire().await.expect("Failed to acquire");
    assert_ne!(first.id(), second.id());
    assert_eq!(pool.available(), 0);

    first.cleanup().await.unwrap();
    drop(first);
    assert_eq!(pool.available(), 1);

    let mut third = pool.acquire().await.expect("Failed to acquire");
    assert_ne!(third.id(), second.id());

    second.cleanup().await.unwrap();
    third.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_files_do_not_persist_between_runs() {
    let mut config = test_config();
    config.box_pool.start_id = 226;
    config.box_pool.count = 1;
    let sandbox = IsolateSandbox::new(config).unwrap();

    let files = BTreeMap::from([("marker.txt".to_owned(), b"present".to_vec())]);
    let first = sandbox
        .run("cpp", "cat marker.txt", &files, &ResourceLimits::default(), b"")
        .await
        .unwrap();
    assert_eq!(first.stdout, b"present");

    let second = sandbox
        .run(
            "cpp",
            "cat marker.txt",
            &BTreeMap::new(),
            &ResourceLimits::default(),
            b"",
        )
        .await
        .unwrap();
    assert_ne!(second.exit_code, 0);
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_concurrent_runs_share_pool() {
    let mut config = test_config();
    config.box_pool.start_id = 228;
    config.box_pool.count = 2;
    let sandbox = Arc::new(IsolateSandbox::new(config).unwrap());

    let runs = (0..4).map(|i| {
        let sandbox = Arc::clone(&sandbox);
        tokio::spawn(async move {
            let input = format!("{i}");
            sandbox
                .run(
                    "cpp",
                    "cat",
                    &BTreeMap::new(),
                    &ResourceLimits::default(),
                    input.as_bytes(),
                )
                .await
                .map(|result| (input, result))
        })
    });

    for run in runs.collect::<Vec<_>>() {
        let (input, result) = run.await.unwrap().expect("Run failed");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, input.as_bytes());
    }
    assert_eq!(sandbox.pool().available(), 2);
}
