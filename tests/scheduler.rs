mod common;

use std::fs;
use std::time::Duration;

use common::{FakeCamera, ScriptedClassifier, ScriptedTransport};
use fieldcam_lib::node::{run_node, FieldNode, NodeParts, OperatorCommand};
use fieldcam_lib::settings::NodeSettings;
use fieldcam_lib::storage::{FileCell, FsStorage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn fast_settings(root: &std::path::Path) -> NodeSettings {
    NodeSettings {
        storage_root: root.to_path_buf(),
        capture_period_secs: 1,
        delivery_period_secs: 1,
        uptime_period_secs: 1,
        bootstrap_window_secs: 1,
        ..NodeSettings::default()
    }
}

#[tokio::test(flavor = "current_thread")]
async fn loop_bootstraps_captures_and_delivers() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("card");
    fs::create_dir(&root).unwrap();
    let transport = ScriptedTransport::default();

    let parts = NodeParts {
        camera: Box::new(FakeCamera::default()),
        classifier: Box::new(ScriptedClassifier::new(&[0.9])),
        storage: Box::new(FsStorage::new(&root)),
        cell: Box::new(FileCell::new(dir.path().join("cell.bin"))),
        transport: Box::new(transport.clone()),
    };
    let node = FieldNode::new(fast_settings(&root), parts);

    let cancel = CancellationToken::new();
    let (_command_tx, command_rx) = mpsc::unbounded_channel::<OperatorCommand>();
    let stopper = cancel.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        stopper.cancel();
    });

    let mut node = run_node(node, command_rx, cancel).await;
    handle.await.unwrap();

    assert!(node.bootstrap().is_complete());
    let counters = node.metrics_snapshot().counters;
    assert!(counters.captures >= 1, "{counters:?}");
    assert!(root.join("pictures/1_1.jpg").exists());
    assert!(!transport.attempted_indices().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn operator_retry_recovers_failed_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("card");
    fs::create_dir(&root).unwrap();

    let parts = NodeParts {
        camera: Box::new(FakeCamera {
            init_failures: 1,
            ..FakeCamera::default()
        }),
        classifier: Box::new(ScriptedClassifier::new(&[0.2])),
        storage: Box::new(FsStorage::new(&root)),
        cell: Box::new(FileCell::new(dir.path().join("cell.bin"))),
        transport: Box::new(ScriptedTransport::default()),
    };
    let node = FieldNode::new(fast_settings(&root), parts);

    let cancel = CancellationToken::new();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let stopper = cancel.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        command_tx.send(OperatorCommand::RetryBootstrap).unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        stopper.cancel();
    });

    let node = run_node(node, command_rx, cancel).await;
    handle.await.unwrap();

    assert!(node.bootstrap().is_complete());
    assert!(root.join("pictures").is_dir());
}
