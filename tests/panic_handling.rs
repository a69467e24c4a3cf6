//! Panic handling as installed by the `est` binary
//!
//! The hook is process-wide, so these tests live in their own test binary.

use async_trait::async_trait;
use edge_speed_tester::{
    error::{install_panic_hook, AppError},
    Probe, WorkerPool,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio_util::sync::CancellationToken;

/// Panics on one item, counts the rest
struct PanicsOn {
    item: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Probe<usize> for PanicsOn {
    async fn probe(&self, item: &mut usize) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *item == self.item {
            panic!("probe blew up on item {}", item);
        }
        *item += 100;
    }
}

#[tokio::test]
async fn test_worker_panic_surfaces_as_internal_error() {
    install_panic_hook();

    let probe = Arc::new(PanicsOn {
        item: 2,
        calls: AtomicUsize::new(0),
    });
    let result = WorkerPool::new(2)
        .run((0..5).collect(), probe.clone(), &CancellationToken::new())
        .await;

    // still running here: the hook must not end the process
    let err = result.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)), "{:?}", err);
    assert_eq!(err.exit_code(), 99);
    assert!(err.to_string().contains("panicked"));
    assert!(probe.calls.load(Ordering::SeqCst) >= 3);

    // the runtime keeps serving other work afterwards
    let healthy = Arc::new(PanicsOn {
        item: usize::MAX,
        calls: AtomicUsize::new(0),
    });
    let outcome = WorkerPool::new(2)
        .run((0..5).collect(), healthy, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.items.len(), 5);
}

#[test]
fn test_release_profile_unwinds() {
    let manifest = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml")).unwrap();
    assert!(!manifest.contains("panic = \"abort\""));
}
