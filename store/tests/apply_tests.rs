//! Tests for apply/confirm with rollback

mod common;

use common::{network, MockRpc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use ucistage_rpc::{RpcError, UbusStatus};
use ucistage_store::{Error, Settings, Store, StoreEvent};

fn confirms(store: &Store<MockRpc>) -> usize {
    store.remote().rpc().calls_to("confirm").len()
}

#[tokio::test(start_paused = true)]
async fn test_apply_confirmed_on_first_poll() {
    let store = Store::new(network());
    let mut events = store.subscribe();
    let start = Instant::now();

    store.apply(Some(5)).await.unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1250));
    assert_eq!(confirms(&store), 1);
    assert_eq!(
        store.remote().rpc().calls_to("apply")[0].args,
        json!({ "timeout": 5, "rollback": true })
    );
    assert_eq!(events.try_recv().unwrap(), StoreEvent::Applied(5));
    assert_eq!(events.try_recv().unwrap(), StoreEvent::Confirmed);
}

#[tokio::test(start_paused = true)]
async fn test_apply_retries_until_confirmed() {
    let store = Store::new(network().with_confirm(&[Some(7), None, Some(7)], 0));
    let start = Instant::now();

    store.apply(Some(5)).await.unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1750) && elapsed < Duration::from_secs(2));
    assert_eq!(confirms(&store), 4);
}

#[tokio::test(start_paused = true)]
async fn test_apply_times_out_with_last_status() {
    let store = Store::new(network().with_confirm(&[Some(5)], 6));
    let start = Instant::now();

    let err = store.apply(Some(2)).await.unwrap_err();

    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(matches!(
        err,
        Error::ConfirmTimeout {
            status: UbusStatus::PermissionDenied
        }
    ));
    assert_eq!(confirms(&store), 5);
}

#[tokio::test(start_paused = true)]
async fn test_apply_times_out_with_transport_error() {
    let store = Store::new(network().with_confirm(&[None; 8], 0));

    let err = store.apply(Some(2)).await.unwrap_err();

    assert!(matches!(err, Error::Rpc(RpcError::Transport(_))));
}

#[tokio::test(start_paused = true)]
async fn test_apply_huge_timeout() {
    let store = Store::new(network().with_confirm(&[Some(7)], 0));

    store.apply(Some(u64::MAX)).await.unwrap();

    assert_eq!(confirms(&store), 2);
    assert_eq!(
        store.remote().rpc().calls_to("apply")[0].args["timeout"],
        json!(u64::MAX)
    );
}

#[tokio::test(start_paused = true)]
async fn test_apply_rejected() {
    let store = Store::new(network().with_apply_status(6));

    let err = store.apply(Some(5)).await.unwrap_err();

    assert!(matches!(err, Error::ApplyRejected(UbusStatus::PermissionDenied)));
    assert_eq!(err.status(), Some(UbusStatus::PermissionDenied));
    assert_eq!(confirms(&store), 0);
}

#[tokio::test(start_paused = true)]
async fn test_apply_default_timeout() {
    let settings = Settings {
        apply_timeout: 30,
        ..Settings::default()
    };
    let store = Store::with_settings(network(), settings);

    store.apply(None).await.unwrap();
    store.apply(Some(0)).await.unwrap();

    for apply in store.remote().rpc().calls_to("apply") {
        assert_eq!(apply.args["timeout"], json!(30));
    }
}

#[tokio::test(start_paused = true)]
async fn test_apply_cancelled() {
    let store = Store::new(network().with_confirm(&[], 7));
    let cancel = CancellationToken::new();

    let (result, _) = tokio::join!(store.apply_with_cancel(Some(10), &cancel), async {
        tokio::time::sleep(Duration::from_millis(1600)).await;
        cancel.cancel();
    });

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(confirms(&store), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_apply() {
    let store = Store::new(network());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = store.apply_with_cancel(Some(10), &cancel).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(store.remote().rpc().calls().is_empty());
}
