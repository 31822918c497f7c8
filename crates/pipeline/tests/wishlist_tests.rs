mod common;

use common::{MockMediaApi, RecordingNotifier, WishlistStep};
use roost_api::{MediaApi, RemoteError};
use roost_core::ResourceId;
use roost_pipeline::{Notifier, NoticeLevel, PipelineError, ToggleOutcome, WishlistStore};
use std::sync::Arc;
use tokio::sync::Notify;

fn store(api: &Arc<MockMediaApi>) -> (Arc<WishlistStore>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let store = WishlistStore::new(
        Arc::clone(api) as Arc<dyn MediaApi>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );
    (Arc::new(store), notifier)
}

#[tokio::test]
async fn toggle_flips_and_confirms() {
    let api = MockMediaApi::new();
    let (store, notifier) = store(&api);
    let room = ResourceId::from(12);

    let outcome = store.toggle(&room).await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Confirmed { member: true });
    assert!(store.is_member(&room));

    let outcome = store.toggle(&room).await.unwrap();
    assert_eq!(outcome, ToggleOutcome::Confirmed { member: false });
    assert!(!store.is_member(&room));

    assert_eq!(api.wishlist_calls(), vec![(room.clone(), true), (room, false)]);
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn failed_toggle_restores_exact_previous_value() {
    let api = MockMediaApi::new();
    api.set_wishlist(vec![ResourceId::from(1)]);
    let (store, notifier) = store(&api);
    store.hydrate().await.unwrap();

    for (resource, before) in [(ResourceId::from(1), true), (ResourceId::from(2), false)] {
        let gate = Arc::new(Notify::new());
        api.script_wishlist(WishlistStep {
            gate: Some(Arc::clone(&gate)),
            error: Some(RemoteError::Transport("offline".into())),
        });

        let toggle = tokio::spawn({
            let store = Arc::clone(&store);
            let resource = resource.clone();
            async move { store.toggle(&resource).await }
        });
        common::wait_until(|| store.is_pending(&resource)).await;
        assert_eq!(store.is_member(&resource), !before, "optimistic value shown");

        gate.notify_one();
        let err = toggle.await.unwrap().unwrap_err();
        assert!(matches!(err, PipelineError::WishlistToggleFailure { .. }));
        assert_eq!(store.is_member(&resource), before, "rolled back");
        assert!(!store.is_pending(&resource));
    }

    let notices = notifier.notices();
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.level == NoticeLevel::Warning));
}

#[tokio::test]
async fn stale_response_is_ignored() {
    let api = MockMediaApi::new();
    let (store, notifier) = store(&api);
    let room = ResourceId::from(5);

    // First toggle (add) hangs and eventually fails; second (remove) succeeds.
    let first_gate = Arc::new(Notify::new());
    api.script_wishlist(WishlistStep {
        gate: Some(Arc::clone(&first_gate)),
        error: Some(RemoteError::Transport("timeout".into())),
    });
    api.script_wishlist(WishlistStep::default());

    let first = tokio::spawn({
        let store = Arc::clone(&store);
        let room = room.clone();
        async move { store.toggle(&room).await }
    });
    common::wait_until(|| store.is_pending(&room)).await;
    assert!(store.is_member(&room));

    let second = store.toggle(&room).await.unwrap();
    assert_eq!(second, ToggleOutcome::Confirmed { member: false });

    first_gate.notify_one();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first, ToggleOutcome::Superseded);
    assert!(!store.is_member(&room));
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn double_toggle_both_failing_restores_confirmed_value() {
    let api = MockMediaApi::new();
    let (store, notifier) = store(&api);
    let room = ResourceId::from(8);

    let first_gate = Arc::new(Notify::new());
    api.script_wishlist(WishlistStep {
        gate: Some(Arc::clone(&first_gate)),
        error: Some(RemoteError::Transport("offline".into())),
    });
    api.script_wishlist(WishlistStep {
        gate: None,
        error: Some(RemoteError::Transport("offline".into())),
    });

    let first = tokio::spawn({
        let store = Arc::clone(&store);
        let room = room.clone();
        async move { store.toggle(&room).await }
    });
    common::wait_until(|| store.is_pending(&room)).await;

    let err = store.toggle(&room).await.unwrap_err();
    assert!(matches!(err, PipelineError::WishlistToggleFailure { .. }));
    assert!(!store.is_member(&room), "never acknowledged as a member");

    first_gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), ToggleOutcome::Superseded);
    assert!(!store.is_member(&room));
    assert!(!store.is_pending(&room));
    assert_eq!(api.wishlist_calls(), vec![(room.clone(), true), (room, false)]);
    assert_eq!(notifier.notices().len(), 1);
}

#[tokio::test]
async fn late_success_of_an_older_toggle_is_shown() {
    let api = MockMediaApi::new();
    let (store, _notifier) = store(&api);
    let room = ResourceId::from(9);

    let first_gate = Arc::new(Notify::new());
    api.script_wishlist(WishlistStep {
        gate: Some(Arc::clone(&first_gate)),
        error: None,
    });
    api.script_wishlist(WishlistStep {
        gate: None,
        error: Some(RemoteError::Transport("offline".into())),
    });

    let first = tokio::spawn({
        let store = Arc::clone(&store);
        let room = room.clone();
        async move { store.toggle(&room).await }
    });
    common::wait_until(|| store.is_pending(&room)).await;

    store.toggle(&room).await.unwrap_err();
    assert!(!store.is_member(&room));

    first_gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), ToggleOutcome::Superseded);
    assert!(store.is_member(&room), "backend accepted the add");
}

#[tokio::test]
async fn hydrate_replaces_settled_membership() {
    let api = MockMediaApi::new();
    api.set_wishlist(vec![ResourceId::from(3), ResourceId::from(1)]);
    let (store, _notifier) = store(&api);

    assert_eq!(store.hydrate().await.unwrap(), 2);
    assert_eq!(store.members(), vec![ResourceId::from(1), ResourceId::from(3)]);

    api.set_wishlist(vec![ResourceId::from(3)]);
    store.hydrate().await.unwrap();
    assert_eq!(store.members(), vec![ResourceId::from(3)]);
}
