//! Session state machine scenarios: feed-driven transitions and the
//! stale-profile-lookup race.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use storefront_core::{
    config::StoreConfig,
    error::StoreResult,
    ports::{
        Document, DocumentStore, Filter, Identity, Ordering,
        memory::{InMemoryDocumentStore, InMemoryIdentityProvider},
    },
    services::auth_service::{AuthSessionManager, SessionState},
};

async fn wait_for<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn login_and_logout_flow_through_the_push_feed() {
    let config = StoreConfig::default();
    let provider = Arc::new(InMemoryIdentityProvider::new());
    let store = Arc::new(InMemoryDocumentStore::new());
    let uid = provider.add_account("jo@example.com", "hunter22", Some("Jo"));
    let manager = AuthSessionManager::new(provider.clone(), store.clone(), &config);
    let _feed = manager.listen();

    assert_eq!(manager.current(), SessionState::Unknown);

    manager.login("jo@example.com", "hunter22").await.unwrap();
    wait_for(|| manager.current().user().is_some()).await;

    let state = manager.current();
    let user = state.user().unwrap();
    assert_eq!(user.id, uid);
    assert_eq!(user.name, "Jo");
    assert_eq!(user.email, "jo@example.com");

    manager.logout().await.unwrap();
    wait_for(|| manager.current() == SessionState::Anonymous).await;
}

#[tokio::test]
async fn registration_signs_the_new_identity_in_with_profile_name() {
    let config = StoreConfig::default();
    let provider = Arc::new(InMemoryIdentityProvider::new());
    let store = Arc::new(InMemoryDocumentStore::new());
    let manager = AuthSessionManager::new(provider.clone(), store.clone(), &config);
    let _feed = manager.listen();

    manager
        .register("New Person", "new@example.com", "hunter22")
        .await
        .unwrap();
    wait_for(|| manager.current().user().is_some()).await;

    // The profile record was written and wins name resolution on the
    // next session event.
    assert_eq!(store.len("users"), 1);
    manager.logout().await.unwrap();
    wait_for(|| manager.current() == SessionState::Anonymous).await;
    manager.login("new@example.com", "hunter22").await.unwrap();
    wait_for(|| manager.current().user().is_some()).await;
    assert_eq!(manager.current().user().unwrap().name, "New Person");
}

/// Store whose `users` reads park on a semaphore, with a flag recording
/// that a read was entered.
struct GatedProfileStore {
    inner: InMemoryDocumentStore,
    gate: Semaphore,
    entered: AtomicBool,
}

impl GatedProfileStore {
    fn new() -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            gate: Semaphore::new(0),
            entered: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DocumentStore for GatedProfileStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        ordering: Option<&Ordering>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<(String, Document)>> {
        self.inner.query(collection, filters, ordering, limit).await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        if collection == "users" {
            self.entered.store(true, AtomicOrdering::SeqCst);
            self.gate.acquire().await.expect("gate closed").forget();
        }
        self.inner.get(collection, id).await
    }

    async fn create(&self, collection: &str, record: Document) -> StoreResult<String> {
        self.inner.create(collection, record).await
    }

    async fn put(&self, collection: &str, id: &str, record: Document) -> StoreResult<()> {
        self.inner.put(collection, id, record).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> StoreResult<()> {
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.inner.delete(collection, id).await
    }
}

// A sign-in event whose profile lookup is still resolving when a
// sign-out arrives must not overwrite the newer anonymous state.
#[tokio::test]
async fn stale_profile_lookup_never_overwrites_a_newer_session_state() {
    let config = StoreConfig::default();
    let provider = Arc::new(InMemoryIdentityProvider::new());
    let store = Arc::new(GatedProfileStore::new());
    let manager = AuthSessionManager::new(provider, store.clone(), &config);

    // E1: sign-in, parked inside its profile lookup.
    let e1 = tokio::spawn({
        let manager = manager.clone();
        async move {
            manager
                .apply_session_event(Some(Identity {
                    uid: "u1".into(),
                    email: "jo@example.com".into(),
                    display_name: None,
                }))
                .await;
        }
    });
    wait_for(|| store.entered.load(AtomicOrdering::SeqCst)).await;

    // E2: sign-out arrives and resolves immediately.
    manager.apply_session_event(None).await;
    assert_eq!(manager.current(), SessionState::Anonymous);

    // Release E1's lookup; its resolution must be discarded.
    store.gate.add_permits(1);
    e1.await.unwrap();
    assert_eq!(manager.current(), SessionState::Anonymous);
}

// Releasing a parked sign-in resolution at the same instant a newer
// sign-out is applied must leave the sign-out as the final state under
// every interleaving: the stale resolution's generation check and its
// commit happen as one step, so it can never land between the newer
// event's generation bump and the newer event's commit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn released_stale_resolution_loses_the_commit_race() {
    let config = StoreConfig::default();
    let provider = Arc::new(InMemoryIdentityProvider::new());

    for _ in 0..200 {
        let store = Arc::new(GatedProfileStore::new());
        let manager = AuthSessionManager::new(provider.clone(), store.clone(), &config);

        let e1 = tokio::spawn({
            let manager = manager.clone();
            async move {
                manager
                    .apply_session_event(Some(Identity {
                        uid: "u1".into(),
                        email: "jo@example.com".into(),
                        display_name: None,
                    }))
                    .await;
            }
        });
        wait_for(|| store.entered.load(AtomicOrdering::SeqCst)).await;

        // Release E1's lookup and apply the sign-out concurrently, so
        // E1's commit attempt races the newer event's bump-and-commit.
        store.gate.add_permits(1);
        manager.apply_session_event(None).await;
        e1.await.unwrap();
        assert_eq!(manager.current(), SessionState::Anonymous);
    }
}
