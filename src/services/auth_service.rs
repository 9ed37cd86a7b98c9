//! Session state derived from the identity provider's push feed.
//!
//! The manager never sets `Authenticated` from `login` directly; the
//! provider's session-change feed is the only writer of session state.
//! Each feed event is tagged with a monotonically increasing generation
//! before its derived-profile lookup starts, and the resolved state is
//! committed only if no newer event has been assigned since. A stale
//! lookup can therefore never overwrite a newer session state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::models::{User, UserProfile};
use crate::ports::{Document, DocumentStore, Identity, IdentityProvider, SessionEvent};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The provider has not reported in yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

pub struct AuthSessionManager {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    users_collection: String,
    state_tx: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl AuthSessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        config: &StoreConfig,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(SessionState::Unknown);
        Arc::new(Self {
            provider,
            store,
            users_collection: config.users_collection.clone(),
            state_tx,
            generation: AtomicU64::new(0),
        })
    }

    /// Subscribes to the provider's session feed and applies events for
    /// the life of the returned task. Generations are assigned in
    /// delivery order; profile lookups run concurrently so a slow read
    /// cannot delay later events.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let mut feed = self.provider.subscribe_session_changes();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = feed.recv().await {
                let generation =
                    manager.generation.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                let m = Arc::clone(&manager);
                tokio::spawn(async move {
                    m.apply_with_generation(generation, event).await;
                });
            }
        })
    }

    /// Applies one session event as if it had just arrived on the feed.
    pub async fn apply_session_event(&self, event: SessionEvent) {
        let generation = self.generation.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        self.apply_with_generation(generation, event).await;
    }

    async fn apply_with_generation(&self, generation: u64, event: SessionEvent) {
        let next = match event {
            None => SessionState::Anonymous,
            Some(identity) => SessionState::Authenticated(self.resolve_user(identity).await),
        };
        // The staleness check and the state write happen together under
        // the watch channel's lock. A newer event bumps the counter
        // before it can reach this closure, so a resolution that sees a
        // bumped counter here can never commit over the newer state.
        let committed = self.state_tx.send_if_modified(|state| {
            if self.generation.load(AtomicOrdering::SeqCst) != generation {
                return false;
            }
            *state = next.clone();
            true
        });
        if committed {
            tracing::info!(state = variant_name(&next), "session state changed");
        } else {
            tracing::warn!(generation, "discarding stale session resolution");
        }
    }

    /// Current state, cloned. `Unknown` until the feed reports in.
    pub fn current(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Watch subscription for UI-style observers.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Verifies credentials with the provider. Success does not set
    /// session state; the push feed delivers the transition.
    pub async fn login(&self, email: &str, password: &str) -> StoreResult<()> {
        self.provider
            .sign_in(email, password)
            .await
            .map_err(|err| {
                tracing::debug!(error = ?err.detail, kind = ?err.kind, "sign-in failed");
                StoreError::Auth(err)
            })?;
        Ok(())
    }

    /// Creates a new identity, sets its display name, and writes the
    /// denormalized profile record. Registration success is determined
    /// by identity creation alone; the secondary writes are logged at
    /// warn on failure, never surfaced as a registration failure.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> StoreResult<()> {
        let identity = self
            .provider
            .sign_up(email, password)
            .await
            .map_err(StoreError::Auth)?;

        if let Err(err) = self.provider.set_display_name(&identity.uid, name).await {
            tracing::warn!(error = %err, uid = %identity.uid, "display name update failed");
        }

        let profile = UserProfile {
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        if let Err(err) = self
            .store
            .put(&self.users_collection, &identity.uid, profile_to_doc(&profile))
            .await
        {
            tracing::warn!(error = %err, uid = %identity.uid, "profile record write failed");
        }

        Ok(())
    }

    /// Requests session termination; the feed delivers `Anonymous`.
    pub async fn logout(&self) -> StoreResult<()> {
        self.provider.sign_out().await.map_err(StoreError::Auth)?;
        Ok(())
    }

    /// Builds the application user, resolving the display name as:
    /// profile record name, then provider display name, then the email
    /// local-part, then "User".
    async fn resolve_user(&self, identity: Identity) -> User {
        let profile_name = match self.store.get(&self.users_collection, &identity.uid).await {
            Ok(doc) => doc
                .as_ref()
                .and_then(|d| d.get("name"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            Err(err) => {
                tracing::warn!(error = %err, uid = %identity.uid, "profile lookup failed");
                None
            }
        };

        let name = profile_name
            .or(identity.display_name)
            .or_else(|| {
                identity
                    .email
                    .split('@')
                    .next()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "User".to_string());

        User {
            id: identity.uid,
            name,
            email: identity.email,
        }
    }
}

fn profile_to_doc(profile: &UserProfile) -> Document {
    match serde_json::to_value(profile) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Document::new(),
    }
}

fn variant_name(state: &SessionState) -> &'static str {
    match state {
        SessionState::Unknown => "unknown",
        SessionState::Anonymous => "anonymous",
        SessionState::Authenticated(_) => "authenticated",
    }
}
