//! Contracts for the external collaborators the core depends on.
//!
//! Concrete providers (document database, identity service, payment
//! gateway) live behind these traits and are injected as `Arc<dyn Trait>`
//! into the service constructors. `memory` holds the in-memory
//! implementations used by tests and offline fallback.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::error::{AuthError, StoreResult};
use crate::models::PaymentIntent;

pub mod memory;

/// A stored record: flat JSON object keyed by field name.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Gte => match (actual.as_f64(), self.value.as_f64()) {
                (Some(a), Some(b)) => a >= b,
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Read/write access to the external document database.
///
/// Errors are fatal to the operation; the core never retries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        ordering: Option<&Ordering>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<(String, Document)>>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Creates a record under a store-assigned id.
    async fn create(&self, collection: &str, record: Document) -> StoreResult<String>;

    /// Upserts a record under a caller-chosen id (e.g. a profile keyed by
    /// identity id).
    async fn put(&self, collection: &str, id: &str, record: Document) -> StoreResult<()>;

    async fn update(&self, collection: &str, id: &str, patch: Document) -> StoreResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

/// Provider-side view of an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// One session-change event: `Some` on sign-in, `None` on sign-out.
pub type SessionEvent = Option<Identity>;

/// External identity provider. Session state is pushed through the
/// subscription feed; `sign_in`/`sign_out` only initiate transitions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn set_display_name(&self, uid: &str, name: &str) -> Result<(), AuthError>;

    /// At most one active subscription per manager instance. Events are
    /// delivered asynchronously in order.
    fn subscribe_session_changes(&self) -> mpsc::Receiver<SessionEvent>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Could not obtain a payment intent.
    #[error("{0}")]
    Setup(String),

    /// The gateway declined the payment.
    #[error("{0}")]
    Declined(String),
}

/// External payment gateway. Amounts are in minor currency units.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, amount_minor: i64) -> Result<PaymentIntent, GatewayError>;

    /// Confirms the intent with a payment method token; returns a
    /// transaction reference on success.
    async fn confirm_payment(
        &self,
        client_secret: &str,
        payment_method_token: &str,
    ) -> Result<String, GatewayError>;
}

/// Cancellation source handed to whoever may abort a checkout (e.g. the
/// navigation layer).
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation token raced against pending, not-yet-confirmed remote
/// calls. A confirmed payment is never cancelled client-side.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that never fires, for callers without a cancellation path.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the
    /// source is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
