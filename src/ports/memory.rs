//! In-memory implementations of the external ports.
//!
//! Used by the test suite and as an offline fallback dataset. The
//! production orchestrator has no knowledge of these; they are plain
//! implementations of the same traits the real providers implement.
//!
//! Locks here are `parking_lot` mutexes and are never held across an
//! await point.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{AuthError, AuthErrorKind, StoreError, StoreResult};
use crate::models::PaymentIntent;
use crate::ports::{
    Document, DocumentStore, Filter, GatewayError, Identity, IdentityProvider, Ordering,
    PaymentGateway, SessionEvent,
};

/// Document database backed by nested maps. Collections are created on
/// first write; iteration order is stable (id order).
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Document>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every read fail until cleared. Test hook.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, AtomicOrdering::SeqCst);
    }

    /// Makes every write fail until cleared. Test hook.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Store("read unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Store("write unavailable".into()))
        } else {
            Ok(())
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(O::Equal),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => x.cmp(y),
            _ => O::Equal,
        },
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        ordering: Option<&Ordering>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<(String, Document)>> {
        self.check_read()?;
        let mut rows: Vec<(String, Document)> = {
            let collections = self.collections.lock();
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|(_, doc)| filters.iter().all(|f| f.matches(doc)))
                        .map(|(id, doc)| (id.clone(), doc.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(ordering) = ordering {
            rows.sort_by(|(_, a), (_, b)| {
                let cmp = compare_values(
                    a.get(&ordering.field).unwrap_or(&Value::Null),
                    b.get(&ordering.field).unwrap_or(&Value::Null),
                );
                if ordering.descending { cmp.reverse() } else { cmp }
            });
        }
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check_read()?;
        Ok(self
            .collections
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn create(&self, collection: &str, record: Document) -> StoreResult<String> {
        self.check_write()?;
        let id = Uuid::new_v4().to_string();
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, record: Document) -> StoreResult<()> {
        self.check_write()?;
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), record);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> StoreResult<()> {
        self.check_write()?;
        let mut collections = self.collections.lock();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::Store(format!("{collection}/{id} not found")))?;
        for (key, value) in patch {
            doc.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_write()?;
        if let Some(docs) = self.collections.lock().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

struct AccountRecord {
    uid: String,
    password: String,
    display_name: Option<String>,
}

/// Identity provider with local accounts and a push session feed.
/// Sign-up signs the new identity in, matching hosted providers.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, AccountRecord>>,
    session_tx: Mutex<Option<mpsc::Sender<SessionEvent>>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account without emitting a session event. Returns the
    /// assigned identity id.
    pub fn add_account(&self, email: &str, password: &str, name: Option<&str>) -> String {
        let uid = Uuid::new_v4().to_string();
        self.accounts.lock().insert(
            email.to_string(),
            AccountRecord {
                uid: uid.clone(),
                password: password.to_string(),
                display_name: name.map(str::to_string),
            },
        );
        uid
    }

    async fn push(&self, event: SessionEvent) {
        let tx = self.session_tx.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = {
            let accounts = self.accounts.lock();
            let account = accounts
                .get(email)
                .ok_or_else(|| AuthError::new(AuthErrorKind::NotRegistered))?;
            if account.password != password {
                return Err(AuthError::new(AuthErrorKind::WrongCredential));
            }
            Identity {
                uid: account.uid.clone(),
                email: email.to_string(),
                display_name: account.display_name.clone(),
            }
        };
        self.push(Some(identity.clone())).await;
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::new(AuthErrorKind::InvalidEmail));
        }
        if password.len() < 6 {
            return Err(AuthError::new(AuthErrorKind::WeakPassword));
        }
        let identity = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(email) {
                return Err(AuthError::new(AuthErrorKind::EmailInUse));
            }
            let uid = Uuid::new_v4().to_string();
            accounts.insert(
                email.to_string(),
                AccountRecord {
                    uid: uid.clone(),
                    password: password.to_string(),
                    display_name: None,
                },
            );
            Identity {
                uid,
                email: email.to_string(),
                display_name: None,
            }
        };
        self.push(Some(identity.clone())).await;
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.push(None).await;
        Ok(())
    }

    async fn set_display_name(&self, uid: &str, name: &str) -> Result<(), AuthError> {
        let mut accounts = self.accounts.lock();
        for account in accounts.values_mut() {
            if account.uid == uid {
                account.display_name = Some(name.to_string());
                return Ok(());
            }
        }
        Err(AuthError::with_detail(
            AuthErrorKind::Other,
            format!("unknown identity {uid}"),
        ))
    }

    fn subscribe_session_changes(&self) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(16);
        *self.session_tx.lock() = Some(tx);
        rx
    }
}

struct IntentRecord {
    amount_minor: i64,
    consumed: bool,
}

/// Payment gateway with scriptable failures and a charge log.
#[derive(Default)]
pub struct InMemoryPaymentGateway {
    intents: Mutex<HashMap<String, IntentRecord>>,
    decline_with: Mutex<Option<String>>,
    fail_setup: AtomicBool,
    charges: Mutex<Vec<(String, i64)>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes intent creation fail until cleared. Test hook.
    pub fn fail_setup(&self, fail: bool) {
        self.fail_setup.store(fail, AtomicOrdering::SeqCst);
    }

    /// Declines every confirmation with the given message until cleared.
    pub fn decline_with(&self, message: Option<&str>) {
        *self.decline_with.lock() = message.map(str::to_string);
    }

    /// Transaction references and amounts of every successful charge.
    pub fn charges(&self) -> Vec<(String, i64)> {
        self.charges.lock().clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_intent(&self, amount_minor: i64) -> Result<PaymentIntent, GatewayError> {
        if self.fail_setup.load(AtomicOrdering::SeqCst) {
            return Err(GatewayError::Setup("payment service unavailable".into()));
        }
        let client_secret = format!("pi_{}_secret", Uuid::new_v4().simple());
        self.intents.lock().insert(
            client_secret.clone(),
            IntentRecord {
                amount_minor,
                consumed: false,
            },
        );
        Ok(PaymentIntent {
            client_secret,
            amount_minor,
        })
    }

    async fn confirm_payment(
        &self,
        client_secret: &str,
        _payment_method_token: &str,
    ) -> Result<String, GatewayError> {
        if let Some(message) = self.decline_with.lock().clone() {
            return Err(GatewayError::Declined(message));
        }
        let amount = {
            let mut intents = self.intents.lock();
            let intent = intents
                .get_mut(client_secret)
                .ok_or_else(|| GatewayError::Declined("unknown payment intent".into()))?;
            if intent.consumed {
                return Err(GatewayError::Declined("payment intent already used".into()));
            }
            intent.consumed = true;
            intent.amount_minor
        };
        let reference = format!("ch_{}", Uuid::new_v4().simple());
        self.charges.lock().push((reference.clone(), amount));
        Ok(reference)
    }
}
