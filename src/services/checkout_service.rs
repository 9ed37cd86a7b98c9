//! Checkout sequencing: validation, payment intent, confirmation, order
//! persistence, cart clearing.
//!
//! One linear state machine per attempt, single-flight per orchestrator.
//! The current state is published on a watch channel so the UI can track
//! progress. Cancellation is honored only while nothing has been
//! charged: the token is raced against intent creation and checked once
//! more before the confirmation is submitted; after that the attempt
//! runs to completion or fails on its own terms.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::error::{StoreError, StoreResult};
use crate::models::{Address, Order, OrderItem};
use crate::money;
use crate::ports::{CancelToken, GatewayError, PaymentGateway};
use crate::services::cart_service::SharedCart;
use crate::services::order_service::OrderStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutFailure {
    EmptyCart,
    PaymentSetup(String),
    PaymentDeclined(String),
    /// Payment succeeded but the order write failed. Reconciliation
    /// required; the charge is never re-attempted.
    OrderPersist(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    /// No attempt has run yet.
    #[default]
    Idle,
    Validating,
    AwaitingPaymentIntent,
    AwaitingPaymentConfirmation,
    PersistingOrder,
    Complete,
    Failed(CheckoutFailure),
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: String,
    /// Payment method token collected by the payment UI.
    pub payment_method_token: String,
    pub address: Address,
}

pub struct CheckoutOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    orders: OrderStore,
    state_tx: watch::Sender<CheckoutState>,
    in_flight: Mutex<()>,
}

impl CheckoutOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, orders: OrderStore) -> Self {
        let (state_tx, _) = watch::channel(CheckoutState::Idle);
        Self {
            gateway,
            orders,
            state_tx,
            in_flight: Mutex::new(()),
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state_tx.subscribe()
    }

    /// Runs one checkout attempt over the cart's current snapshot.
    /// A second call while one is in flight is rejected, never
    /// interleaved.
    pub async fn checkout(
        &self,
        cart: &SharedCart,
        request: CheckoutRequest,
        cancel: CancelToken,
    ) -> StoreResult<Order> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            return Err(StoreError::CheckoutInProgress);
        };
        self.run(cart, request, cancel).await
    }

    async fn run(
        &self,
        cart: &SharedCart,
        request: CheckoutRequest,
        cancel: CancelToken,
    ) -> StoreResult<Order> {
        self.set(CheckoutState::Validating);
        let snapshot = cart.snapshot();
        if snapshot.is_empty() {
            return Err(self.fail(CheckoutFailure::EmptyCart));
        }
        if cancel.is_cancelled() {
            return Err(self.fail(CheckoutFailure::Cancelled));
        }

        self.set(CheckoutState::AwaitingPaymentIntent);
        let amount_minor = money::to_minor_units(snapshot.subtotal);
        let intent = match with_cancel(&cancel, self.gateway.create_intent(amount_minor)).await {
            None => return Err(self.fail(CheckoutFailure::Cancelled)),
            Some(Err(GatewayError::Setup(msg) | GatewayError::Declined(msg))) => {
                return Err(self.fail(CheckoutFailure::PaymentSetup(msg)));
            }
            Some(Ok(intent)) => intent,
        };

        self.set(CheckoutState::AwaitingPaymentConfirmation);
        // Last cancellation point: once the confirmation is submitted it
        // runs to completion.
        if cancel.is_cancelled() {
            return Err(self.fail(CheckoutFailure::Cancelled));
        }
        let transaction = match self
            .gateway
            .confirm_payment(&intent.client_secret, &request.payment_method_token)
            .await
        {
            Ok(reference) => reference,
            Err(GatewayError::Declined(msg) | GatewayError::Setup(msg)) => {
                return Err(self.fail(CheckoutFailure::PaymentDeclined(msg)));
            }
        };

        self.set(CheckoutState::PersistingOrder);
        let items: Vec<OrderItem> = snapshot
            .items
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();
        let total = money::order_total(snapshot.subtotal);
        let order = match self
            .orders
            .create(&request.user_id, items, total, request.address.clone())
            .await
        {
            Ok(order) => order,
            Err(err) => {
                // Payment has already succeeded: this is a reconciliation
                // case, not a payment failure, and the charge must not be
                // re-attempted.
                tracing::error!(
                    user_id = %request.user_id,
                    transaction = %transaction,
                    amount_minor,
                    error = %err,
                    "order persist failed after successful payment; reconciliation required"
                );
                return Err(self.fail(CheckoutFailure::OrderPersist(err.to_string())));
            }
        };

        cart.clear();
        self.set(CheckoutState::Complete);
        tracing::info!(
            order_id = %order.id,
            transaction = %transaction,
            total = %order.total,
            "checkout complete"
        );
        Ok(order)
    }

    fn set(&self, state: CheckoutState) {
        self.state_tx.send_replace(state);
    }

    fn fail(&self, failure: CheckoutFailure) -> StoreError {
        let err = match &failure {
            CheckoutFailure::EmptyCart => StoreError::Validation("cart is empty".into()),
            CheckoutFailure::PaymentSetup(msg) => StoreError::PaymentSetup(msg.clone()),
            CheckoutFailure::PaymentDeclined(msg) => StoreError::PaymentDeclined(msg.clone()),
            CheckoutFailure::OrderPersist(msg) => StoreError::OrderPersist(msg.clone()),
            CheckoutFailure::Cancelled => StoreError::Cancelled,
        };
        self.state_tx.send_replace(CheckoutState::Failed(failure));
        err
    }
}

/// Races a pending remote call against the cancellation token.
/// `None` means cancellation won.
async fn with_cancel<T>(cancel: &CancelToken, fut: impl Future<Output = T>) -> Option<T> {
    let mut cancel = cancel.clone();
    tokio::select! {
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
