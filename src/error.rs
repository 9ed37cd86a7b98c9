use thiserror::Error;

/// Classified identity-provider failures.
///
/// Each kind maps to a fixed user-facing message; anything the provider
/// reports that we do not recognize lands in `Other` and falls back to a
/// generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotRegistered,
    WrongCredential,
    InvalidCredential,
    RateLimited,
    MisconfiguredProvider,
    EmailInUse,
    InvalidEmail,
    WeakPassword,
    Other,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", self.user_message())]
pub struct AuthError {
    pub kind: AuthErrorKind,
    /// Raw provider message, kept for logs only.
    pub detail: Option<String>,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail(kind: AuthErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }

    /// Fixed message per kind; unrecognized kinds get the generic fallback.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotRegistered => "Email not registered",
            AuthErrorKind::WrongCredential => "Incorrect password",
            AuthErrorKind::InvalidCredential => "Invalid email or password",
            AuthErrorKind::RateLimited => "Too many failed login attempts. Try again later",
            AuthErrorKind::MisconfiguredProvider => "Authentication is not configured correctly",
            AuthErrorKind::EmailInUse => "Email already in use",
            AuthErrorKind::InvalidEmail => "Invalid email format",
            AuthErrorKind::WeakPassword => "Password is too weak",
            AuthErrorKind::Other => "Failed to sign in",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Locally recoverable input problem (empty cart, invalid quantity).
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Could not obtain a payment intent; checkout did not proceed.
    #[error("Unable to initialize payment: {0}")]
    PaymentSetup(String),

    /// Gateway declined the confirmation; message is the gateway's where
    /// available. The cart is untouched and checkout may be retried.
    #[error("{0}")]
    PaymentDeclined(String),

    /// Payment succeeded but the order write failed. Reconciliation
    /// required; never worded as a payment failure.
    #[error("Your payment was received but we could not record the order: {0}")]
    OrderPersist(String),

    /// Document-store failure outside the checkout persist step.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Checkout cancelled")]
    Cancelled,

    /// A checkout attempt is already in flight for this cart.
    #[error("A checkout is already in progress")]
    CheckoutInProgress,

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
