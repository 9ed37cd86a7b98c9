//! Cart, checkout, and session core of a storefront application.
//!
//! The library owns the shopping cart, derives all money totals, runs
//! the checkout state machine against an injected payment gateway and
//! document store, and tracks the signed-in identity from a provider's
//! push feed. Rendering, routing, and the concrete provider SDKs live
//! outside this crate; they talk to it through the traits in [`ports`].

pub mod config;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod money;
pub mod ports;
pub mod services;
