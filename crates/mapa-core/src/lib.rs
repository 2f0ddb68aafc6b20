//! Core types and trait definitions for the MetaMapa aggregator.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the domain model, the pure evaluation engines (criteria, consensus, spam,
//! fingerprinting) and the two seams the rest of the workspace plugs into:
//! [`store::MapaStore`] and [`source::SourceAdapter`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod collection;
pub mod consensus;
pub mod criteria;
pub mod deletion;
pub mod error;
pub mod fact;
pub mod fingerprint;
pub mod place;
pub mod source;
pub mod spam;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
