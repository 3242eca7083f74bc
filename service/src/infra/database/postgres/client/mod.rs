//! Postgres database client definitions.
//!
//! [`NonTx`] runs every statement on a pooled connection, while [`Tx`] holds
//! a single connection with an opened transaction until it's committed or
//! dropped.

pub mod non_tx;
pub mod tx;

pub use self::{non_tx::NonTx, tx::Tx};
