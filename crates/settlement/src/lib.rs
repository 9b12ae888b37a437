//! Deferred order settlement.
//!
//! Checkout returns to the caller immediately; this crate owns the
//! "payment settles later" half. Orders are handed to a background
//! worker through a queue, completed after a configurable delay, and
//! retried on storage failure. Completion is a conditional update in
//! the store, so repeated attempts and attempts against orders that
//! were cancelled in the meantime are harmless.

pub mod worker;

pub use worker::{SettlementConfig, SettlementQueue, SettlementWorker};
