//! Ledger actions and their dispatch to wallets
//!
//! The swap daemon describes every step that touches a ledger as a tagged
//! `LedgerAction`. The dispatcher turns that description into exactly one
//! wallet call.

pub mod dispatcher;
pub mod ledger;

pub use dispatcher::{LedgerActionDispatcher, LedgerActionOutcome};
pub use ledger::LedgerAction;
