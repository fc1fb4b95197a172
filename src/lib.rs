//! Tesseract swap SDK - atomic cross-chain swap execution and negotiation
//!
//! Drives swaps exposed by a swap daemon as hypermedia resources, dispatches
//! the ledger actions they return to Bitcoin, Ethereum and Lightning wallets,
//! and lets a maker and a taker agree on swap terms over HTTP.

pub mod action;
pub mod api;
pub mod asset;
pub mod client;
pub mod cnd;
pub mod config;
pub mod error;
pub mod metrics;
pub mod negotiation;
pub mod siren;
pub mod swap;
pub mod tx;
pub mod wallet;

pub use action::{LedgerAction, LedgerActionDispatcher, LedgerActionOutcome};
pub use client::ComitClient;
pub use error::{SdkError, SdkResult, ValidationError, WalletError};
pub use swap::{ActionOutcome, Swap, TryParams};
pub use tx::{Transaction, TransactionStatus};
pub use wallet::{BitcoinWallet, EthereumWallet, LightningWallet, Wallets};
