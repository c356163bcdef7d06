//! Ecash wallet core
//!
//! Drives the protocol types of [`pecan_core`] against a mint: quote and
//! mint, select and swap, send and receive (including P2PK/HTLC locked
//! ecash), melt over lightning, transfer between mints, and seed restore.
//!
//! The wallet is generic over its two collaborators: a [`MintConnector`] for
//! the mint's HTTP surface and a [`WalletStore`] for persistence. An
//! in-memory store is included; real deployments plug in their own.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod client;
pub mod error;
pub mod localstore;
pub mod types;
pub mod wallet;

pub use client::{HttpClient, MintConnector};
pub use error::Error;
pub use localstore::{MemoryStore, WalletStore};
pub use types::{Invoice, InvoiceKind, Melted, ReceiveOptions, SendOptions};
pub use wallet::Wallet;
