//! Staged token sale: a fixed pool of tokens sold to whitelisted buyers at a rate that steps down
//! week by week, with presale commitments honored at the presale rate and every payment held in a
//! refund vault until the sale is finalized against its funding goal.
//! The engine is written against storage traits so it runs both on-chain, through the Stylus
//! entrypoint in `contract`, and off-chain on the in-memory ledger in `memory`.
//! The on-chain program is ABI-equivalent with Solidity. To export the interface, run `cargo stylus export-abi`.

// Allow `cargo stylus export-abi` to generate a main function.
#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]

extern crate alloc;

/// Use a small allocator on-chain to keep the program size down
#[cfg(target_arch = "wasm32")]
#[global_allocator]
static ALLOC: mini_alloc::MiniAlloc = mini_alloc::MiniAlloc::INIT;

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod memory;
pub mod pool;
pub mod presale;
pub mod sale;
pub mod schedule;
pub mod vault;
pub mod whitelist;

#[cfg(any(target_arch = "wasm32", feature = "export-abi"))]
pub mod contract;

pub use config::SaleConfig;
pub use error::Errors;
pub use memory::{MemoryAsset, MemoryLedger};
pub use sale::{Sale, SaleStore};
pub use schedule::{RateTable, Stage};
pub use vault::VaultState;

#[cfg(feature = "export-abi")]
pub use contract::print_abi;
