//! Everything the sale needs from the ledger it runs on: moving the asset it
//! sells, moving base currency in and out of the vault, and logging events.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;

use crate::error::Errors;

pub trait Host {
    /// Asset units currently held by the sale itself
    fn asset_balance(&mut self) -> Result<U256, Errors>;

    /// Send `amount` of the asset from the sale's holdings to `to`. Must either
    /// move the full amount or fail with nothing moved.
    fn transfer_asset(&mut self, to: Address, amount: U256) -> Result<(), Errors>;

    /// Take the base currency attached to a purchase into the vault
    fn accept_payment(&mut self, from: Address, amount: U256) -> Result<(), Errors>;

    /// Give back the attached base currency of a purchase that failed after
    /// `accept_payment` went through
    fn return_payment(&mut self, to: Address, amount: U256) -> Result<(), Errors>;

    /// Pay base currency out of the vault
    fn send_payment(&mut self, to: Address, amount: U256) -> Result<(), Errors>;

    fn emit<E: SolEvent>(&mut self, event: E);
}
