//! In-memory ledger for running a sale off-chain: the asset being sold, base
//! currency wallets, and every sale ledger, all held in plain maps.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use alloy_primitives::{Address, LogData, U256};
use alloy_sol_types::SolEvent;

use crate::config::SaleConfig;
use crate::error::{
    AlreadyInitialized, AssetTransferFailed, Errors, NotInitialized, PaymentTransferFailed,
    ZeroValueArgumentInjected,
};
use crate::host::Host;
use crate::pool::{split_caps, StagePool};
use crate::presale::PresaleLedger;
use crate::sale::{Sale, SaleStore};
use crate::schedule::{RateTable, Stage};
use crate::vault::{RefundVault, VaultState};
use crate::whitelist::Whitelist;

/// Called when `account` receives the asset or base currency, like a token
/// receive callback. May call back into the sale.
pub type ReceiveHook = fn(&mut MemoryLedger, Address) -> Result<(), Errors>;

/// Fungible asset with a fixed supply. Transfers never create or destroy
/// units and fail without effect when the sender is short.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryAsset {
    total_supply: U256,
    balances: BTreeMap<Address, U256>,
}

impl MemoryAsset {
    /// Create the whole supply on `holder`
    pub fn mint(holder: Address, supply: U256) -> Self {
        Self {
            total_supply: supply,
            balances: BTreeMap::from([(holder, supply)]),
        }
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), Errors> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(Errors::AssetTransferFailed(AssetTransferFailed {}));
        }

        self.balances.insert(from, balance - amount);
        let received = self.balance_of(to) + amount;
        self.balances.insert(to, received);
        Ok(())
    }
}

/// Asset and base currency balances saved ahead of a transfer
struct Balances {
    asset: MemoryAsset,
    wallets: BTreeMap<Address, U256>,
}

#[derive(Clone)]
pub struct MemoryLedger {
    address: Address,
    config: Option<SaleConfig>,
    rates: RateTable,
    caps: [U256; 7],
    sold: [U256; 7],
    whitelist: BTreeSet<Address>,
    allowances: BTreeMap<Address, U256>,
    vault: VaultState,
    deposits: BTreeMap<Address, U256>,
    raised: U256,
    entered: bool,
    asset: MemoryAsset,
    wallets: BTreeMap<Address, U256>,
    hooks: BTreeMap<Address, ReceiveHook>,
    logs: Vec<LogData>,
}

impl MemoryLedger {
    /// A sale living at `address`, uninitialized until [`MemoryLedger::init`]
    pub fn new(address: Address, asset: MemoryAsset) -> Self {
        Self {
            address,
            config: None,
            rates: RateTable::default(),
            caps: [U256::ZERO; 7],
            sold: [U256::ZERO; 7],
            whitelist: BTreeSet::new(),
            allowances: BTreeMap::new(),
            vault: VaultState::Active,
            deposits: BTreeMap::new(),
            raised: U256::ZERO,
            entered: false,
            asset,
            wallets: BTreeMap::new(),
            hooks: BTreeMap::new(),
            logs: Vec::new(),
        }
    }

    pub fn with_rates(mut self, rates: RateTable) -> Self {
        self.rates = rates;
        self
    }

    /// Fix the configuration and split `provisioned` asset units into the
    /// stage pools. Only possible once.
    pub fn init(&mut self, config: SaleConfig, provisioned: U256) -> Result<(), Errors> {
        if self.config.is_some() {
            return Err(Errors::AlreadyInitialized(AlreadyInitialized {}));
        }

        config.validate()?;
        if provisioned.is_zero() {
            return Err(Errors::ZeroValueArgumentInjected(ZeroValueArgumentInjected {}));
        }

        self.caps = split_caps(provisioned);
        self.config = Some(config);
        Ok(())
    }

    pub fn sale(&mut self) -> Sale<'_, Self> {
        Sale::new(self)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn asset(&self) -> &MemoryAsset {
        &self.asset
    }

    /// Move asset units between two outside accounts, e.g. to provision the sale
    pub fn transfer_between(&mut self, from: Address, to: Address, amount: U256) -> Result<(), Errors> {
        self.asset.transfer(from, to, amount)
    }

    /// Credit base currency to a wallet
    pub fn fund(&mut self, account: Address, amount: U256) {
        let balance = self.wallet(account).saturating_add(amount);
        self.wallets.insert(account, balance);
    }

    /// Base currency held by `account`
    pub fn wallet(&self, account: Address) -> U256 {
        self.wallets.get(&account).copied().unwrap_or_default()
    }

    /// Base currency held in escrow by the sale
    pub fn vault_balance(&self) -> U256 {
        self.wallet(self.address)
    }

    pub fn on_receive(&mut self, account: Address, hook: ReceiveHook) {
        self.hooks.insert(account, hook);
    }

    /// Events emitted so far, oldest first
    pub fn logs(&self) -> &[LogData] {
        &self.logs
    }

    /// Number of emitted events of type `E`
    pub fn count_logs<E: SolEvent>(&self) -> usize {
        self.logs
            .iter()
            .filter(|log| log.topics().first() == Some(&E::SIGNATURE_HASH))
            .count()
    }

    fn move_value(&mut self, from: Address, to: Address, amount: U256) -> Result<(), Errors> {
        let balance = self.wallet(from);
        if balance < amount {
            return Err(Errors::PaymentTransferFailed(PaymentTransferFailed {}));
        }

        self.wallets.insert(from, balance - amount);
        self.fund(to, amount);
        Ok(())
    }

    /// Run the receive hook of `account`. If it fails, every balance it or
    /// the preceding transfer touched is put back, like a reverted call.
    fn notify(&mut self, account: Address, before: Balances) -> Result<(), Errors> {
        let hook = match self.hooks.get(&account).copied() {
            Some(hook) => hook,
            None => return Ok(()),
        };

        hook(self, account).map_err(|err| {
            self.asset = before.asset;
            self.wallets = before.wallets;
            err
        })
    }

    fn balances(&self) -> Balances {
        Balances {
            asset: self.asset.clone(),
            wallets: self.wallets.clone(),
        }
    }
}

impl StagePool for MemoryLedger {
    fn cap(&self, stage: Stage) -> U256 {
        stage.slot().map_or(U256::ZERO, |slot| self.caps[slot])
    }

    fn sold(&self, stage: Stage) -> U256 {
        stage.slot().map_or(U256::ZERO, |slot| self.sold[slot])
    }

    fn set_sold(&mut self, stage: Stage, sold: U256) {
        if let Some(slot) = stage.slot() {
            self.sold[slot] = sold;
        }
    }
}

impl Whitelist for MemoryLedger {
    fn whitelisted(&self, account: Address) -> bool {
        self.whitelist.contains(&account)
    }

    fn set_whitelisted(&mut self, account: Address) {
        self.whitelist.insert(account);
    }
}

impl PresaleLedger for MemoryLedger {
    fn allowance(&self, buyer: Address) -> U256 {
        self.allowances.get(&buyer).copied().unwrap_or_default()
    }

    fn set_allowance(&mut self, buyer: Address, allowance: U256) {
        self.allowances.insert(buyer, allowance);
    }
}

impl RefundVault for MemoryLedger {
    fn vault_state(&self) -> VaultState {
        self.vault
    }

    fn set_vault_state(&mut self, state: VaultState) {
        self.vault = state;
    }

    fn deposited(&self, buyer: Address) -> U256 {
        self.deposits.get(&buyer).copied().unwrap_or_default()
    }

    fn set_deposited(&mut self, buyer: Address, amount: U256) {
        self.deposits.insert(buyer, amount);
    }

    fn raised(&self) -> U256 {
        self.raised
    }

    fn set_raised(&mut self, raised: U256) {
        self.raised = raised;
    }
}

impl Host for MemoryLedger {
    fn asset_balance(&mut self) -> Result<U256, Errors> {
        Ok(self.asset.balance_of(self.address))
    }

    fn transfer_asset(&mut self, to: Address, amount: U256) -> Result<(), Errors> {
        let before = self.balances();
        self.asset.transfer(self.address, to, amount)?;
        self.notify(to, before)
    }

    fn accept_payment(&mut self, from: Address, amount: U256) -> Result<(), Errors> {
        self.move_value(from, self.address, amount)
    }

    fn return_payment(&mut self, to: Address, amount: U256) -> Result<(), Errors> {
        self.move_value(self.address, to, amount)
    }

    fn send_payment(&mut self, to: Address, amount: U256) -> Result<(), Errors> {
        let before = self.balances();
        self.move_value(self.address, to, amount)?;
        self.notify(to, before)
    }

    fn emit<E: SolEvent>(&mut self, event: E) {
        let topics = event.encode_topics().into_iter().map(|topic| topic.0).collect();
        self.logs.push(LogData::new_unchecked(topics, event.encode_data().into()));
    }
}

impl SaleStore for MemoryLedger {
    fn config(&self) -> Result<SaleConfig, Errors> {
        self.config.ok_or(Errors::NotInitialized(NotInitialized {}))
    }

    fn entered(&self) -> bool {
        self.entered
    }

    fn set_entered(&mut self, entered: bool) {
        self.entered = entered;
    }

    fn rates(&self) -> RateTable {
        self.rates
    }
}
