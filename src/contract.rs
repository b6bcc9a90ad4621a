//! On-chain entrypoint. Storage follows the Solidity ABI, so the sale can be
//! called from both Solidity and Rust; run `cargo stylus export-abi` for the
//! interface.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;
use stylus_sdk::{
    block, // Includes block::timestamp
    call,  // ETH transfers out of the vault
    contract,
    evm, // Events
    msg, // Access msg::sender and msg::value
    prelude::*,
};

use crate::config::SaleConfig;
use crate::error::{
    AlreadyInitialized, AssetTransferFailed, Errors, NotInitialized, PaymentTransferFailed,
    ZeroValueArgumentInjected,
};
use crate::host::Host;
use crate::pool::{split_caps, StagePool};
use crate::presale::PresaleLedger;
use crate::sale::{Sale, SaleStore};
use crate::schedule::Stage;
use crate::vault::{RefundVault, VaultState};
use crate::whitelist::Whitelist;

sol_interface! {
    interface IERC20 {
        function balanceOf(address) external returns (uint256);
        function transfer(address, uint256) external returns (bool);
    }
}

sol_storage! {
    #[entrypoint]
    pub struct StagedTokenSale {
        bool initialized;                                   // Required before contract usage
        address admin;                                      // Account running whitelist, presale, finalize
        address beneficiary;                                // Receives the vault when the goal is met
        address token;                                      // Token being sold
        uint256 start_time;                                 // Presale ends right after this timestamp
        uint256 funding_goal;                               // Wei to raise for the sale to succeed
        mapping(uint256 => uint256) stage_cap;              // Tokens allotted per stage code
        mapping(uint256 => uint256) stage_sold;             // Tokens sold per stage code
        mapping(address => bool) whitelist;                 // Approved buyers
        mapping(address => uint256) presale_allowance;      // Wei still eligible for the presale rate
        uint256 vault_state;                                // VaultState::code
        uint256 raised;                                     // Wei deposited across all buyers
        mapping(address => uint256) deposits;               // Wei deposited per buyer, zeroed on refund
        bool entered;                                       // Busy flag for calls moving funds
    }
}

/// External methods for `StagedTokenSale`
#[public]
impl StagedTokenSale {
    /// Initialize the sale; the caller becomes its administrator
    ///
    /// # Arguments
    ///
    /// * `start_time` - Timestamp after which week 1 begins
    /// * `beneficiary` - Account receiving the raised funds if the goal is met
    /// * `token` - The address of the ERC20 being sold
    /// * `funding_goal` - Wei to raise for the sale to succeed
    /// * `total_tokens` - Tokens provisioned to this contract, split over the stage pools
    pub fn init(
        &mut self,
        start_time: u64,
        beneficiary: Address,
        token: Address,
        funding_goal: U256,
        total_tokens: U256,
    ) -> Result<(), Errors> {
        if self.initialized.get() {
            return Err(Errors::AlreadyInitialized(AlreadyInitialized {}));
        }

        let config = SaleConfig {
            admin: msg::sender(),
            start_time,
            beneficiary,
            asset: token,
            funding_goal,
        };
        config.validate()?;
        if total_tokens.is_zero() {
            return Err(Errors::ZeroValueArgumentInjected(ZeroValueArgumentInjected {}));
        }

        self.initialized.set(true);
        self.admin.set(config.admin);
        self.beneficiary.set(beneficiary);
        self.token.set(token);
        self.start_time.set(U256::from(start_time));
        self.funding_goal.set(funding_goal);
        for (stage, cap) in Stage::SELLING.iter().zip(split_caps(total_tokens)) {
            self.stage_cap.setter(stage_key(*stage)).set(cap);
        }

        Ok(())
    }

    pub fn add_to_whitelist(&mut self, account: Address) -> Result<(), Errors> {
        Sale::new(self).add_to_whitelist(msg::sender(), account)?;
        Ok(())
    }

    pub fn add_to_presale(&mut self, buyer: Address, amount: U256) -> Result<(), Errors> {
        Sale::new(self).add_to_presale(msg::sender(), buyer, amount)?;
        Ok(())
    }

    pub fn give_tokens(&mut self, buyer: Address, equivalent: U256) -> Result<U256, Errors> {
        Sale::new(self).give_tokens(msg::sender(), buyer, equivalent, block::timestamp())
    }

    /// Main entry point for buyers, the attached value is the payment
    #[payable]
    pub fn buy_tokens(&mut self) -> Result<U256, Errors> {
        Sale::new(self).purchase(msg::sender(), msg::value(), block::timestamp())
    }

    pub fn finalize(&mut self) -> Result<bool, Errors> {
        Sale::new(self).finalize(msg::sender(), block::timestamp())
    }

    pub fn claim_refund(&mut self) -> Result<U256, Errors> {
        Sale::new(self).claim_refund(msg::sender())
    }

    pub fn get_current_stage(&self) -> Result<u8, Errors> {
        Ok(self.current_stage(block::timestamp())?.code())
    }

    pub fn get_current_rate(&self) -> Result<U256, Errors> {
        self.current_rate(block::timestamp())
    }

    pub fn get_remaining_tokens(&self, stage: u8) -> Result<U256, Errors> {
        Ok(self.remaining(Stage::from_code(stage)?))
    }

    pub fn tokens_sold(&self) -> U256 {
        StagePool::tokens_sold(self)
    }

    pub fn is_whitelisted(&self, account: Address) -> bool {
        self.whitelist.get(account)
    }

    pub fn presale_amount(&self, buyer: Address) -> U256 {
        self.presale_allowance.get(buyer)
    }

    pub fn deposit_of(&self, buyer: Address) -> U256 {
        self.deposits.get(buyer)
    }

    pub fn weis_raised(&self) -> U256 {
        self.raised.get()
    }

    pub fn goal_reached(&self) -> Result<bool, Errors> {
        RefundVault::goal_reached(self)
    }

    pub fn has_closed(&self) -> Result<bool, Errors> {
        Ok(self.config()?.has_closed(block::timestamp()))
    }

    pub fn sale_end(&self) -> Result<u64, Errors> {
        Ok(self.config()?.sale_end())
    }

    /// 0 active, 1 closed with refunds open, 2 closed and forwarded
    pub fn get_vault_state(&self) -> u8 {
        RefundVault::vault_state(self).code()
    }

    /// Tokens allotted to `stage` at init
    pub fn stage_cap(&self, stage: u8) -> Result<U256, Errors> {
        Ok(self.cap(Stage::from_code(stage)?))
    }

    #[selector(name = "RATE_PRESALE")]
    pub fn rate_presale(&self) -> U256 {
        self.rates().presale()
    }

    #[selector(name = "RATE_WEEK1")]
    pub fn rate_week1(&self) -> U256 {
        self.rates().rate(Stage::Week1)
    }

    #[selector(name = "RATE_WEEK2")]
    pub fn rate_week2(&self) -> U256 {
        self.rates().rate(Stage::Week2)
    }

    #[selector(name = "RATE_WEEK3")]
    pub fn rate_week3(&self) -> U256 {
        self.rates().rate(Stage::Week3)
    }

    #[selector(name = "RATE_WEEK4")]
    pub fn rate_week4(&self) -> U256 {
        self.rates().rate(Stage::Week4)
    }

    #[selector(name = "RATE_WEEK5")]
    pub fn rate_week5(&self) -> U256 {
        self.rates().rate(Stage::Week5)
    }

    #[selector(name = "RATE_WEEK6")]
    pub fn rate_week6(&self) -> U256 {
        self.rates().rate(Stage::Week6)
    }
}

fn stage_key(stage: Stage) -> U256 {
    U256::from(stage.code())
}

impl StagePool for StagedTokenSale {
    fn cap(&self, stage: Stage) -> U256 {
        self.stage_cap.get(stage_key(stage))
    }

    fn sold(&self, stage: Stage) -> U256 {
        self.stage_sold.get(stage_key(stage))
    }

    fn set_sold(&mut self, stage: Stage, sold: U256) {
        self.stage_sold.setter(stage_key(stage)).set(sold);
    }
}

impl Whitelist for StagedTokenSale {
    fn whitelisted(&self, account: Address) -> bool {
        self.whitelist.get(account)
    }

    fn set_whitelisted(&mut self, account: Address) {
        self.whitelist.setter(account).set(true);
    }
}

impl PresaleLedger for StagedTokenSale {
    fn allowance(&self, buyer: Address) -> U256 {
        self.presale_allowance.get(buyer)
    }

    fn set_allowance(&mut self, buyer: Address, allowance: U256) {
        self.presale_allowance.setter(buyer).set(allowance);
    }
}

impl RefundVault for StagedTokenSale {
    fn vault_state(&self) -> VaultState {
        VaultState::from_code(self.vault_state.get().saturating_to::<u8>())
    }

    fn set_vault_state(&mut self, state: VaultState) {
        self.vault_state.set(U256::from(state.code()));
    }

    fn deposited(&self, buyer: Address) -> U256 {
        self.deposits.get(buyer)
    }

    fn set_deposited(&mut self, buyer: Address, amount: U256) {
        self.deposits.setter(buyer).set(amount);
    }

    fn raised(&self) -> U256 {
        self.raised.get()
    }

    fn set_raised(&mut self, raised: U256) {
        self.raised.set(raised);
    }
}

impl Host for StagedTokenSale {
    fn asset_balance(&mut self) -> Result<U256, Errors> {
        IERC20::new(self.token.get())
            .balance_of(self, contract::address())
            .map_err(|_| Errors::AssetTransferFailed(AssetTransferFailed {}))
    }

    fn transfer_asset(&mut self, to: Address, amount: U256) -> Result<(), Errors> {
        match IERC20::new(self.token.get()).transfer(self, to, amount) {
            Ok(true) => Ok(()),
            _ => Err(Errors::AssetTransferFailed(AssetTransferFailed {})),
        }
    }

    // The value arrived with the call and a failed call reverts it
    fn accept_payment(&mut self, _from: Address, _amount: U256) -> Result<(), Errors> {
        Ok(())
    }

    fn return_payment(&mut self, _to: Address, _amount: U256) -> Result<(), Errors> {
        Ok(())
    }

    fn send_payment(&mut self, to: Address, amount: U256) -> Result<(), Errors> {
        call::transfer_eth(to, amount)
            .map_err(|_| Errors::PaymentTransferFailed(PaymentTransferFailed {}))
    }

    fn emit<E: SolEvent>(&mut self, event: E) {
        evm::log(event);
    }
}

impl SaleStore for StagedTokenSale {
    fn config(&self) -> Result<SaleConfig, Errors> {
        if !self.initialized.get() {
            return Err(Errors::NotInitialized(NotInitialized {}));
        }

        Ok(SaleConfig {
            admin: self.admin.get(),
            start_time: self.start_time.get().saturating_to::<u64>(),
            beneficiary: self.beneficiary.get(),
            asset: self.token.get(),
            funding_goal: self.funding_goal.get(),
        })
    }

    fn entered(&self) -> bool {
        self.entered.get()
    }

    fn set_entered(&mut self, entered: bool) {
        self.entered.set(entered);
    }
}
