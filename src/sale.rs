//! The sale engine: whitelist and presale administration, purchases priced by
//! stage, one-shot finalization and refunds.
//!
//! Every operation validates first, then settles its own ledgers, and only then
//! moves assets or base currency through the [`Host`]. If a transfer fails the
//! ledgers are put back the way they were, so a failed call leaves no trace.

use alloy_primitives::{Address, U256};

use crate::config::SaleConfig;
use crate::error::{
    AlreadyFinalized, AssetTransferFailed, Errors, OnlyOwner, ReentrantCall, SaleClosed, TooEarly,
    ZeroValueArgumentInjected,
};
use crate::events::{Finalized, PresaleCommitted, Refunded, TokensGiven, TokensPurchased, Whitelisted};
use crate::host::Host;
use crate::pool::StagePool;
use crate::presale::PresaleLedger;
use crate::schedule::{tokens_for, RateTable, Stage};
use crate::vault::{RefundVault, VaultState};
use crate::whitelist::Whitelist;

/// Storage backing a sale: every component ledger plus the host it runs on
pub trait SaleStore: StagePool + Whitelist + PresaleLedger + RefundVault + Host {
    /// Configuration the sale was initialized with
    fn config(&self) -> Result<SaleConfig, Errors>;

    /// Busy flag held while an operation that moves funds is running
    fn entered(&self) -> bool;

    fn set_entered(&mut self, entered: bool);

    fn rates(&self) -> RateTable {
        RateTable::default()
    }

    fn current_stage(&self, now: u64) -> Result<Stage, Errors> {
        Ok(Stage::at(now, self.config()?.start_time))
    }

    /// Rate applying at `now`, zero once the sale is closed
    fn current_rate(&self, now: u64) -> Result<U256, Errors> {
        Ok(self.rates().rate(self.current_stage(now)?))
    }
}

/// Operations of a sale, run against a borrowed store
pub struct Sale<'a, S> {
    store: &'a mut S,
}

impl<'a, S: SaleStore> Sale<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Approve `account` for purchases, returning whether it was newly added
    pub fn add_to_whitelist(&mut self, caller: Address, account: Address) -> Result<bool, Errors> {
        only_admin(self.store, caller)?;
        validate_address(account)?;

        let added = self.store.approve(account);
        if added {
            self.store.emit(Whitelisted { account });
        }
        Ok(added)
    }

    /// Record a presale commitment, returning the buyer's new allowance
    pub fn add_to_presale(
        &mut self,
        caller: Address,
        buyer: Address,
        amount: U256,
    ) -> Result<U256, Errors> {
        only_admin(self.store, caller)?;
        validate_address(buyer)?;
        validate_amount(amount)?;

        let allowance = self.store.commit(buyer, amount);
        self.store.emit(PresaleCommitted {
            buyer,
            amount,
            allowance,
        });
        Ok(allowance)
    }

    /// Buy with `payment` base-currency units at `now`, returning the asset
    /// units received
    pub fn purchase(&mut self, buyer: Address, payment: U256, now: u64) -> Result<U256, Errors> {
        self.non_reentrant(|store| purchase(store, buyer, payment, now))
    }

    /// Hand out the tokens `equivalent` base currency would buy at the current
    /// rate, without whitelist, payment or presale accounting
    pub fn give_tokens(
        &mut self,
        caller: Address,
        buyer: Address,
        equivalent: U256,
        now: u64,
    ) -> Result<U256, Errors> {
        self.non_reentrant(|store| give_tokens(store, caller, buyer, equivalent, now))
    }

    /// Close the vault once the sale is over, returning whether the goal was met
    pub fn finalize(&mut self, caller: Address, now: u64) -> Result<bool, Errors> {
        self.non_reentrant(|store| finalize(store, caller, now))
    }

    /// Pay `buyer` back everything they deposited, zero if already refunded
    pub fn claim_refund(&mut self, buyer: Address) -> Result<U256, Errors> {
        self.non_reentrant(|store| claim_refund(store, buyer))
    }

    fn non_reentrant<T>(
        &mut self,
        operation: impl FnOnce(&mut S) -> Result<T, Errors>,
    ) -> Result<T, Errors> {
        if self.store.entered() {
            return Err(Errors::ReentrantCall(ReentrantCall {}));
        }

        self.store.set_entered(true);
        let result = operation(&mut *self.store);
        self.store.set_entered(false);
        result
    }
}

/// Ledger values a purchase may touch, kept to undo it
struct Snapshot {
    buyer: Address,
    stage: Stage,
    sold: U256,
    allowance: U256,
    deposited: U256,
    raised: U256,
}

impl Snapshot {
    fn take<S: SaleStore>(store: &S, buyer: Address, stage: Stage) -> Self {
        Self {
            buyer,
            stage,
            sold: store.sold(stage),
            allowance: store.allowance(buyer),
            deposited: store.deposited(buyer),
            raised: store.raised(),
        }
    }

    fn restore<S: SaleStore>(self, store: &mut S) {
        store.set_sold(self.stage, self.sold);
        store.set_allowance(self.buyer, self.allowance);
        store.set_deposited(self.buyer, self.deposited);
        store.set_raised(self.raised);
    }
}

fn purchase<S: SaleStore>(
    store: &mut S,
    buyer: Address,
    payment: U256,
    now: u64,
) -> Result<U256, Errors> {
    let config = store.config()?;
    store.ensure_whitelisted(buyer)?;
    let stage = open_stage(&config, now)?;
    validate_amount(payment)?;
    if store.vault_state() != VaultState::Active {
        return Err(Errors::SaleClosed(SaleClosed {}));
    }

    let rates = store.rates();
    let (current_rate, presale_rate) = (rates.rate(stage), rates.presale());
    let split = store.quote(buyer, payment, stage, current_rate, presale_rate);
    store.ensure_room(stage, split.tokens)?;
    ensure_holdings(store, split.tokens)?;

    store.accept_payment(buyer, payment)?;

    let snapshot = Snapshot::take(store, buyer, stage);
    let settled = store
        .debit(stage, split.tokens)
        .and_then(|()| store.deposit(buyer, payment))
        .and_then(|()| {
            store.consume(buyer, payment, stage, current_rate, presale_rate);
            store.transfer_asset(buyer, split.tokens)
        });
    if let Err(err) = settled {
        snapshot.restore(store);
        store.return_payment(buyer, payment)?;
        return Err(err);
    }

    store.emit(TokensPurchased {
        buyer,
        value: payment,
        amount: split.tokens,
        stage: stage.code(),
    });
    Ok(split.tokens)
}

fn give_tokens<S: SaleStore>(
    store: &mut S,
    caller: Address,
    buyer: Address,
    equivalent: U256,
    now: u64,
) -> Result<U256, Errors> {
    let config = only_admin(store, caller)?;
    validate_address(buyer)?;
    let stage = open_stage(&config, now)?;
    validate_amount(equivalent)?;
    if store.vault_state() != VaultState::Active {
        return Err(Errors::SaleClosed(SaleClosed {}));
    }

    let tokens = tokens_for(equivalent, store.rates().rate(stage));
    store.ensure_room(stage, tokens)?;
    ensure_holdings(store, tokens)?;

    let sold = store.sold(stage);
    let settled = store
        .debit(stage, tokens)
        .and_then(|()| store.transfer_asset(buyer, tokens));
    if let Err(err) = settled {
        store.set_sold(stage, sold);
        return Err(err);
    }

    store.emit(TokensGiven {
        buyer,
        value: equivalent,
        amount: tokens,
        stage: stage.code(),
    });
    Ok(tokens)
}

fn finalize<S: SaleStore>(store: &mut S, caller: Address, now: u64) -> Result<bool, Errors> {
    let config = only_admin(store, caller)?;
    if store.vault_state() != VaultState::Active {
        return Err(Errors::AlreadyFinalized(AlreadyFinalized {}));
    }

    if !config.has_closed(now) {
        return Err(Errors::TooEarly(TooEarly {}));
    }

    let raised = store.raised();
    let goal_reached = store.close(config.funding_goal)?;
    if goal_reached {
        if let Err(err) = store.send_payment(config.beneficiary, raised) {
            store.set_vault_state(VaultState::Active);
            return Err(err);
        }
    }

    store.emit(Finalized {
        goal_reached,
        raised,
    });
    Ok(goal_reached)
}

fn claim_refund<S: SaleStore>(store: &mut S, buyer: Address) -> Result<U256, Errors> {
    store.config()?;
    let amount = store.take_refund(buyer)?;
    if amount.is_zero() {
        return Ok(amount);
    }

    if let Err(err) = store.send_payment(buyer, amount) {
        store.set_deposited(buyer, amount);
        return Err(err);
    }

    store.emit(Refunded { buyer, amount });
    Ok(amount)
}

/// Function ensuring the caller is the configured administrator
fn only_admin<S: SaleStore>(store: &S, caller: Address) -> Result<SaleConfig, Errors> {
    let config = store.config()?;
    if caller != config.admin {
        return Err(Errors::OnlyOwner(OnlyOwner {}));
    }

    Ok(config)
}

/// Stage selling at `now`, failing once the last week is over
fn open_stage(config: &SaleConfig, now: u64) -> Result<Stage, Errors> {
    let stage = Stage::at(now, config.start_time);
    if !stage.is_open() {
        return Err(Errors::SaleClosed(SaleClosed {}));
    }

    Ok(stage)
}

/// The pools are sized from the provisioned supply, so the sale running short
/// of the asset means it was provisioned wrong
fn ensure_holdings<S: SaleStore>(store: &mut S, amount: U256) -> Result<(), Errors> {
    if store.asset_balance()? < amount {
        return Err(Errors::AssetTransferFailed(AssetTransferFailed {}));
    }

    Ok(())
}

fn validate_address(account: Address) -> Result<(), Errors> {
    if account == Address::ZERO {
        return Err(Errors::ZeroValueArgumentInjected(ZeroValueArgumentInjected {}));
    }

    Ok(())
}

fn validate_amount(amount: U256) -> Result<(), Errors> {
    if amount.is_zero() {
        return Err(Errors::ZeroValueArgumentInjected(ZeroValueArgumentInjected {}));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryAsset, MemoryLedger};
    use crate::schedule::WEEK;
    use alloy_primitives::address;

    const ADMIN: Address = address!("00000000000000000000000000000000000000ad");
    const FUND: Address = address!("00000000000000000000000000000000000000f0");
    const TOKEN: Address = address!("000000000000000000000000000000000000a55e");
    const SALE: Address = address!("0000000000000000000000000000000000005a1e");
    const BUYER: Address = address!("00000000000000000000000000000000000000b1");
    const START: u64 = 1_529_308_800;

    fn config() -> SaleConfig {
        SaleConfig {
            admin: ADMIN,
            start_time: START,
            beneficiary: FUND,
            asset: TOKEN,
            funding_goal: U256::from(500),
        }
    }

    /// Sale holding `held` tokens while its pools were sized for `provisioned`
    fn ledger(provisioned: u64, held: u64) -> MemoryLedger {
        let mut ledger = MemoryLedger::new(SALE, MemoryAsset::mint(SALE, U256::from(held)));
        ledger.init(config(), U256::from(provisioned)).unwrap();
        ledger.fund(BUYER, U256::from(1_000));
        ledger
    }

    #[test]
    fn nothing_works_before_init() {
        let mut ledger = MemoryLedger::new(SALE, MemoryAsset::default());
        let err = ledger.sale().add_to_whitelist(ADMIN, BUYER).unwrap_err();
        assert!(matches!(err, Errors::NotInitialized(_)));
        let err = ledger.sale().purchase(BUYER, U256::from(1), START).unwrap_err();
        assert!(matches!(err, Errors::NotInitialized(_)));
        assert!(ledger.current_stage(START).is_err());
    }

    #[test]
    fn init_is_one_shot() {
        let mut ledger = ledger(1_000_000, 1_000_000);
        let err = ledger.init(config(), U256::from(1)).unwrap_err();
        assert!(matches!(err, Errors::AlreadyInitialized(_)));
    }

    #[test]
    fn admin_operations_reject_other_callers() {
        let mut ledger = ledger(1_000_000, 1_000_000);
        let mut sale = ledger.sale();
        assert!(matches!(sale.add_to_whitelist(BUYER, BUYER), Err(Errors::OnlyOwner(_))));
        assert!(matches!(
            sale.add_to_presale(BUYER, BUYER, U256::from(1)),
            Err(Errors::OnlyOwner(_))
        ));
        assert!(matches!(
            sale.give_tokens(BUYER, BUYER, U256::from(1), START),
            Err(Errors::OnlyOwner(_))
        ));
        assert!(matches!(sale.finalize(BUYER, START + 7 * WEEK), Err(Errors::OnlyOwner(_))));
        assert!(!ledger.entered());
    }

    #[test]
    fn zero_arguments_are_rejected() {
        let mut ledger = ledger(1_000_000, 1_000_000);
        let mut sale = ledger.sale();
        assert!(sale.add_to_whitelist(ADMIN, Address::ZERO).is_err());
        assert!(sale.add_to_presale(ADMIN, BUYER, U256::ZERO).is_err());
        sale.add_to_whitelist(ADMIN, BUYER).unwrap();
        let err = sale.purchase(BUYER, U256::ZERO, START).unwrap_err();
        assert!(matches!(err, Errors::ZeroValueArgumentInjected(_)));
    }

    #[test]
    fn whitelist_is_checked_before_the_calendar() {
        let mut ledger = ledger(1_000_000, 1_000_000);
        let err = ledger.sale().purchase(BUYER, U256::from(1), START + 7 * WEEK).unwrap_err();
        assert!(matches!(err, Errors::NotWhitelisted(_)));

        ledger.sale().add_to_whitelist(ADMIN, BUYER).unwrap();
        let err = ledger.sale().purchase(BUYER, U256::from(1), START + 7 * WEEK).unwrap_err();
        assert!(matches!(err, Errors::SaleClosed(_)));
    }

    #[test]
    fn underprovisioned_sale_fails_without_side_effects() {
        // pools think there are a million tokens, the sale only holds 500
        let mut ledger = ledger(1_000_000, 500);
        ledger.sale().add_to_whitelist(ADMIN, BUYER).unwrap();

        let err = ledger.sale().purchase(BUYER, U256::from(1), START).unwrap_err();
        assert!(matches!(err, Errors::AssetTransferFailed(_)));
        assert_eq!(ledger.sold(Stage::Presale), U256::ZERO);
        assert_eq!(ledger.raised(), U256::ZERO);
        assert_eq!(ledger.wallet(BUYER), U256::from(1_000));
        assert_eq!(ledger.asset().balance_of(BUYER), U256::ZERO);

        let err = ledger
            .sale()
            .give_tokens(ADMIN, BUYER, U256::from(1), START)
            .unwrap_err();
        assert!(matches!(err, Errors::AssetTransferFailed(_)));
        assert_eq!(ledger.sold(Stage::Presale), U256::ZERO);
        assert!(!ledger.entered());
    }

    #[test]
    fn buyer_short_of_funds_pays_nothing() {
        let mut ledger = ledger(10_000_000, 10_000_000);
        ledger.sale().add_to_whitelist(ADMIN, BUYER).unwrap();
        let err = ledger.sale().purchase(BUYER, U256::from(1_001), START).unwrap_err();
        assert!(matches!(err, Errors::PaymentTransferFailed(_)));
        assert_eq!(ledger.sold(Stage::Presale), U256::ZERO);
        assert_eq!(ledger.deposited(BUYER), U256::ZERO);
    }

    #[test]
    fn failed_forward_keeps_vault_open() {
        fn refuse(_: &mut MemoryLedger, _: Address) -> Result<(), Errors> {
            Err(Errors::PaymentTransferFailed(crate::error::PaymentTransferFailed {}))
        }

        let mut ledger = ledger(10_000_000, 10_000_000);
        ledger.sale().add_to_whitelist(ADMIN, BUYER).unwrap();
        ledger.sale().purchase(BUYER, U256::from(500), START).unwrap();
        ledger.on_receive(FUND, refuse);

        let err = ledger.sale().finalize(ADMIN, START + 6 * WEEK + 1).unwrap_err();
        assert!(matches!(err, Errors::PaymentTransferFailed(_)));
        assert_eq!(ledger.vault_state(), VaultState::Active);
        assert_eq!(ledger.vault_balance(), U256::from(500));
        assert_eq!(ledger.wallet(FUND), U256::ZERO);
    }

    #[test]
    fn busy_flag_blocks_nested_calls() {
        let mut ledger = ledger(1_000_000, 1_000_000);
        ledger.sale().add_to_whitelist(ADMIN, BUYER).unwrap();
        ledger.set_entered(true);
        let err = ledger.sale().purchase(BUYER, U256::from(1), START).unwrap_err();
        assert!(matches!(err, Errors::ReentrantCall(_)));
        assert_eq!(ledger.sold(Stage::Presale), U256::ZERO);

        ledger.set_entered(false);
        assert_eq!(
            ledger.sale().purchase(BUYER, U256::from(1), START).unwrap(),
            U256::from(1_000)
        );
    }

    #[test]
    fn nothing_is_given_after_finalize() {
        let mut ledger = ledger(1_000_000, 1_000_000);
        assert!(!ledger.sale().finalize(ADMIN, START + 6 * WEEK + 1).unwrap());

        // clock reading from before the close
        let err = ledger
            .sale()
            .give_tokens(ADMIN, BUYER, U256::from(1), START)
            .unwrap_err();
        assert!(matches!(err, Errors::SaleClosed(_)));
        assert_eq!(ledger.sold(Stage::Presale), U256::ZERO);
        assert_eq!(ledger.asset().balance_of(BUYER), U256::ZERO);
    }

    #[test]
    fn queries_follow_the_calendar() {
        let ledger = ledger(1_000_000, 1_000_000);
        assert_eq!(ledger.current_stage(START).unwrap(), Stage::Presale);
        assert_eq!(ledger.current_stage(START + 2 * WEEK).unwrap(), Stage::Week2);
        assert_eq!(ledger.current_rate(START + 2 * WEEK).unwrap(), U256::from(850));
        assert_eq!(ledger.current_rate(START + 6 * WEEK + 1).unwrap(), U256::ZERO);
    }
}
