//! Escrow for every payment collected by the sale. The vault is closed exactly
//! once: either the goal was met and the funds go to the beneficiary, or it
//! was missed and each contributor may take back what they deposited.

use alloy_primitives::{Address, U256};

use crate::error::{AlreadyFinalized, Errors, NotFinalized, RefundsNotAvailable, SaleClosed};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VaultState {
    #[default]
    Active,
    Closed { goal_reached: bool },
}

impl VaultState {
    /// Storage encoding: 0 active, 1 closed with refunds, 2 closed and forwarded
    pub fn code(self) -> u8 {
        match self {
            VaultState::Active => 0,
            VaultState::Closed { goal_reached: false } => 1,
            VaultState::Closed { goal_reached: true } => 2,
        }
    }

    pub fn from_code(code: u8) -> VaultState {
        match code {
            0 => VaultState::Active,
            1 => VaultState::Closed { goal_reached: false },
            _ => VaultState::Closed { goal_reached: true },
        }
    }

    pub fn refunding(self) -> bool {
        self == VaultState::Closed { goal_reached: false }
    }
}

pub trait RefundVault {
    fn vault_state(&self) -> VaultState;

    fn set_vault_state(&mut self, state: VaultState);

    /// Base currency deposited by `buyer` and not yet refunded
    fn deposited(&self, buyer: Address) -> U256;

    fn set_deposited(&mut self, buyer: Address, amount: U256);

    /// Running total of everything deposited, untouched by refunds
    fn raised(&self) -> U256;

    fn set_raised(&mut self, raised: U256);

    fn deposit(&mut self, buyer: Address, amount: U256) -> Result<(), Errors> {
        if self.vault_state() != VaultState::Active {
            return Err(Errors::SaleClosed(SaleClosed {}));
        }

        let deposited = self.deposited(buyer).saturating_add(amount);
        self.set_deposited(buyer, deposited);
        let raised = self.raised().saturating_add(amount);
        self.set_raised(raised);
        Ok(())
    }

    /// Move to the terminal state, returning whether the goal was reached
    fn close(&mut self, funding_goal: U256) -> Result<bool, Errors> {
        if self.vault_state() != VaultState::Active {
            return Err(Errors::AlreadyFinalized(AlreadyFinalized {}));
        }

        let goal_reached = self.raised() >= funding_goal;
        self.set_vault_state(VaultState::Closed { goal_reached });
        Ok(goal_reached)
    }

    /// Zero the deposit of `buyer` and return what must be paid back
    fn take_refund(&mut self, buyer: Address) -> Result<U256, Errors> {
        if !self.vault_state().refunding() {
            return Err(Errors::RefundsNotAvailable(RefundsNotAvailable {}));
        }

        let amount = self.deposited(buyer);
        if !amount.is_zero() {
            self.set_deposited(buyer, U256::ZERO);
        }
        Ok(amount)
    }

    fn goal_reached(&self) -> Result<bool, Errors> {
        match self.vault_state() {
            VaultState::Active => Err(Errors::NotFinalized(NotFinalized {})),
            VaultState::Closed { goal_reached } => Ok(goal_reached),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloy_primitives::address;

    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const BOB: Address = address!("00000000000000000000000000000000000000b0");

    #[derive(Default)]
    struct Escrow {
        state: VaultState,
        deposits: BTreeMap<Address, U256>,
        raised: U256,
    }

    impl RefundVault for Escrow {
        fn vault_state(&self) -> VaultState {
            self.state
        }

        fn set_vault_state(&mut self, state: VaultState) {
            self.state = state;
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

    #[test]
    fn deposits_accumulate_per_buyer() {
        let mut vault = Escrow::default();
        vault.deposit(ALICE, U256::from(50)).unwrap();
        vault.deposit(ALICE, U256::from(25)).unwrap();
        vault.deposit(BOB, U256::from(10)).unwrap();
        assert_eq!(vault.deposited(ALICE), U256::from(75));
        assert_eq!(vault.raised(), U256::from(85));
        assert!(matches!(vault.goal_reached(), Err(Errors::NotFinalized(_))));
    }

    #[test]
    fn close_is_one_shot() {
        let mut vault = Escrow::default();
        vault.deposit(ALICE, U256::from(500)).unwrap();
        assert!(vault.close(U256::from(500)).unwrap());
        assert_eq!(vault.vault_state(), VaultState::Closed { goal_reached: true });

        let err = vault.close(U256::from(1)).unwrap_err();
        assert!(matches!(err, Errors::AlreadyFinalized(_)));
        assert_eq!(vault.vault_state(), VaultState::Closed { goal_reached: true });

        let err = vault.deposit(BOB, U256::from(1)).unwrap_err();
        assert!(matches!(err, Errors::SaleClosed(_)));
    }

    #[test]
    fn refunds_only_after_missed_goal() {
        let mut vault = Escrow::default();
        vault.deposit(ALICE, U256::from(50)).unwrap();
        assert!(matches!(vault.take_refund(ALICE), Err(Errors::RefundsNotAvailable(_))));

        assert!(!vault.close(U256::from(500)).unwrap());
        assert_eq!(vault.take_refund(ALICE).unwrap(), U256::from(50));
        assert_eq!(vault.take_refund(ALICE).unwrap(), U256::ZERO);
        assert_eq!(vault.take_refund(BOB).unwrap(), U256::ZERO);
        assert_eq!(vault.raised(), U256::from(50));
    }

    #[test]
    fn reached_goal_never_refunds() {
        let mut vault = Escrow::default();
        vault.deposit(ALICE, U256::from(600)).unwrap();
        vault.close(U256::from(500)).unwrap();
        assert!(matches!(vault.take_refund(ALICE), Err(Errors::RefundsNotAvailable(_))));
    }

    #[test]
    fn state_codes_round_trip() {
        for state in [
            VaultState::Active,
            VaultState::Closed { goal_reached: false },
            VaultState::Closed { goal_reached: true },
        ] {
            assert_eq!(VaultState::from_code(state.code()), state);
        }
    }
}
