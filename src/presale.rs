//! Commitments made before the sale opens. A buyer holding an allowance keeps
//! the presale rate for that many base-currency units even after week 1 starts;
//! a payment larger than the allowance is priced across both rates.

use alloy_primitives::{Address, U256};

use crate::schedule::{tokens_for, Stage};

/// How a single payment was priced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresaleSplit {
    /// Base-currency units priced at the presale rate
    pub presale_portion: U256,
    /// Base-currency units priced at the current rate
    pub current_portion: U256,
    /// Asset units bought by the whole payment
    pub tokens: U256,
}

pub trait PresaleLedger {
    /// Base-currency units still eligible for the presale rate
    fn allowance(&self, buyer: Address) -> U256;

    fn set_allowance(&mut self, buyer: Address, allowance: U256);

    /// Add a commitment on top of whatever the buyer already holds
    fn commit(&mut self, buyer: Address, amount: U256) -> U256 {
        let allowance = self.allowance(buyer).saturating_add(amount);
        self.set_allowance(buyer, allowance);
        allowance
    }

    /// Price `payment` without consuming anything
    fn quote(
        &self,
        buyer: Address,
        payment: U256,
        stage: Stage,
        current_rate: U256,
        presale_rate: U256,
    ) -> PresaleSplit {
        let allowance = self.allowance(buyer);
        // during presale the current rate already is the presale rate
        if allowance.is_zero() || stage == Stage::Presale {
            return PresaleSplit {
                presale_portion: U256::ZERO,
                current_portion: payment,
                tokens: tokens_for(payment, current_rate),
            };
        }

        let presale_portion = payment.min(allowance);
        let current_portion = payment - presale_portion;
        PresaleSplit {
            presale_portion,
            current_portion,
            tokens: tokens_for(presale_portion, presale_rate)
                .saturating_add(tokens_for(current_portion, current_rate)),
        }
    }

    /// Price `payment` and burn the presale portion from the allowance
    fn consume(
        &mut self,
        buyer: Address,
        payment: U256,
        stage: Stage,
        current_rate: U256,
        presale_rate: U256,
    ) -> PresaleSplit {
        let split = self.quote(buyer, payment, stage, current_rate, presale_rate);
        if !split.presale_portion.is_zero() {
            let allowance = self.allowance(buyer);
            self.set_allowance(buyer, allowance - split.presale_portion);
        }
        split
    }
}
