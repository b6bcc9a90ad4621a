//! Per-stage allocation pools. Each stage sells from its own pool only; a sold
//! out week never borrows from the next one.

use alloy_primitives::U256;

use crate::error::{Errors, SaleClosed, StageExhausted};
use crate::schedule::Stage;

/// Share of the provisioned supply allotted to each stage, in percent
pub const POOL_SHARES: [u64; 7] = [30, 20, 15, 10, 10, 8, 7];

/// Split the provisioned supply into stage caps. Integer division dust lands in
/// the last week so the caps always add up to `provisioned`.
pub fn split_caps(provisioned: U256) -> [U256; 7] {
    let hundred = U256::from(100);
    let mut caps = POOL_SHARES.map(|share| provisioned / hundred * U256::from(share));

    let allotted = caps.iter().fold(U256::ZERO, |sum, cap| sum + *cap);
    caps[6] += provisioned - allotted;
    caps
}

/// Remaining-allocation ledger, one exhaustible pool per selling stage
pub trait StagePool {
    /// Tokens initially allotted to `stage`, zero for `Closed`
    fn cap(&self, stage: Stage) -> U256;

    /// Tokens sold while `stage` was current
    fn sold(&self, stage: Stage) -> U256;

    fn set_sold(&mut self, stage: Stage, sold: U256);

    fn remaining(&self, stage: Stage) -> U256 {
        self.cap(stage).saturating_sub(self.sold(stage))
    }

    /// Check that `amount` fits in the pool of `stage` without touching it
    fn ensure_room(&self, stage: Stage, amount: U256) -> Result<(), Errors> {
        if !stage.is_open() {
            return Err(Errors::SaleClosed(SaleClosed {}));
        }

        if amount > self.remaining(stage) {
            return Err(Errors::StageExhausted(StageExhausted {}));
        }

        Ok(())
    }

    fn debit(&mut self, stage: Stage, amount: U256) -> Result<(), Errors> {
        self.ensure_room(stage, amount)?;
        let sold = self.sold(stage);
        self.set_sold(stage, sold + amount);
        Ok(())
    }

    /// Tokens sold across every stage
    fn tokens_sold(&self) -> U256 {
        Stage::SELLING
            .iter()
            .fold(U256::ZERO, |sum, stage| sum + self.sold(*stage))
    }
}
