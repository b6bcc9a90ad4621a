use alloy_primitives::Address;

use crate::error::{Errors, NotWhitelisted};

/// Approved buyers. Accounts are only ever added, never removed.
pub trait Whitelist {
    fn whitelisted(&self, account: Address) -> bool;

    fn set_whitelisted(&mut self, account: Address);

    /// Add `account`, returning whether it was newly approved
    fn approve(&mut self, account: Address) -> bool {
        if self.whitelisted(account) {
            return false;
        }

        self.set_whitelisted(account);
        true
    }

    fn ensure_whitelisted(&self, account: Address) -> Result<(), Errors> {
        if !self.whitelisted(account) {
            return Err(Errors::NotWhitelisted(NotWhitelisted {}));
        }

        Ok(())
    }
}
