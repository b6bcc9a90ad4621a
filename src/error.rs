//! Solidity errors returned by every sale operation.

use core::fmt;

use alloy_sol_types::{sol, SolError};
use stylus_sdk::prelude::*;

sol! {
    error NotInitialized();
    error AlreadyInitialized();
    error OnlyOwner();
    error ZeroValueArgumentInjected();
    error NotWhitelisted();
    error SaleClosed();
    error StageExhausted();
    error UnknownStage();
    error AssetTransferFailed();
    error PaymentTransferFailed();
    error TooEarly();
    error AlreadyFinalized();
    error NotFinalized();
    error RefundsNotAvailable();
    error ReentrantCall();
}

/// Exporting Solidity errors defined in sol! as Rust enums
#[derive(SolidityError, thiserror::Error)]
pub enum Errors {
    #[error("NotInitialized()")]
    NotInitialized(NotInitialized),
    #[error("AlreadyInitialized()")]
    AlreadyInitialized(AlreadyInitialized),
    #[error("OnlyOwner()")]
    OnlyOwner(OnlyOwner),
    #[error("ZeroValueArgumentInjected()")]
    ZeroValueArgumentInjected(ZeroValueArgumentInjected),
    #[error("NotWhitelisted()")]
    NotWhitelisted(NotWhitelisted),
    #[error("SaleClosed()")]
    SaleClosed(SaleClosed),
    #[error("StageExhausted()")]
    StageExhausted(StageExhausted),
    #[error("UnknownStage()")]
    UnknownStage(UnknownStage),
    #[error("AssetTransferFailed()")]
    AssetTransferFailed(AssetTransferFailed),
    #[error("PaymentTransferFailed()")]
    PaymentTransferFailed(PaymentTransferFailed),
    #[error("TooEarly()")]
    TooEarly(TooEarly),
    #[error("AlreadyFinalized()")]
    AlreadyFinalized(AlreadyFinalized),
    #[error("NotFinalized()")]
    NotFinalized(NotFinalized),
    #[error("RefundsNotAvailable()")]
    RefundsNotAvailable(RefundsNotAvailable),
    #[error("ReentrantCall()")]
    ReentrantCall(ReentrantCall),
}

impl Errors {
    /// Solidity signature of the error, e.g. `StageExhausted()`
    pub fn signature(&self) -> &'static str {
        match self {
            Errors::NotInitialized(_) => NotInitialized::SIGNATURE,
            Errors::AlreadyInitialized(_) => AlreadyInitialized::SIGNATURE,
            Errors::OnlyOwner(_) => OnlyOwner::SIGNATURE,
            Errors::ZeroValueArgumentInjected(_) => ZeroValueArgumentInjected::SIGNATURE,
            Errors::NotWhitelisted(_) => NotWhitelisted::SIGNATURE,
            Errors::SaleClosed(_) => SaleClosed::SIGNATURE,
            Errors::StageExhausted(_) => StageExhausted::SIGNATURE,
            Errors::UnknownStage(_) => UnknownStage::SIGNATURE,
            Errors::AssetTransferFailed(_) => AssetTransferFailed::SIGNATURE,
            Errors::PaymentTransferFailed(_) => PaymentTransferFailed::SIGNATURE,
            Errors::TooEarly(_) => TooEarly::SIGNATURE,
            Errors::AlreadyFinalized(_) => AlreadyFinalized::SIGNATURE,
            Errors::NotFinalized(_) => NotFinalized::SIGNATURE,
            Errors::RefundsNotAvailable(_) => RefundsNotAvailable::SIGNATURE,
            Errors::ReentrantCall(_) => ReentrantCall::SIGNATURE,
        }
    }
}

impl fmt::Debug for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature())
    }
}
