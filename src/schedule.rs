//! Calendar of the sale: which stage is current at a given timestamp and what
//! each stage pays out per unit of base currency.

use alloy_primitives::U256;

use crate::error::{Errors, UnknownStage, ZeroValueArgumentInjected};

/// One day defined in seconds
pub const DAY: u64 = 86_400;

/// Length of every selling week after the presale
pub const WEEK: u64 = 7 * DAY;

/// Number of selling weeks following the presale
pub const SALE_WEEKS: u64 = 6;

/// Asset units bought per base-currency unit while in presale
pub const RATE_PRESALE: u64 = 1_000;
pub const RATE_WEEK1: u64 = 900;
pub const RATE_WEEK2: u64 = 850;
pub const RATE_WEEK3: u64 = 800;
pub const RATE_WEEK4: u64 = 750;
pub const RATE_WEEK5: u64 = 700;
pub const RATE_WEEK6: u64 = 650;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    Presale = 0,
    Week1 = 1,
    Week2 = 2,
    Week3 = 3,
    Week4 = 4,
    Week5 = 5,
    Week6 = 6,
    Closed = 7,
}

impl Stage {
    /// Every stage that owns a pool and a rate, in calendar order
    pub const SELLING: [Stage; 7] = [
        Stage::Presale,
        Stage::Week1,
        Stage::Week2,
        Stage::Week3,
        Stage::Week4,
        Stage::Week5,
        Stage::Week6,
    ];

    /// Resolve the stage for `now`.
    ///
    /// The last second of a window still belongs to it: `start_time` itself is
    /// presale, `start_time + WEEK` is the last second of week 1, and anything
    /// after `start_time + 6 * WEEK` is closed.
    pub fn at(now: u64, start_time: u64) -> Stage {
        if now <= start_time {
            return Stage::Presale;
        }

        let week = (now - start_time - 1) / WEEK + 1;
        if week > SALE_WEEKS {
            return Stage::Closed;
        }

        Stage::SELLING[week as usize]
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a stage received over the ABI boundary
    pub fn from_code(code: u8) -> Result<Stage, Errors> {
        match code {
            7 => Ok(Stage::Closed),
            code => Stage::SELLING
                .get(code as usize)
                .copied()
                .ok_or(Errors::UnknownStage(UnknownStage {})),
        }
    }

    /// Index into per-stage tables, `None` for `Closed`
    pub fn slot(self) -> Option<usize> {
        match self {
            Stage::Closed => None,
            stage => Some(stage as usize),
        }
    }

    pub fn is_open(self) -> bool {
        self != Stage::Closed
    }
}

/// Timestamp of the last second in which purchases are accepted
pub fn sale_end(start_time: u64) -> u64 {
    start_time.saturating_add(WEEK * SALE_WEEKS)
}

/// Fixed price per stage, strictly non-increasing from presale to week 6
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateTable {
    rates: [U256; 7],
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            rates: [
                RATE_PRESALE,
                RATE_WEEK1,
                RATE_WEEK2,
                RATE_WEEK3,
                RATE_WEEK4,
                RATE_WEEK5,
                RATE_WEEK6,
            ]
            .map(U256::from),
        }
    }
}

impl RateTable {
    /// Build a custom table; every rate must be positive and no stage may be
    /// cheaper than a later one
    pub fn new(rates: [u64; 7]) -> Result<Self, Errors> {
        let positive = rates.iter().all(|rate| *rate > 0);
        let non_increasing = rates.windows(2).all(|pair| pair[0] >= pair[1]);
        if !positive || !non_increasing {
            return Err(Errors::ZeroValueArgumentInjected(ZeroValueArgumentInjected {}));
        }

        Ok(Self {
            rates: rates.map(U256::from),
        })
    }

    /// Rate of `stage`, zero when closed (no purchase possible)
    pub fn rate(&self, stage: Stage) -> U256 {
        stage.slot().map_or(U256::ZERO, |slot| self.rates[slot])
    }

    pub fn presale(&self) -> U256 {
        self.rates[0]
    }

    /// Rate applying at `now` for a sale opening at `start_time`
    pub fn rate_at(&self, now: u64, start_time: u64) -> U256 {
        self.rate(Stage::at(now, start_time))
    }
}

/// Asset units bought by `payment` at `rate`
pub fn tokens_for(payment: U256, rate: U256) -> U256 {
    payment.saturating_mul(rate)
}
