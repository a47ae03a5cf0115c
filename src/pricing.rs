//! Freight quote
//!
//! `(distance * 5 + weight * 0.5 + volume * 2) * priority multiplier`,
//! rounded to cents.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Cargo, Priority};

/// Per-kilometre base rate
pub const RATE_PER_KM: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
/// Per-kilogram rate (0.5)
pub const RATE_PER_KG: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
/// Per-cubic-metre rate
pub const RATE_PER_M3: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

impl Priority {
    /// Price multiplier: 0.9 / 1.0 / 1.2 / 1.5
    pub fn price_multiplier(&self) -> Decimal {
        match self {
            Priority::Low => Decimal::new(9, 1),
            Priority::Medium => Decimal::ONE,
            Priority::High => Decimal::new(12, 1),
            Priority::Urgent => Decimal::new(15, 1),
        }
    }
}

/// Quote a shipment. Negative inputs are treated as zero.
pub fn quote(distance_km: Decimal, cargo: &Cargo, priority: Priority) -> Decimal {
    let distance = distance_km.max(Decimal::ZERO);
    let weight = cargo.weight.max(Decimal::ZERO);
    let volume = cargo.volume.max(Decimal::ZERO);

    let base = distance * RATE_PER_KM + weight * RATE_PER_KG + volume * RATE_PER_M3;
    let mut total = (base * priority.price_multiplier())
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    total.rescale(2);
    total
}
