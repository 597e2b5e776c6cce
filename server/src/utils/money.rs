use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Major units (naira) to minor units (kobo). `None` on overflow.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::from(MINOR_UNITS_PER_MAJOR))
        .round()
        .to_i64()
}

pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
