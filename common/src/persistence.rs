//! A module with multiplicative persistence utilities.
//!
//! Persistence only depends on the multiset of digits, and the products shrink
//! quickly: any zero digit ends the chain on the following step, and numbers
//! above a few dozen digits virtually always contain one after a single step.

use crate::MulpersError;
use malachite::base::num::basic::traits::{One, Zero};
use malachite::base::num::conversion::traits::Digits;
use malachite::natural::Natural;
use std::str::FromStr;

const DECIMAL: u32 = 10;

/// Multiply all decimal digits of a number together.
#[must_use]
pub fn get_digit_product(n: &Natural) -> Natural {
    let mut product = Natural::ONE;
    for digit in n.to_digits_asc(&DECIMAL) {
        if digit == 0 {
            return Natural::ZERO;
        }
        product *= Natural::from(digit);
    }
    product
}

/// Calculate the multiplicative persistence of a number: how many times the
/// digits have to be multiplied together until a single digit is left.
#[must_use]
pub fn get_persistence(n: &Natural) -> u32 {
    // 🔥🔥🔥 HOT LOOP 🔥🔥🔥
    if *n < DECIMAL {
        return 0;
    }
    let mut current = get_digit_product(n);
    let mut steps = 1;
    while current >= DECIMAL {
        current = get_digit_product(&current);
        steps += 1;
    }
    steps
}

/// Calculate the persistence of a number written out in decimal.
///
/// # Errors
/// Returns `InvalidInput` if the string is empty or contains anything but the digits 0-9.
pub fn get_persistence_of_str(digits: &str) -> Result<u32, MulpersError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MulpersError::InvalidInput {
            argument: digits.to_owned(),
        });
    }
    let n = Natural::from_str(digits).map_err(|()| MulpersError::InvalidInput {
        argument: digits.to_owned(),
    })?;
    Ok(get_persistence(&n))
}
