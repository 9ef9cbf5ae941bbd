//! Checked integer helpers for share and fee arithmetic.
//!
//! All asset amounts and share counts are `u128`, so an 18-decimal asset
//! has room for supplies far beyond any real token. Products are formed in
//! a 256-bit intermediate so that `amount * total_shares` cannot overflow
//! before the division; the quotient is then checked back into `u128`.
//! Rounding is always toward zero, which favors the vault over the caller.

use crate::config::MAX_BPS;
use crate::error::VaultError;

#[allow(clippy::assign_op_pattern, clippy::ptr_offset_with_cast, clippy::manual_div_ceil)]
mod wide {
    uint::construct_uint! {
        /// 256-bit unsigned integer for `mul_div` intermediates.
        pub struct U256(4);
    }
}

use wide::U256;

/// Computes `value * numerator / denominator`, truncating.
///
/// # Errors
///
/// [`VaultError::ArithmeticOverflow`] if `denominator` is zero or the
/// quotient does not fit in a `u128`.
pub fn mul_div(value: u128, numerator: u128, denominator: u128) -> Result<u128, VaultError> {
    if denominator == 0 {
        return Err(VaultError::ArithmeticOverflow);
    }
    if let Some(product) = value.checked_mul(numerator) {
        return Ok(product / denominator);
    }
    let quotient = U256::from(value) * U256::from(numerator) / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(VaultError::ArithmeticOverflow);
    }
    Ok(quotient.as_u128())
}

/// Computes `value * numerator / denominator`, rounding up.
///
/// # Errors
///
/// Same as [`mul_div`].
pub fn mul_div_up(value: u128, numerator: u128, denominator: u128) -> Result<u128, VaultError> {
    if denominator == 0 {
        return Err(VaultError::ArithmeticOverflow);
    }
    let product = U256::from(value) * U256::from(numerator);
    let divisor = U256::from(denominator);
    let mut quotient = product / divisor;
    if !(product % divisor).is_zero() {
        quotient = quotient + U256::one();
    }
    if quotient > U256::from(u128::MAX) {
        return Err(VaultError::ArithmeticOverflow);
    }
    Ok(quotient.as_u128())
}

/// `amount * bps / 10_000`, truncating.
pub fn bps_of(amount: u128, bps: u64) -> Result<u128, VaultError> {
    mul_div(amount, u128::from(bps), u128::from(MAX_BPS))
}

/// `10^decimals` as a `u128`.
pub fn unit(decimals: u8) -> Result<u128, VaultError> {
    10u128
        .checked_pow(decimals as u32)
        .ok_or(VaultError::ArithmeticOverflow)
}

/// Checked addition mapped onto the vault error type.
pub fn add(a: u128, b: u128) -> Result<u128, VaultError> {
    a.checked_add(b).ok_or(VaultError::ArithmeticOverflow)
}

/// Checked subtraction mapped onto the vault error type.
pub fn sub(a: u128, b: u128) -> Result<u128, VaultError> {
    a.checked_sub(b).ok_or(VaultError::ArithmeticOverflow)
}
