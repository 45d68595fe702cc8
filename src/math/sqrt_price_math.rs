// src/math/sqrt_price_math.rs
// Количество токенов между двумя ценами и цена после изменения резервов.
// Все цены в формате Q64.64.

use super::big_num::U256;
use super::{MAX_SQRT_PRICE, MIN_SQRT_PRICE};
use crate::error::{ArithmeticError, Result};

fn ordered(sqrt_price_1: u128, sqrt_price_2: u128) -> (u128, u128) {
    if sqrt_price_1 > sqrt_price_2 {
        (sqrt_price_2, sqrt_price_1)
    } else {
        (sqrt_price_1, sqrt_price_2)
    }
}

fn check_bounds(sqrt_price: U256) -> Result<u128> {
    let sqrt_price = sqrt_price.try_into_u128()?;
    if !(MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&sqrt_price) {
        return Err(ArithmeticError::SqrtPriceOutOfBounds(sqrt_price).into());
    }
    Ok(sqrt_price)
}

// Δa = L·2^64·(√P_hi − √P_lo) / (√P_hi·√P_lo)
pub(crate) fn amount_delta_a(
    sqrt_price_1: u128,
    sqrt_price_2: u128,
    liquidity: u128,
    round_up: bool,
) -> Result<U256> {
    let (lower, upper) = ordered(sqrt_price_1, sqrt_price_2);
    if lower == 0 {
        return Err(ArithmeticError::InvalidPriceBounds { lower, upper }.into());
    }

    let numerator = U256::from(liquidity)
        .checked_mul(U256::q64())
        .and_then(|n| n.checked_mul(U256::from(upper - lower)))
        .ok_or(ArithmeticError::ArithmeticOverflow)?;
    let denominator = U256::from(lower) * U256::from(upper);

    let (quotient, remainder) = numerator.div_mod(denominator);
    if round_up && !remainder.is_zero() {
        Ok(quotient + U256::one())
    } else {
        Ok(quotient)
    }
}

// Δb = L·(√P_hi − √P_lo) / 2^64
pub(crate) fn amount_delta_b(
    sqrt_price_1: u128,
    sqrt_price_2: u128,
    liquidity: u128,
    round_up: bool,
) -> Result<U256> {
    let (lower, upper) = ordered(sqrt_price_1, sqrt_price_2);
    let product = U256::from(liquidity)
        .checked_mul(U256::from(upper - lower))
        .ok_or(ArithmeticError::ArithmeticOverflow)?;

    let (quotient, remainder) = product.div_mod(U256::q64());
    if round_up && !remainder.is_zero() {
        Ok(quotient + U256::one())
    } else {
        Ok(quotient)
    }
}

/// Количество токена A, соответствующее ликвидности `liquidity`
/// в диапазоне цен. Границы сортируются.
pub fn token_amount_a_from_liquidity(
    sqrt_price_lower: u128,
    sqrt_price_upper: u128,
    liquidity: u128,
    round_up: bool,
) -> Result<u64> {
    amount_delta_a(sqrt_price_lower, sqrt_price_upper, liquidity, round_up)?.try_into_u64()
}

/// Количество токена B, соответствующее ликвидности `liquidity`
/// в диапазоне цен. Границы сортируются.
pub fn token_amount_b_from_liquidity(
    sqrt_price_lower: u128,
    sqrt_price_upper: u128,
    liquidity: u128,
    round_up: bool,
) -> Result<u64> {
    amount_delta_b(sqrt_price_lower, sqrt_price_upper, liquidity, round_up)?.try_into_u64()
}

/// √P' = L·√P / (L ± Δa·√P), всегда с округлением вверх.
///
/// При добавлении A цена падает, округление вверх не дает трейдеру
/// получить больше B. При изъятии A цена растет, округление вверх
/// гарантирует требуемый выход.
pub fn next_sqrt_price_from_a_round_up(
    sqrt_price: u128,
    liquidity: u128,
    amount: u64,
    add: bool,
) -> Result<u128> {
    if amount == 0 {
        return Ok(sqrt_price);
    }

    let product = U256::from(sqrt_price) * U256::from(amount);
    let numerator = U256::from(liquidity) * U256::q64();
    let denominator = if add {
        numerator.checked_add(product)
    } else {
        numerator.checked_sub(product)
    }
    .ok_or(ArithmeticError::ArithmeticOverflow)?;
    if denominator.is_zero() {
        return Err(ArithmeticError::DivisionByZero.into());
    }

    let (quotient, remainder) = numerator
        .checked_mul(U256::from(sqrt_price))
        .ok_or(ArithmeticError::ArithmeticOverflow)?
        .div_mod(denominator);
    let next = if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::one()
    };
    check_bounds(next)
}

/// √P' = √P ± Δb / L, всегда с округлением вниз.
pub fn next_sqrt_price_from_b_round_down(
    sqrt_price: u128,
    liquidity: u128,
    amount: u64,
    add: bool,
) -> Result<u128> {
    if amount == 0 {
        return Ok(sqrt_price);
    }
    if liquidity == 0 {
        return Err(ArithmeticError::DivisionByZero.into());
    }

    let amount_x64 = U256::from(amount) * U256::q64();
    let (quotient, remainder) = amount_x64.div_mod(U256::from(liquidity));
    let current = U256::from(sqrt_price);

    let next = if add {
        current.checked_add(quotient)
    } else {
        // при изъятии B округляем дельту вверх, чтобы цена ушла ниже
        let delta = if remainder.is_zero() {
            quotient
        } else {
            quotient + U256::one()
        };
        current.checked_sub(delta)
    }
    .ok_or(ArithmeticError::ArithmeticOverflow)?;
    check_bounds(next)
}

pub fn next_sqrt_price_from_input(
    sqrt_price: u128,
    liquidity: u128,
    amount_in: u64,
    a_to_b: bool,
) -> Result<u128> {
    if a_to_b {
        next_sqrt_price_from_a_round_up(sqrt_price, liquidity, amount_in, true)
    } else {
        next_sqrt_price_from_b_round_down(sqrt_price, liquidity, amount_in, true)
    }
}

pub fn next_sqrt_price_from_output(
    sqrt_price: u128,
    liquidity: u128,
    amount_out: u64,
    a_to_b: bool,
) -> Result<u128> {
    if a_to_b {
        next_sqrt_price_from_b_round_down(sqrt_price, liquidity, amount_out, false)
    } else {
        next_sqrt_price_from_a_round_up(sqrt_price, liquidity, amount_out, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const Q64: u128 = 1 << 64;

    #[test]
    fn token_amounts_over_doubling_price() {
        assert_eq!(token_amount_b_from_liquidity(Q64, 2 * Q64, 100, false).unwrap(), 100);
        assert_eq!(token_amount_a_from_liquidity(Q64, 2 * Q64, 100, false).unwrap(), 50);
        // порядок границ не важен
        assert_eq!(token_amount_a_from_liquidity(2 * Q64, Q64, 100, false).unwrap(), 50);
        assert_eq!(token_amount_b_from_liquidity(2 * Q64, Q64, 100, true).unwrap(), 100);
    }

    #[test]
    fn round_up_adds_one_on_remainder() {
        // 101·2^64 / 2^129 = 50.5
        assert_eq!(token_amount_a_from_liquidity(Q64, 2 * Q64, 101, false).unwrap(), 50);
        assert_eq!(token_amount_a_from_liquidity(Q64, 2 * Q64, 101, true).unwrap(), 51);
        // 3·(2^63) / 2^64 = 1.5
        assert_eq!(token_amount_b_from_liquidity(Q64, Q64 + Q64 / 2, 3, false).unwrap(), 1);
        assert_eq!(token_amount_b_from_liquidity(Q64, Q64 + Q64 / 2, 3, true).unwrap(), 2);
    }

    #[test]
    fn zero_lower_bound_is_rejected() {
        assert!(matches!(
            token_amount_a_from_liquidity(0, Q64, 100, false),
            Err(Error::Arithmetic(ArithmeticError::InvalidPriceBounds { .. }))
        ));
    }

    #[test]
    fn amount_overflowing_u64_fails() {
        assert!(matches!(
            token_amount_b_from_liquidity(MIN_SQRT_PRICE, MAX_SQRT_PRICE, u128::MAX >> 1, false),
            Err(Error::Arithmetic(ArithmeticError::ArithmeticOverflow))
        ));
    }

    #[test]
    fn input_moves_price_in_trade_direction() {
        let liquidity = 1_000_000_000_000u128;
        let down = next_sqrt_price_from_input(Q64, liquidity, 1_000_000, true).unwrap();
        let up = next_sqrt_price_from_input(Q64, liquidity, 1_000_000, false).unwrap();
        assert!(down < Q64);
        assert!(up > Q64);
        assert_eq!(next_sqrt_price_from_input(Q64, liquidity, 0, true).unwrap(), Q64);
    }

    #[test]
    fn output_moves_price_in_trade_direction() {
        let liquidity = 1_000_000_000_000u128;
        let down = next_sqrt_price_from_output(Q64, liquidity, 1_000_000, true).unwrap();
        let up = next_sqrt_price_from_output(Q64, liquidity, 1_000_000, false).unwrap();
        assert!(down < Q64);
        assert!(up > Q64);
    }

    #[test]
    fn draining_more_a_than_reserves_fails() {
        // при L = 1 и √P = 1 виртуальный резерв A равен 1
        assert!(next_sqrt_price_from_output(Q64, 1, 5, false).is_err());
    }

    #[test]
    fn b_price_rounds_down_on_input() {
        // Δb / L = 1 / 3 в Q64.64 → ⌊2^64 / 3⌋
        let next = next_sqrt_price_from_b_round_down(Q64, 3, 1, true).unwrap();
        assert_eq!(next, Q64 + Q64 / 3);
        let next = next_sqrt_price_from_b_round_down(Q64, 3, 1, false).unwrap();
        assert_eq!(next, Q64 - Q64 / 3 - 1);
    }
}
