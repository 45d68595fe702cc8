// src/math/full_math.rs

use super::big_num::U256;
use crate::error::{ArithmeticError, Result};

/// ⌊a·b / denominator⌋ с 256-битным промежуточным произведением.
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(ArithmeticError::DivisionByZero.into());
    }
    let product = U256::from(a) * U256::from(b);
    (product / U256::from(denominator)).try_into_u128()
}

/// ⌈a·b / denominator⌉. Нулевой знаменатель дает ноль, а не ошибку:
/// так ведет себя программа Whirlpool, вызывающий код проверяет сам.
pub fn mul_div_ceil(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Ok(0);
    }
    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let (quotient, remainder) = product.div_mod(denominator);
    let quotient = if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::one()
    };
    quotient.try_into_u128()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn rounds_in_opposite_directions() {
        assert_eq!(mul_div_floor(7, 3, 2).unwrap(), 10);
        assert_eq!(mul_div_ceil(7, 3, 2).unwrap(), 11);
        assert_eq!(mul_div_floor(6, 3, 2).unwrap(), 9);
        assert_eq!(mul_div_ceil(6, 3, 2).unwrap(), 9);
    }

    #[test]
    fn zero_denominator_contracts_differ() {
        for (a, b) in [(0u128, 0u128), (7, 3), (u128::MAX, u128::MAX)] {
            assert!(matches!(
                mul_div_floor(a, b, 0),
                Err(Error::Arithmetic(ArithmeticError::DivisionByZero))
            ));
            assert_eq!(mul_div_ceil(a, b, 0).unwrap(), 0);
        }
    }

    #[test]
    fn wide_product_does_not_wrap() {
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
        assert!(matches!(
            mul_div_floor(u128::MAX, u128::MAX, 1),
            Err(Error::Arithmetic(ArithmeticError::ArithmeticOverflow))
        ));
    }
}
