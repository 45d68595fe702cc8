// src/math/swap_math.rs

use super::big_num::U256;
use super::full_math::{mul_div_ceil, mul_div_floor};
use super::sqrt_price_math::{
    amount_delta_a, amount_delta_b, next_sqrt_price_from_a_round_up,
    next_sqrt_price_from_b_round_down,
};
use super::FEE_RATE_DENOMINATOR;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapStep {
    pub next_sqrt_price: u128,
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee_amount: u64,
}

// "Фиксированная" сторона шага: та, что задана пользователем
// (вход при exact-in, выход при exact-out)
fn amount_fixed_delta(
    sqrt_price_current: u128,
    sqrt_price_target: u128,
    liquidity: u128,
    a_to_b: bool,
    specified_input: bool,
) -> Result<U256> {
    if a_to_b == specified_input {
        amount_delta_a(sqrt_price_current, sqrt_price_target, liquidity, specified_input)
    } else {
        amount_delta_b(sqrt_price_current, sqrt_price_target, liquidity, specified_input)
    }
}

fn amount_unfixed_delta(
    sqrt_price_current: u128,
    sqrt_price_target: u128,
    liquidity: u128,
    a_to_b: bool,
    specified_input: bool,
) -> Result<U256> {
    if a_to_b == specified_input {
        amount_delta_b(sqrt_price_current, sqrt_price_target, liquidity, !specified_input)
    } else {
        amount_delta_a(sqrt_price_current, sqrt_price_target, liquidity, !specified_input)
    }
}

fn next_sqrt_price(
    sqrt_price_current: u128,
    liquidity: u128,
    amount: u64,
    a_to_b: bool,
    specified_input: bool,
) -> Result<u128> {
    if a_to_b == specified_input {
        next_sqrt_price_from_a_round_up(sqrt_price_current, liquidity, amount, specified_input)
    } else {
        next_sqrt_price_from_b_round_down(sqrt_price_current, liquidity, amount, specified_input)
    }
}

/// Один шаг свопа внутри отрезка постоянной ликвидности.
///
/// Цена движется от `sqrt_price_current` к `sqrt_price_target`, пока не
/// кончится `amount_remaining`. При exact-in комиссия удерживается из входа
/// до расчета кривой, при exact-out начисляется поверх найденного входа.
pub fn compute_swap_step(
    amount_remaining: u64,
    fee_rate: u16,
    liquidity: u128,
    sqrt_price_current: u128,
    sqrt_price_target: u128,
    a_to_b: bool,
    specified_input: bool,
) -> Result<SwapStep> {
    let fee_rate = fee_rate as u128;
    let fee_denominator = FEE_RATE_DENOMINATOR as u128;

    let initial_fixed_delta = amount_fixed_delta(
        sqrt_price_current,
        sqrt_price_target,
        liquidity,
        a_to_b,
        specified_input,
    )?;

    let amount_calc = if specified_input {
        mul_div_floor(amount_remaining as u128, fee_denominator - fee_rate, fee_denominator)? as u64
    } else {
        amount_remaining
    };

    let next_sqrt_price = if initial_fixed_delta <= U256::from(amount_calc) {
        sqrt_price_target
    } else {
        next_sqrt_price(sqrt_price_current, liquidity, amount_calc, a_to_b, specified_input)?
    };
    let is_max_swap = next_sqrt_price == sqrt_price_target;

    let fixed_delta = if is_max_swap {
        initial_fixed_delta
    } else {
        amount_fixed_delta(sqrt_price_current, next_sqrt_price, liquidity, a_to_b, specified_input)?
    }
    .try_into_u64()?;
    let unfixed_delta = amount_unfixed_delta(
        sqrt_price_current,
        next_sqrt_price,
        liquidity,
        a_to_b,
        specified_input,
    )?
    .try_into_u64()?;

    let (amount_in, mut amount_out) = if specified_input {
        (fixed_delta, unfixed_delta)
    } else {
        (unfixed_delta, fixed_delta)
    };
    if !specified_input && amount_out > amount_remaining {
        amount_out = amount_remaining;
    }

    // Остаток входа, не сдвинувший цену, уходит в комиссию
    let fee_amount = if specified_input && !is_max_swap {
        amount_remaining - amount_in
    } else {
        mul_div_ceil(amount_in as u128, fee_rate, fee_denominator - fee_rate)? as u64
    };

    Ok(SwapStep {
        next_sqrt_price,
        amount_in,
        amount_out,
        fee_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_math::sqrt_price_from_tick_index;

    const Q64: u128 = 1 << 64;
    const LIQUIDITY: u128 = 1_000_000_000_000;

    #[test]
    fn exact_in_within_segment() {
        let target = sqrt_price_from_tick_index(-1280).unwrap();
        let step = compute_swap_step(1_000_000, 3000, LIQUIDITY, Q64, target, true, true).unwrap();
        assert_eq!(step.amount_in, 997_000);
        assert_eq!(step.amount_out, 996_999);
        assert_eq!(step.fee_amount, 3_000);
        assert_eq!(step.next_sqrt_price, 18_446_725_682_324_046_339);
    }

    #[test]
    fn exact_out_adds_fee_on_top() {
        let target = sqrt_price_from_tick_index(-1280).unwrap();
        let step = compute_swap_step(1_000_000, 3000, LIQUIDITY, Q64, target, true, false).unwrap();
        assert_eq!(step.amount_out, 1_000_000);
        assert_eq!(step.amount_in, 1_000_002);
        assert_eq!(step.fee_amount, 3_010);
        assert_eq!(step.next_sqrt_price, 18_446_725_626_965_477_906);
    }

    #[test]
    fn reaching_target_charges_proportional_fee() {
        let target = sqrt_price_from_tick_index(64).unwrap();
        let step =
            compute_swap_step(u64::MAX / 2, 3000, LIQUIDITY, Q64, target, false, true).unwrap();
        assert_eq!(step.next_sqrt_price, target);
        let expected_in = amount_delta_b(Q64, target, LIQUIDITY, true).unwrap().low_u64();
        assert_eq!(step.amount_in, expected_in);
        assert_eq!(
            step.fee_amount as u128,
            mul_div_ceil(expected_in as u128, 3000, 997_000).unwrap()
        );
    }

    #[test]
    fn zero_liquidity_jumps_to_target() {
        let target = sqrt_price_from_tick_index(-64).unwrap();
        let step = compute_swap_step(1_000, 3000, 0, Q64, target, true, true).unwrap();
        assert_eq!(step.next_sqrt_price, target);
        assert_eq!(step.amount_in, 0);
        assert_eq!(step.amount_out, 0);
        assert_eq!(step.fee_amount, 0);
    }

    #[test]
    fn dust_input_is_consumed_as_fee() {
        let target = sqrt_price_from_tick_index(-64).unwrap();
        let step = compute_swap_step(1, 3000, LIQUIDITY, Q64, target, true, true).unwrap();
        assert_eq!(step.next_sqrt_price, Q64);
        assert_eq!(step.amount_in, 0);
        assert_eq!(step.fee_amount, 1);
    }
}
