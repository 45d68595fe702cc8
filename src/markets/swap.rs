// src/markets/swap.rs

use log::debug;

use super::tick_array::TickArraySequence;
use crate::decoder::Whirlpool;
use crate::error::{ArithmeticError, Result, ValidationError};
use crate::math::{
    compute_swap_step, sqrt_price_from_tick_index, tick_index_from_sqrt_price, MAX_SQRT_PRICE,
    MIN_SQRT_PRICE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapParams {
    pub amount: u64,
    pub sqrt_price_limit: Option<u128>,
    pub a_to_b: bool,
    pub amount_specified_is_input: bool,
}

// Итог прохода по тикам. amount_remaining > 0 только при упоре в лимит цены.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee_amount: u64,
    pub amount_remaining: u64,
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    pub liquidity: u128,
    pub ticks_crossed: u32,
}

// Лимит по умолчанию: на шаг внутрь допустимого диапазона
pub fn default_sqrt_price_limit(a_to_b: bool) -> u128 {
    if a_to_b {
        MIN_SQRT_PRICE + 1
    } else {
        MAX_SQRT_PRICE - 1
    }
}

fn resolve_sqrt_price_limit(limit: Option<u128>, current: u128, a_to_b: bool) -> Result<u128> {
    let Some(limit) = limit else {
        return Ok(default_sqrt_price_limit(a_to_b));
    };
    let in_bounds = (MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&limit);
    let right_side = if a_to_b { limit < current } else { limit > current };
    if !in_bounds || !right_side {
        return Err(ValidationError::InvalidSqrtPriceLimit { limit, current }.into());
    }
    Ok(limit)
}

fn apply_liquidity_delta(liquidity: u128, delta: i128) -> Result<u128> {
    let updated = if delta < 0 {
        liquidity.checked_sub(delta.unsigned_abs())
    } else {
        liquidity.checked_add(delta as u128)
    };
    updated.ok_or_else(|| ArithmeticError::ArithmeticOverflow.into())
}

/// Проход свопа по загруженным окнам тиков.
///
/// На каждом шаге цена движется до ближайшего инициализированного тика
/// (или до лимита), при пересечении тика активная ликвидность меняется
/// на его `liquidity_net`. Состояние пула не изменяется.
pub fn compute_swap(
    whirlpool: &Whirlpool,
    sequence: &TickArraySequence,
    params: &SwapParams,
) -> Result<SwapOutcome> {
    let a_to_b = params.a_to_b;
    let specified_input = params.amount_specified_is_input;
    let sqrt_price_limit = resolve_sqrt_price_limit(params.sqrt_price_limit, whirlpool.sqrt_price, a_to_b)?;

    let mut amount_remaining = params.amount;
    let mut amount_in: u64 = 0;
    let mut amount_out: u64 = 0;
    let mut fee_amount: u64 = 0;
    let mut sqrt_price = whirlpool.sqrt_price;
    let mut tick_current_index = whirlpool.tick_current_index;
    let mut liquidity = whirlpool.liquidity;
    let mut ticks_crossed = 0u32;

    while amount_remaining > 0 && sqrt_price != sqrt_price_limit {
        let (next_tick_index, next_tick) = sequence.next_initialized_tick(tick_current_index, a_to_b)?;
        let next_tick_sqrt_price = sqrt_price_from_tick_index(next_tick_index)?;
        let target_sqrt_price = if a_to_b {
            next_tick_sqrt_price.max(sqrt_price_limit)
        } else {
            next_tick_sqrt_price.min(sqrt_price_limit)
        };

        let step = compute_swap_step(
            amount_remaining,
            whirlpool.fee_rate,
            liquidity,
            sqrt_price,
            target_sqrt_price,
            a_to_b,
            specified_input,
        )?;

        amount_in = amount_in
            .checked_add(step.amount_in)
            .ok_or(ArithmeticError::ArithmeticOverflow)?;
        amount_out = amount_out
            .checked_add(step.amount_out)
            .ok_or(ArithmeticError::ArithmeticOverflow)?;
        fee_amount = fee_amount
            .checked_add(step.fee_amount)
            .ok_or(ArithmeticError::ArithmeticOverflow)?;

        let consumed = if specified_input {
            step.amount_in
                .checked_add(step.fee_amount)
                .ok_or(ArithmeticError::ArithmeticOverflow)?
        } else {
            step.amount_out
        };
        amount_remaining = amount_remaining
            .checked_sub(consumed)
            .ok_or(ArithmeticError::ArithmeticOverflow)?;

        // Цена может уже стоять на тике (после свопа B→A, закончившегося на
        // границе): тогда шаг нулевой, но тик все равно пересекается.
        let previous = (tick_current_index, liquidity);
        if step.next_sqrt_price == next_tick_sqrt_price {
            if let Some(tick) = next_tick {
                // вниз по цене net вычитается
                let delta = if a_to_b {
                    tick.liquidity_net
                        .checked_neg()
                        .ok_or(ArithmeticError::ArithmeticOverflow)?
                } else {
                    tick.liquidity_net
                };
                liquidity = apply_liquidity_delta(liquidity, delta)?;
                ticks_crossed += 1;
                debug!(
                    "Пересечен тик {} пула {}, ликвидность {}",
                    next_tick_index, whirlpool.address, liquidity
                );
            }
            tick_current_index = if a_to_b { next_tick_index - 1 } else { next_tick_index };
        } else if step.next_sqrt_price != sqrt_price {
            tick_current_index = tick_index_from_sqrt_price(step.next_sqrt_price)?;
        }

        if step.next_sqrt_price == sqrt_price
            && consumed == 0
            && step.amount_out == 0
            && (tick_current_index, liquidity) == previous
        {
            return Err(ArithmeticError::NoLiquidityProgress(sqrt_price).into());
        }
        sqrt_price = step.next_sqrt_price;
    }

    let result = if specified_input { amount_out } else { amount_in };
    if result == 0 {
        return Err(ArithmeticError::DegenerateQuote.into());
    }

    Ok(SwapOutcome {
        amount_in,
        amount_out,
        fee_amount,
        amount_remaining,
        sqrt_price,
        tick_current_index,
        liquidity,
        ticks_crossed,
    })
}
