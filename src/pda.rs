// src/pda.rs

use solana_program::pubkey::Pubkey;

use crate::config::{ORACLE_SEED, TICK_ARRAY_SEED, WHIRLPOOL_PROGRAM_ID};
use crate::error::{Error, Result};
use crate::markets::tick_array::{tick_array_start_index, TickArray};

fn find_address(seeds: &[&[u8]], label: &'static str, base: &Pubkey) -> Result<Pubkey> {
    Pubkey::try_find_program_address(seeds, &WHIRLPOOL_PROGRAM_ID)
        .map(|(address, _bump)| address)
        .ok_or(Error::AddressDerivationFailed { label, base: *base })
}

// Индекс окна входит в сиды десятичной строкой
pub fn tick_array_address(whirlpool: &Pubkey, start_tick_index: i32) -> Result<Pubkey> {
    let start = start_tick_index.to_string();
    find_address(
        &[TICK_ARRAY_SEED, whirlpool.as_ref(), start.as_bytes()],
        "tick_array",
        whirlpool,
    )
}

pub fn oracle_address(whirlpool: &Pubkey) -> Result<Pubkey> {
    find_address(&[ORACLE_SEED, whirlpool.as_ref()], "oracle", whirlpool)
}

/// Начала трех окон, которые проходит своп из текущего тика.
///
/// A→B идет вниз: текущее окно и два предыдущих. B→A идет вверх: текущее
/// и два следующих, со сдвигом на окно вперед, если ближайший
/// инициализируемый тик уже лежит в следующем окне.
pub fn swap_tick_array_start_indexes(tick_current_index: i32, tick_spacing: u16, a_to_b: bool) -> [i32; 3] {
    let span = TickArray::tick_span(tick_spacing);
    let base = tick_array_start_index(tick_current_index, tick_spacing);
    let offsets: [i32; 3] = if a_to_b {
        [0, -1, -2]
    } else if tick_current_index + tick_spacing as i32 >= base + span {
        [1, 2, 3]
    } else {
        [0, 1, 2]
    };
    offsets.map(|offset| base.saturating_add(offset * span))
}

pub fn swap_tick_array_addresses(
    whirlpool: &Pubkey,
    tick_current_index: i32,
    tick_spacing: u16,
    a_to_b: bool,
) -> Result<[Pubkey; 3]> {
    let [first, second, third] = swap_tick_array_start_indexes(tick_current_index, tick_spacing, a_to_b);
    Ok([
        tick_array_address(whirlpool, first)?,
        tick_array_address(whirlpool, second)?,
        tick_array_address(whirlpool, third)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sol_usdc() -> Pubkey {
        Pubkey::from_str("Czfq3xZZDmsdGdUyrNLtRhGc47cXcZtLG4crryfu44zE").unwrap()
    }

    #[test]
    fn derivation_is_deterministic() {
        let pool = sol_usdc();
        assert_eq!(tick_array_address(&pool, -5632).unwrap(), tick_array_address(&pool, -5632).unwrap());
        assert_eq!(oracle_address(&pool).unwrap(), oracle_address(&pool).unwrap());
        assert_ne!(tick_array_address(&pool, -5632).unwrap(), tick_array_address(&pool, 0).unwrap());
        assert_ne!(
            tick_array_address(&pool, 0).unwrap(),
            tick_array_address(&Pubkey::new_unique(), 0).unwrap()
        );
    }

    #[test]
    fn seeds_use_decimal_start_index() {
        let pool = sol_usdc();
        let (expected, _) = Pubkey::find_program_address(
            &[b"tick_array", pool.as_ref(), b"-5632"],
            &WHIRLPOOL_PROGRAM_ID,
        );
        assert_eq!(tick_array_address(&pool, -5632).unwrap(), expected);
        let (expected, _) =
            Pubkey::find_program_address(&[b"oracle", pool.as_ref()], &WHIRLPOOL_PROGRAM_ID);
        assert_eq!(oracle_address(&pool).unwrap(), expected);
    }

    #[test]
    fn triple_follows_trade_direction() {
        assert_eq!(swap_tick_array_start_indexes(0, 64, true), [0, -5632, -11264]);
        assert_eq!(swap_tick_array_start_indexes(0, 64, false), [0, 5632, 11264]);
        assert_eq!(swap_tick_array_start_indexes(-1, 64, true), [-5632, -11264, -16896]);
        assert_eq!(swap_tick_array_start_indexes(-1, 64, false), [0, 5632, 11264]);
        // до конца окна меньше шага: вверх начинаем со следующего
        assert_eq!(swap_tick_array_start_indexes(5570, 64, false), [5632, 11264, 16896]);
        assert_eq!(swap_tick_array_start_indexes(5567, 64, false), [0, 5632, 11264]);
        assert_eq!(swap_tick_array_start_indexes(5570, 64, true), [0, -5632, -11264]);
    }

    #[test]
    fn widest_spacing_at_tick_bounds() {
        let span = 88 * 65_535;
        assert_eq!(swap_tick_array_start_indexes(443_636, u16::MAX, false), [0, span, 2 * span]);
        assert_eq!(
            swap_tick_array_start_indexes(-443_636, u16::MAX, true),
            [-span, -2 * span, -3 * span]
        );
    }

    #[test]
    fn triple_addresses_match_single_derivations() {
        let pool = sol_usdc();
        let addresses = swap_tick_array_addresses(&pool, 100, 8, false).unwrap();
        let starts = swap_tick_array_start_indexes(100, 8, false);
        for (address, start) in addresses.iter().zip(starts) {
            assert_eq!(*address, tick_array_address(&pool, start).unwrap());
        }
    }
}
