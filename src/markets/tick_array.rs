// src/markets/tick_array.rs

use bytemuck::{Pod, Zeroable};
use log::debug;
use solana_program::pubkey::Pubkey;

use crate::config::TICK_ARRAY_DISCRIMINATOR;
use crate::error::{DecodeError, Result, ValidationError};
use crate::math::{MAX_TICK_INDEX, MIN_TICK_INDEX};

pub const TICK_ARRAY_SIZE: usize = 88;

// Раскладка тика в аккаунте TickArray (113 байт, без выравнивания)
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C, packed)]
struct TickData {
    initialized: u8,
    liquidity_net: i128,
    liquidity_gross: u128,
    fee_growth_outside_a: u128,
    fee_growth_outside_b: u128,
    reward_growths_outside: [u128; 3],
}

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C, packed)]
struct TickArrayData {
    start_tick_index: i32,
    ticks: [TickData; TICK_ARRAY_SIZE],
    whirlpool: Pubkey,
}

pub const TICK_ARRAY_ACCOUNT_SIZE: usize = 8 + std::mem::size_of::<TickArrayData>();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick {
    pub initialized: bool,
    pub liquidity_net: i128,
    pub liquidity_gross: u128,
    pub fee_growth_outside_a: u128,
    pub fee_growth_outside_b: u128,
    pub reward_growths_outside: [u128; 3],
}

impl From<TickData> for Tick {
    fn from(raw: TickData) -> Self {
        Self {
            initialized: raw.initialized != 0,
            liquidity_net: raw.liquidity_net,
            liquidity_gross: raw.liquidity_gross,
            fee_growth_outside_a: raw.fee_growth_outside_a,
            fee_growth_outside_b: raw.fee_growth_outside_b,
            reward_growths_outside: raw.reward_growths_outside,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickArray {
    pub whirlpool: Pubkey,
    pub start_tick_index: i32,
    pub ticks: [Tick; TICK_ARRAY_SIZE],
}

impl TickArray {
    // Окно без инициализированных тиков (аккаунт еще не создан)
    pub fn empty(whirlpool: Pubkey, start_tick_index: i32) -> Self {
        Self {
            whirlpool,
            start_tick_index,
            ticks: [Tick::default(); TICK_ARRAY_SIZE],
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < TICK_ARRAY_ACCOUNT_SIZE {
            return Err(DecodeError::BufferTooShort {
                account: "TickArray",
                expected: TICK_ARRAY_ACCOUNT_SIZE,
                actual: data.len(),
            }
            .into());
        }
        if data[..8] != TICK_ARRAY_DISCRIMINATOR {
            return Err(DecodeError::InvalidDiscriminator { account: "TickArray" }.into());
        }

        let raw = bytemuck::try_from_bytes::<TickArrayData>(&data[8..TICK_ARRAY_ACCOUNT_SIZE])
            .map_err(|_| DecodeError::BufferTooShort {
                account: "TickArray",
                expected: TICK_ARRAY_ACCOUNT_SIZE,
                actual: data.len(),
            })?;

        // копируем поля из packed-структуры по значению
        let start_tick_index = raw.start_tick_index;
        let whirlpool = raw.whirlpool;
        let raw_ticks = raw.ticks;
        let ticks = raw_ticks.map(Tick::from);

        Ok(Self {
            whirlpool,
            start_tick_index,
            ticks,
        })
    }

    pub fn tick_span(tick_spacing: u16) -> i32 {
        tick_spacing as i32 * TICK_ARRAY_SIZE as i32
    }

    // Начало окна приходит из данных аккаунта, поэтому без переполнения
    pub fn end_tick_index(&self, tick_spacing: u16) -> i32 {
        self.start_tick_index
            .saturating_add(Self::tick_span(tick_spacing) - 1)
    }

    pub fn contains(&self, tick_index: i32, tick_spacing: u16) -> bool {
        tick_index >= self.start_tick_index && tick_index <= self.end_tick_index(tick_spacing)
    }

    // Инициализирует тик с заданным net; false, если тик не из этого окна
    pub fn set_liquidity_net(&mut self, tick_index: i32, tick_spacing: u16, liquidity_net: i128) -> bool {
        if !self.contains(tick_index, tick_spacing) || tick_index % tick_spacing as i32 != 0 {
            return false;
        }
        let offset = ((tick_index - self.start_tick_index) / tick_spacing as i32) as usize;
        self.ticks[offset] = Tick {
            initialized: true,
            liquidity_net,
            liquidity_gross: liquidity_net.unsigned_abs(),
            ..Tick::default()
        };
        true
    }

    fn tick(&self, tick_index: i32, tick_spacing: u16) -> Option<&Tick> {
        if !self.contains(tick_index, tick_spacing) || tick_index % tick_spacing as i32 != 0 {
            return None;
        }
        let offset = (tick_index - self.start_tick_index) / tick_spacing as i32;
        self.ticks.get(offset as usize)
    }
}

// Начало окна, содержащего тик (деление с округлением вниз)
pub fn tick_array_start_index(tick_index: i32, tick_spacing: u16) -> i32 {
    let span = TickArray::tick_span(tick_spacing);
    tick_index.div_euclid(span) * span
}

// Ближайший кратный шагу тик строго выше
pub fn next_initializable_tick_index(tick_index: i32, tick_spacing: u16) -> i32 {
    let spacing = tick_spacing as i32;
    tick_index.div_euclid(spacing) * spacing + spacing
}

// Ближайший кратный шагу тик не выше
pub fn initializable_tick_index_floor(tick_index: i32, tick_spacing: u16) -> i32 {
    let spacing = tick_spacing as i32;
    tick_index.div_euclid(spacing) * spacing
}

// Загруженные окна тиков в порядке возрастания индекса.
// Свап не может выйти за пределы последовательности.
#[derive(Debug, Clone)]
pub struct TickArraySequence {
    arrays: Vec<TickArray>,
    tick_spacing: u16,
}

impl TickArraySequence {
    pub fn new(mut arrays: Vec<TickArray>, tick_spacing: u16) -> Result<Self> {
        if tick_spacing == 0 {
            return Err(ValidationError::ZeroTickSpacing(
                arrays.first().map(|a| a.whirlpool).unwrap_or_default(),
            )
            .into());
        }
        arrays.sort_by_key(|array| array.start_tick_index);
        arrays.dedup_by_key(|array| array.start_tick_index);
        Ok(Self {
            arrays,
            tick_spacing,
        })
    }

    pub fn tick_spacing(&self) -> u16 {
        self.tick_spacing
    }

    pub fn arrays(&self) -> &[TickArray] {
        &self.arrays
    }

    pub fn start_index(&self) -> i32 {
        self.arrays
            .first()
            .map(|array| array.start_tick_index)
            .unwrap_or(0)
    }

    pub fn end_index(&self) -> i32 {
        self.arrays
            .last()
            .map(|array| array.end_tick_index(self.tick_spacing))
            .unwrap_or(-1)
    }

    fn tick(&self, tick_index: i32) -> Option<&Tick> {
        self.arrays
            .iter()
            .find(|array| array.contains(tick_index, self.tick_spacing))
            .and_then(|array| array.tick(tick_index, self.tick_spacing))
    }

    // Ближайший инициализированный тик в направлении свопа.
    // Если до края последовательности таких нет, возвращается край без тика.
    pub fn next_initialized_tick(&self, tick_index: i32, a_to_b: bool) -> Result<(i32, Option<Tick>)> {
        let start = self.start_index().max(MIN_TICK_INDEX);
        let end = self.end_index().min(MAX_TICK_INDEX);

        if a_to_b {
            if self.arrays.is_empty() || tick_index < start {
                return Err(ValidationError::TickSequenceExhausted(tick_index).into());
            }
            let mut candidate = initializable_tick_index_floor(tick_index.min(end), self.tick_spacing);
            while candidate >= start {
                if let Some(tick) = self.tick(candidate).filter(|t| t.initialized) {
                    return Ok((candidate, Some(*tick)));
                }
                candidate -= self.tick_spacing as i32;
            }
            Ok((start, None))
        } else {
            if self.arrays.is_empty() || tick_index >= end {
                return Err(ValidationError::TickSequenceExhausted(tick_index).into());
            }
            let mut candidate =
                next_initializable_tick_index(tick_index.max(start - 1), self.tick_spacing);
            while candidate <= end {
                if let Some(tick) = self.tick(candidate).filter(|t| t.initialized) {
                    return Ok((candidate, Some(*tick)));
                }
                candidate += self.tick_spacing as i32;
            }
            debug!("No initialized tick above {} up to {}", tick_index, end);
            Ok((end, None))
        }
    }
}

// Кодирование аккаунта, обратное TickArray::decode
pub fn encode_tick_array(array: &TickArray) -> Vec<u8> {
    let mut data = Vec::with_capacity(TICK_ARRAY_ACCOUNT_SIZE);
    data.extend_from_slice(&TICK_ARRAY_DISCRIMINATOR);
    data.extend_from_slice(&array.start_tick_index.to_le_bytes());
    for tick in array.ticks.iter() {
        data.push(tick.initialized as u8);
        data.extend_from_slice(&tick.liquidity_net.to_le_bytes());
        data.extend_from_slice(&tick.liquidity_gross.to_le_bytes());
        data.extend_from_slice(&tick.fee_growth_outside_a.to_le_bytes());
        data.extend_from_slice(&tick.fee_growth_outside_b.to_le_bytes());
        for growth in tick.reward_growths_outside.iter() {
            data.extend_from_slice(&growth.to_le_bytes());
        }
    }
    data.extend_from_slice(array.whirlpool.as_ref());
    data
}

// Ставит инициализированный тик в окно, для тестов
#[cfg(test)]
pub(crate) fn set_tick(array: &mut TickArray, tick_index: i32, tick_spacing: u16, liquidity_net: i128) {
    assert!(array.set_liquidity_net(tick_index, tick_spacing, liquidity_net));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SPACING: u16 = 64;

    fn sequence(starts: &[i32], ticks: &[(i32, i128)]) -> TickArraySequence {
        let pool = Pubkey::new_unique();
        let arrays = starts
            .iter()
            .map(|start| {
                let mut array = TickArray::empty(pool, *start);
                for (index, net) in ticks {
                    if array.contains(*index, SPACING) {
                        set_tick(&mut array, *index, SPACING, *net);
                    }
                }
                array
            })
            .collect();
        TickArraySequence::new(arrays, SPACING).unwrap()
    }

    #[test]
    fn end_index_saturates_for_extreme_starts() {
        let array = TickArray::empty(Pubkey::new_unique(), i32::MAX - 10);
        assert_eq!(array.end_tick_index(u16::MAX), i32::MAX);
        assert!(array.contains(i32::MAX, u16::MAX));
        assert_eq!(TickArray::empty(Pubkey::new_unique(), 0).end_tick_index(SPACING), 5631);
    }

    #[test]
    fn account_layout_size() {
        assert_eq!(std::mem::size_of::<TickData>(), 113);
        assert_eq!(TICK_ARRAY_ACCOUNT_SIZE, 9988);
    }

    #[test]
    fn decode_reads_ticks_and_owner() {
        let pool = Pubkey::new_unique();
        let mut array = TickArray::empty(pool, -5632);
        set_tick(&mut array, -1280, SPACING, 500);
        array.ticks[3].fee_growth_outside_b = 42;
        array.ticks[3].reward_growths_outside = [1, 2, 3];

        let decoded = TickArray::decode(&encode_tick_array(&array)).unwrap();
        assert_eq!(decoded.whirlpool, pool);
        assert_eq!(decoded.start_tick_index, -5632);
        assert_eq!(decoded.ticks[68].liquidity_net, 500);
        assert!(decoded.ticks[68].initialized);
        assert_eq!(decoded.ticks[3].fee_growth_outside_b, 42);
        assert_eq!(decoded.ticks[3].reward_growths_outside, [1, 2, 3]);
        assert!(!decoded.ticks[3].initialized);
    }

    #[test]
    fn decode_rejects_short_and_foreign_accounts() {
        let data = encode_tick_array(&TickArray::empty(Pubkey::new_unique(), 0));
        assert!(matches!(
            TickArray::decode(&data[..TICK_ARRAY_ACCOUNT_SIZE - 1]),
            Err(Error::Decode(DecodeError::BufferTooShort { .. }))
        ));
        let mut foreign = data.clone();
        foreign[0] = 0;
        assert!(matches!(
            TickArray::decode(&foreign),
            Err(Error::Decode(DecodeError::InvalidDiscriminator { .. }))
        ));
    }

    #[test]
    fn start_index_floors_negative_ticks() {
        assert_eq!(tick_array_start_index(0, SPACING), 0);
        assert_eq!(tick_array_start_index(5631, SPACING), 0);
        assert_eq!(tick_array_start_index(5632, SPACING), 5632);
        assert_eq!(tick_array_start_index(-1, SPACING), -5632);
        assert_eq!(tick_array_start_index(-5632, SPACING), -5632);
        assert_eq!(tick_array_start_index(-5633, SPACING), -11264);
    }

    #[test]
    fn initializable_neighbours() {
        assert_eq!(next_initializable_tick_index(0, SPACING), 64);
        assert_eq!(next_initializable_tick_index(-1, SPACING), 0);
        assert_eq!(next_initializable_tick_index(-64, SPACING), 0);
        assert_eq!(initializable_tick_index_floor(-1, SPACING), -64);
        assert_eq!(initializable_tick_index_floor(63, SPACING), 0);
    }

    #[test]
    fn finds_initialized_ticks_in_both_directions() {
        let seq = sequence(&[-11264, -5632, 0], &[(-2560, 5), (-1280, 7), (0, 9)]);
        assert_eq!(seq.next_initialized_tick(0, true).unwrap().0, 0);
        assert_eq!(seq.next_initialized_tick(-1, true).unwrap().0, -1280);
        let (index, tick) = seq.next_initialized_tick(-1281, true).unwrap();
        assert_eq!(index, -2560);
        assert_eq!(tick.unwrap().liquidity_net, 5);
        assert_eq!(seq.next_initialized_tick(-2561, true).unwrap(), (-11264, None));

        assert_eq!(seq.next_initialized_tick(-2561, false).unwrap().0, -2560);
        assert_eq!(seq.next_initialized_tick(-2560, false).unwrap().0, -1280);
        assert_eq!(seq.next_initialized_tick(0, false).unwrap(), (5631, None));
    }

    #[test]
    fn leaving_the_sequence_is_exhaustion() {
        let seq = sequence(&[0, 5632, 11264], &[]);
        assert!(matches!(
            seq.next_initialized_tick(-1, true),
            Err(Error::Validation(ValidationError::TickSequenceExhausted(-1)))
        ));
        assert!(matches!(
            seq.next_initialized_tick(16895, false),
            Err(Error::Validation(ValidationError::TickSequenceExhausted(16895)))
        ));
        assert_eq!(seq.next_initialized_tick(16894, false).unwrap(), (16895, None));
    }

    #[test]
    fn arrays_are_sorted_and_deduplicated() {
        let pool = Pubkey::new_unique();
        let seq = TickArraySequence::new(
            vec![
                TickArray::empty(pool, 5632),
                TickArray::empty(pool, 0),
                TickArray::empty(pool, 5632),
            ],
            SPACING,
        )
        .unwrap();
        assert_eq!(seq.arrays().len(), 2);
        assert_eq!(seq.start_index(), 0);
        assert_eq!(seq.end_index(), 11263);
        assert!(TickArraySequence::new(vec![], 0).is_err());
    }
}
