// src/markets/tick_array_bitmap.rs

use bytemuck::{Pod, Zeroable};
use log::warn;
use solana_program::pubkey::Pubkey;

use super::tick_array::TickArray;
use crate::error::{DecodeError, Result, ValidationError};

pub const TICK_ARRAY_BITMAP_SIZE: i32 = 512;
pub const EXTENSION_TICKARRAY_BITMAP_SIZE: usize = 14;

// 512 бит на один битмап
type TickArrayBitmap = [u64; 8];

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C, packed)]
struct BitmapExtensionData {
    pool_id: Pubkey,
    positive_tick_array_bitmap: [TickArrayBitmap; EXTENSION_TICKARRAY_BITMAP_SIZE],
    negative_tick_array_bitmap: [TickArrayBitmap; EXTENSION_TICKARRAY_BITMAP_SIZE],
}

pub const BITMAP_EXTENSION_ACCOUNT_SIZE: usize = 8 + std::mem::size_of::<BitmapExtensionData>();

// Сколько тиков покрывает один битмап. При шаге больше 47662 не влезает в i32.
pub fn max_tick_in_tick_array_bitmap(tick_spacing: u16) -> i64 {
    TICK_ARRAY_BITMAP_SIZE as i64 * TickArray::tick_span(tick_spacing) as i64
}

// Окна в этом диапазоне учитываются основным битмапом пула
pub fn is_in_default_range(start_tick_index: i32, tick_spacing: u16) -> bool {
    let bound = max_tick_in_tick_array_bitmap(tick_spacing);
    let start = start_tick_index as i64;
    start >= -bound && start < bound
}

/// Битмапы инициализированных окон тиков за пределами основного диапазона.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickArrayBitmapExtension {
    pub pool_id: Pubkey,
    pub positive_tick_array_bitmap: [TickArrayBitmap; EXTENSION_TICKARRAY_BITMAP_SIZE],
    pub negative_tick_array_bitmap: [TickArrayBitmap; EXTENSION_TICKARRAY_BITMAP_SIZE],
}

impl TickArrayBitmapExtension {
    pub fn new(pool_id: Pubkey) -> Self {
        Self {
            pool_id,
            positive_tick_array_bitmap: [[0; 8]; EXTENSION_TICKARRAY_BITMAP_SIZE],
            negative_tick_array_bitmap: [[0; 8]; EXTENSION_TICKARRAY_BITMAP_SIZE],
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < BITMAP_EXTENSION_ACCOUNT_SIZE {
            return Err(DecodeError::BufferTooShort {
                account: "TickArrayBitmapExtension",
                expected: BITMAP_EXTENSION_ACCOUNT_SIZE,
                actual: data.len(),
            }
            .into());
        }
        let raw = bytemuck::try_from_bytes::<BitmapExtensionData>(
            &data[8..BITMAP_EXTENSION_ACCOUNT_SIZE],
        )
        .map_err(|_| DecodeError::BufferTooShort {
            account: "TickArrayBitmapExtension",
            expected: BITMAP_EXTENSION_ACCOUNT_SIZE,
            actual: data.len(),
        })?;

        Ok(Self {
            pool_id: raw.pool_id,
            positive_tick_array_bitmap: raw.positive_tick_array_bitmap,
            negative_tick_array_bitmap: raw.negative_tick_array_bitmap,
        })
    }

    // (номер битмапа, номер бита) для окна вне основного диапазона
    fn locate(start_tick_index: i32, tick_spacing: u16) -> Result<(usize, usize)> {
        let span = TickArray::tick_span(tick_spacing);
        let bound = max_tick_in_tick_array_bitmap(tick_spacing);
        if span == 0
            || start_tick_index % span != 0
            || is_in_default_range(start_tick_index, tick_spacing)
        {
            return Err(ValidationError::TickArrayOutOfRange(start_tick_index).into());
        }

        let abs = start_tick_index.unsigned_abs() as i64;
        let mut offset = abs / bound - 1;
        if start_tick_index < 0 && abs % bound == 0 {
            offset -= 1;
        }
        if offset < 0 || offset as usize >= EXTENSION_TICKARRAY_BITMAP_SIZE {
            return Err(ValidationError::TickArrayOutOfRange(start_tick_index).into());
        }

        let remainder = abs % bound;
        let mut position = remainder / span as i64;
        if start_tick_index < 0 && remainder != 0 {
            position = TICK_ARRAY_BITMAP_SIZE as i64 - position;
        }
        Ok((offset as usize, position as usize))
    }

    fn bitmap(&self, start_tick_index: i32, offset: usize) -> &TickArrayBitmap {
        if start_tick_index < 0 {
            &self.negative_tick_array_bitmap[offset]
        } else {
            &self.positive_tick_array_bitmap[offset]
        }
    }

    pub fn is_initialized(&self, start_tick_index: i32, tick_spacing: u16) -> Result<bool> {
        let (offset, position) = Self::locate(start_tick_index, tick_spacing)?;
        let word = self.bitmap(start_tick_index, offset)[position / 64];
        Ok(word & (1u64 << (position % 64)) != 0)
    }

    pub fn set_initialized(&mut self, start_tick_index: i32, tick_spacing: u16) -> Result<()> {
        let (offset, position) = Self::locate(start_tick_index, tick_spacing)?;
        let bitmap = if start_tick_index < 0 {
            &mut self.negative_tick_array_bitmap[offset]
        } else {
            &mut self.positive_tick_array_bitmap[offset]
        };
        bitmap[position / 64] |= 1u64 << (position % 64);
        Ok(())
    }

    // Стоит ли запрашивать аккаунт окна: основной диапазон всегда,
    // за его пределами только отмеченные окна. Окно, которого нет в
    // битмапе, запрашиваем как есть: отсутствующий аккаунт станет пустым окном.
    pub fn should_fetch(&self, start_tick_index: i32, tick_spacing: u16) -> bool {
        if is_in_default_range(start_tick_index, tick_spacing) {
            return true;
        }
        match self.is_initialized(start_tick_index, tick_spacing) {
            Ok(initialized) => initialized,
            Err(e) => {
                warn!("Битмап пула {} не покрывает окно {}: {}", self.pool_id, start_tick_index, e);
                true
            }
        }
    }
}
