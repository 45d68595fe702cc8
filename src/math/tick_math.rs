// src/math/tick_math.rs
// Перевод между индексом тика и √P в Q64.64. √P(i) = 1.0001^(i/2) · 2^64.

use super::big_num::U256;
use super::{MAX_SQRT_PRICE, MAX_TICK_INDEX, MIN_SQRT_PRICE, MIN_TICK_INDEX};
use crate::error::{ArithmeticError, Result};

// ⌊√1.0001^(2^k) · 2^96⌋
const POSITIVE_RATIOS_X96: [u128; 19] = [
    79_232_123_823_359_799_118_286_999_567,
    79_236_085_330_515_764_027_303_304_731,
    79_244_008_939_048_815_603_706_035_061,
    79_259_858_533_276_714_757_314_932_305,
    79_291_567_232_598_584_799_939_703_904,
    79_355_022_692_464_371_645_785_046_466,
    79_482_085_999_252_804_386_437_311_141,
    79_736_823_300_114_093_921_829_183_326,
    80_248_749_790_819_932_309_965_073_892,
    81_282_483_887_344_747_381_513_967_011,
    83_390_072_131_320_151_908_154_831_281,
    87_770_609_709_833_776_024_991_924_138,
    97_234_110_755_111_693_312_479_820_773,
    119_332_217_159_966_728_226_237_229_890,
    179_736_315_981_702_064_433_883_588_727,
    407_748_233_172_238_350_107_850_275_304,
    2_098_478_828_474_011_932_436_660_412_517,
    55_581_415_166_113_811_149_459_800_483_533,
    38_992_368_544_603_139_932_233_054_999_993_551,
];

// ⌊2^64 / √1.0001^(2^k)⌋
const NEGATIVE_RATIOS_X64: [u128; 19] = [
    18_445_821_805_675_392_311,
    18_444_899_583_751_176_498,
    18_443_055_278_223_354_162,
    18_439_367_220_385_604_838,
    18_431_993_317_065_449_817,
    18_417_254_355_718_160_513,
    18_387_811_781_193_591_352,
    18_329_067_761_203_520_168,
    18_212_142_134_806_087_854,
    17_980_523_815_641_551_639,
    17_526_086_738_831_147_013,
    16_651_378_430_235_024_244,
    15_030_750_278_693_429_944,
    12_247_334_978_882_834_399,
    8_131_365_268_884_726_200,
    3_584_323_654_723_342_297,
    696_457_651_847_595_233,
    26_294_789_957_452_057,
    37_481_735_321_082,
];

const Q96: u128 = 1 << 96;
const Q64: u128 = 1 << 64;

/// √P для тика. Тики вне [MIN_TICK_INDEX, MAX_TICK_INDEX] дают ошибку.
pub fn sqrt_price_from_tick_index(tick: i32) -> Result<u128> {
    if !(MIN_TICK_INDEX..=MAX_TICK_INDEX).contains(&tick) {
        return Err(ArithmeticError::TickOutOfBounds(tick).into());
    }
    if tick >= 0 {
        sqrt_price_positive(tick as u32)
    } else {
        Ok(sqrt_price_negative(tick.unsigned_abs()))
    }
}

fn sqrt_price_positive(tick: u32) -> Result<u128> {
    let mut ratio = if tick & 1 != 0 {
        U256::from(POSITIVE_RATIOS_X96[0])
    } else {
        U256::from(Q96)
    };
    for (bit, factor) in POSITIVE_RATIOS_X96.iter().enumerate().skip(1) {
        if tick & (1 << bit) != 0 {
            ratio = ratio * U256::from(*factor) / U256::from(Q96);
        }
    }
    // Q96 → Q64
    (ratio / U256::from(1u64 << 32)).try_into_u128()
}

fn sqrt_price_negative(tick: u32) -> u128 {
    let mut ratio = if tick & 1 != 0 {
        NEGATIVE_RATIOS_X64[0]
    } else {
        Q64
    };
    for (bit, factor) in NEGATIVE_RATIOS_X64.iter().enumerate().skip(1) {
        if tick & (1 << bit) != 0 {
            // оба множителя ≤ 2^64, произведение помещается в u128
            ratio = ratio * factor >> 64;
        }
    }
    ratio
}

/// Наибольший тик, у которого √P не превышает `sqrt_price`.
pub fn tick_index_from_sqrt_price(sqrt_price: u128) -> Result<i32> {
    if !(MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&sqrt_price) {
        return Err(ArithmeticError::SqrtPriceOutOfBounds(sqrt_price).into());
    }

    let (mut low, mut high) = (MIN_TICK_INDEX, MAX_TICK_INDEX);
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if sqrt_price_from_tick_index(mid)? <= sqrt_price {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}
