// src/math/mod.rs

pub mod big_num;
pub mod full_math;
pub mod sqrt_price_math;
pub mod swap_math;
pub mod tick_math;

pub use full_math::{mul_div_ceil, mul_div_floor};
pub use sqrt_price_math::{
    next_sqrt_price_from_input, next_sqrt_price_from_output, token_amount_a_from_liquidity,
    token_amount_b_from_liquidity,
};
pub use swap_math::{compute_swap_step, SwapStep};
pub use tick_math::{sqrt_price_from_tick_index, tick_index_from_sqrt_price};

// Границы цены в формате Q64.64, совпадают с программой Whirlpool
pub const MIN_SQRT_PRICE: u128 = 4_295_048_016;
pub const MAX_SQRT_PRICE: u128 = 79_226_673_515_401_279_992_447_579_055;

pub const MIN_TICK_INDEX: i32 = -443_636;
pub const MAX_TICK_INDEX: i32 = 443_636;

// fee_rate хранится в миллионных долях, protocol_fee_rate в базисных пунктах
pub const FEE_RATE_DENOMINATOR: u32 = 1_000_000;
pub const PROTOCOL_FEE_RATE_DENOMINATOR: u16 = 10_000;

pub const Q64_RESOLUTION: u32 = 64;
