// src/math/big_num.rs
// 256-битные числа для промежуточных произведений

use uint::construct_uint;

// Result не импортируем: макрос uint разворачивается в код с Result<T, E>
use crate::error::ArithmeticError;

construct_uint! {
    pub struct U256(4);
}

impl U256 {
    pub const fn q64() -> U256 {
        U256([0, 1, 0, 0])
    }

    // Сужение обратно в u128 без молчаливого обрезания
    pub fn try_into_u128(self) -> crate::error::Result<u128> {
        if self.bits() > 128 {
            return Err(ArithmeticError::ArithmeticOverflow.into());
        }
        Ok(self.low_u128())
    }

    pub fn try_into_u64(self) -> crate::error::Result<u64> {
        if self.bits() > 64 {
            return Err(ArithmeticError::ArithmeticOverflow.into());
        }
        Ok(self.low_u64())
    }
}
