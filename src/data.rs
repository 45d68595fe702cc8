// src/data.rs

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use solana_program::pubkey::Pubkey;

use crate::markets::{Pool, ProtocolName};

// Адреса в JSON выводим строкой base58
fn pubkey_string<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

// Структура для хранения пары токенов
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct TokenPair {
    #[serde(serialize_with = "pubkey_string")]
    pub token_a: Pubkey,
    #[serde(serialize_with = "pubkey_string")]
    pub token_b: Pubkey,
}

impl TokenPair {
    pub fn new(token_a: Pubkey, token_b: Pubkey) -> Self {
        Self { token_a, token_b }
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.token_b, self.token_a)
    }

    pub fn contains(&self, mint: &Pubkey) -> bool {
        self.token_a == *mint || self.token_b == *mint
    }

    // Вторая сторона пары для `mint`
    pub fn other(&self, mint: &Pubkey) -> Option<Pubkey> {
        if *mint == self.token_a {
            Some(self.token_b)
        } else if *mint == self.token_b {
            Some(self.token_a)
        } else {
            None
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token_a, self.token_b)
    }
}

/// Котировка одного пула.
///
/// `amount` со знаком: при точном входе это `-amount_out` (сколько получит
/// пользователь), при точном выходе `amount_in + fee_amount` (сколько он
/// отдаст). Остальные поля без знака.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    #[serde(serialize_with = "pubkey_string")]
    pub pool: Pubkey,
    #[serde(serialize_with = "pubkey_string")]
    pub input_mint: Pubkey,
    #[serde(serialize_with = "pubkey_string")]
    pub output_mint: Pubkey,
    pub amount: i128,
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee_amount: u64,
    pub sqrt_price: u128,
    pub tick_current_index: i32,
}

impl Quote {
    pub fn is_exact_in(&self) -> bool {
        self.amount < 0
    }
}

// Лучший пул для одного запроса, не кэшируется
#[derive(Debug, Clone, Serialize)]
pub struct RouterResult {
    #[serde(skip)]
    pub pool: Arc<dyn Pool>,
    #[serde(serialize_with = "pubkey_string")]
    pub pool_id: Pubkey,
    pub protocol: ProtocolName,
    pub amount_out: u64,
    pub quote: Quote,
}

impl RouterResult {
    pub fn new(pool: Arc<dyn Pool>, quote: Quote) -> Self {
        Self {
            pool_id: pool.id(),
            protocol: pool.protocol(),
            amount_out: quote.amount_out,
            pool,
            quote,
        }
    }
}
