// src/error.rs

use solana_program::pubkey::Pubkey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("address derivation failed for {label} seeds of {base}")]
    AddressDerivationFailed { label: &'static str, base: Pubkey },

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("no eligible pool for {token_in} -> {token_out}")]
    NoEligiblePool { token_in: Pubkey, token_out: Pubkey },
}

impl Error {
    // Пул не подходит по своим данным, а не из-за сбоя расчета или сети
    pub fn is_pool_ineligible(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Decode(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(e) if e.retryable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("buffer too short for {account}: expected {expected} bytes, got {actual}")]
    BufferTooShort {
        account: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid {account} discriminator")]
    InvalidDiscriminator { account: &'static str },

    #[error("tick array {address} does not match: expected start {expected_start} of {expected_pool}")]
    UnexpectedTickArray {
        address: Pubkey,
        expected_pool: Pubkey,
        expected_start: i32,
    },

    #[error("unknown account field {0:?}")]
    UnknownField(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mint {mint} is not traded by pool {pool}")]
    UnknownMint { mint: Pubkey, pool: Pubkey },

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("amount {0} does not fit into u64")]
    AmountOutOfRange(i128),

    #[error("pool {0} has zero liquidity")]
    ZeroLiquidity(Pubkey),

    #[error("pool {0} has zero sqrt price")]
    ZeroPrice(Pubkey),

    #[error("pool {0} has zero tick spacing")]
    ZeroTickSpacing(Pubkey),

    #[error("pool {0} has an unset token mint")]
    InvalidPoolMints(Pubkey),

    #[error("sqrt price limit {limit} is invalid for current price {current}")]
    InvalidSqrtPriceLimit { limit: u128, current: u128 },

    #[error("swap runs past the loaded tick arrays at tick {0}")]
    TickSequenceExhausted(i32),

    #[error("tick array start {0} is outside the bitmap extension range")]
    TickArrayOutOfRange(i32),

    #[error("pool account {0} not found")]
    PoolNotFound(Pubkey),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid price bounds {lower}..{upper}")]
    InvalidPriceBounds { lower: u128, upper: u128 },

    #[error("sqrt price {0} is out of bounds")]
    SqrtPriceOutOfBounds(u128),

    #[error("tick index {0} is out of bounds")]
    TickOutOfBounds(i32),

    #[error("swap produced a zero amount")]
    DegenerateQuote,

    #[error("swap step made no progress at sqrt price {0}")]
    NoLiquidityProgress(u128),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rpc {operation} failed: {message}")]
pub struct TransportError {
    pub operation: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl TransportError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        let retryable = is_retryable_message(&message);
        Self {
            operation,
            message,
            retryable,
        }
    }
}

// Признаки лимитов и таймаутов в ответах RPC
pub fn is_retryable_message(message: &str) -> bool {
    let message = message.to_lowercase();
    [
        "too many requests",
        "rate limit",
        "429",
        "quota exceeded",
        "timeout",
        "timed out",
        "connection reset",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}
