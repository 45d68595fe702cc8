// src/markets/mod.rs

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;

use crate::data::{Quote, TokenPair};
use crate::error::Result;
use crate::rpc::AccountSource;

pub mod instruction;
pub mod orca;
pub mod swap;
pub mod tick_array;
pub mod tick_array_bitmap;
pub mod whirlpool;

#[cfg(test)]
pub(crate) mod orca_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolName {
    OrcaWhirlpool,
}

impl fmt::Display for ProtocolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolName::OrcaWhirlpool => write!(f, "Orca (Whirlpools)"),
        }
    }
}

/// Пул одного протокола со своим декодированным состоянием.
///
/// `amount` в `quote` со знаком: положительный это точный вход,
/// отрицательный это точный выход.
#[async_trait]
pub trait Pool: Send + Sync + fmt::Debug {
    fn id(&self) -> Pubkey;

    fn protocol(&self) -> ProtocolName;

    fn program_id(&self) -> Pubkey;

    fn tokens(&self) -> TokenPair;

    async fn quote(&self, source: &dyn AccountSource, input_mint: &Pubkey, amount: i128) -> Result<Quote>;

    async fn build_swap_instructions(
        &self,
        source: &dyn AccountSource,
        user: &Pubkey,
        input_mint: &Pubkey,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<Vec<Instruction>>;
}

// Поиск пулов протокола по паре токенов
#[async_trait]
pub trait Protocol: Send + Sync {
    fn name(&self) -> ProtocolName;

    fn program_id(&self) -> Pubkey;

    // Пулы пары в обоих направлениях (A/B и B/A)
    async fn fetch_pools_by_pair(&self, source: &dyn AccountSource, pair: &TokenPair) -> Result<Vec<Arc<dyn Pool>>>;

    async fn fetch_pool_by_id(&self, source: &dyn AccountSource, id: &Pubkey) -> Result<Arc<dyn Pool>>;
}
