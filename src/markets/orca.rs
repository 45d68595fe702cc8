// src/markets/orca.rs

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use solana_program::pubkey::Pubkey;

use super::whirlpool::WhirlpoolPool;
use super::{Pool, Protocol, ProtocolName};
use crate::config::{WHIRLPOOL_DISCRIMINATOR, WHIRLPOOL_PROGRAM_ID};
use crate::data::TokenPair;
use crate::decoder::{WhirlpoolField, WHIRLPOOL_ACCOUNT_SIZE};
use crate::error::{Result, ValidationError};
use crate::rpc::{AccountFilter, AccountSource};

// Адаптер программы Orca Whirlpool
#[derive(Debug, Clone)]
pub struct OrcaWhirlpoolProtocol {
    program_id: Pubkey,
}

impl Default for OrcaWhirlpoolProtocol {
    fn default() -> Self {
        Self::new(WHIRLPOOL_PROGRAM_ID)
    }
}

impl OrcaWhirlpoolProtocol {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    // Фильтры getProgramAccounts: тип аккаунта, размер и оба минта
    pub fn pair_filters(pair: &TokenPair) -> Vec<AccountFilter> {
        vec![
            AccountFilter::Memcmp {
                offset: WhirlpoolField::Discriminator.offset(),
                bytes: WHIRLPOOL_DISCRIMINATOR.to_vec(),
            },
            AccountFilter::DataSize(WHIRLPOOL_ACCOUNT_SIZE as u64),
            AccountFilter::Memcmp {
                offset: WhirlpoolField::TokenMintA.offset(),
                bytes: pair.token_a.to_bytes().to_vec(),
            },
            AccountFilter::Memcmp {
                offset: WhirlpoolField::TokenMintB.offset(),
                bytes: pair.token_b.to_bytes().to_vec(),
            },
        ]
    }

    async fn search_direction(&self, source: &dyn AccountSource, pair: &TokenPair) -> Result<Vec<WhirlpoolPool>> {
        let accounts = source
            .search_accounts(&self.program_id, &Self::pair_filters(pair))
            .await?;
        debug!("Найдено {} аккаунтов Whirlpool для {}", accounts.len(), pair);

        // битый аккаунт пропускаем, остальные пулы остаются
        Ok(accounts
            .into_iter()
            .filter_map(|(address, account)| match WhirlpoolPool::decode(address, &account.data) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("Не удалось декодировать пул {}: {}", address, e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl Protocol for OrcaWhirlpoolProtocol {
    fn name(&self) -> ProtocolName {
        ProtocolName::OrcaWhirlpool
    }

    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn fetch_pools_by_pair(&self, source: &dyn AccountSource, pair: &TokenPair) -> Result<Vec<Arc<dyn Pool>>> {
        let reversed = pair.reversed();
        let (forward, backward) = futures::try_join!(
            self.search_direction(source, pair),
            self.search_direction(source, &reversed)
        )?;

        let pools: Vec<Arc<dyn Pool>> = forward
            .into_iter()
            .chain(backward)
            .map(|pool| Arc::new(pool) as Arc<dyn Pool>)
            .collect();
        info!("{}: {} пулов для пары {}", self.name(), pools.len(), pair);
        Ok(pools)
    }

    async fn fetch_pool_by_id(&self, source: &dyn AccountSource, id: &Pubkey) -> Result<Arc<dyn Pool>> {
        let account = source
            .fetch_account(id)
            .await?
            .ok_or(ValidationError::PoolNotFound(*id))?;
        Ok(Arc::new(WhirlpoolPool::decode(*id, &account.data)?))
    }
}
