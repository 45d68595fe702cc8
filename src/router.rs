// src/router.rs

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use log::{debug, info, warn};
use solana_program::pubkey::Pubkey;

use crate::data::{RouterResult, TokenPair};
use crate::error::{Error, Result, ValidationError};
use crate::markets::{Pool, Protocol};
use crate::rpc::AccountSource;

/// Выбор лучшего пула для прямого обмена по всем подключенным протоколам.
pub struct Router {
    source: Arc<dyn AccountSource>,
    protocols: Vec<Arc<dyn Protocol>>,
}

impl Router {
    pub fn new(source: Arc<dyn AccountSource>) -> Self {
        Self {
            source,
            protocols: Vec::new(),
        }
    }

    pub fn with_protocol(mut self, protocol: Arc<dyn Protocol>) -> Self {
        self.protocols.push(protocol);
        self
    }

    pub fn source(&self) -> &Arc<dyn AccountSource> {
        &self.source
    }

    // Пулы пары у всех протоколов. Повторы по адресу отбрасываются,
    // порядок обнаружения сохраняется.
    pub async fn query_all_pools(&self, token_a: &Pubkey, token_b: &Pubkey) -> Result<Vec<Arc<dyn Pool>>> {
        let pair = TokenPair::new(*token_a, *token_b);
        let source = self.source.as_ref();
        let per_protocol = try_join_all(
            self.protocols
                .iter()
                .map(|protocol| protocol.fetch_pools_by_pair(source, &pair)),
        )
        .await?;

        let mut seen = HashSet::new();
        let pools: Vec<Arc<dyn Pool>> = per_protocol
            .into_iter()
            .flatten()
            .filter(|pool| seen.insert(pool.id()))
            .collect();
        info!("Найдено {} пулов для пары {}", pools.len(), pair);
        Ok(pools)
    }

    /// Котирует все пулы пары и берет максимальный выход.
    ///
    /// Пул, котировка которого завершилась любой ошибкой, пропускается.
    /// Ошибкой маршрута бывают только сбой поиска пулов и отсутствие
    /// подходящего пула. При равном выходе выигрывает пул, найденный раньше.
    pub async fn get_best_pool(&self, token_in: &Pubkey, token_out: &Pubkey, amount_in: u64) -> Result<RouterResult> {
        if amount_in == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        let pools = self.query_all_pools(token_in, token_out).await?;

        let source = self.source.as_ref();
        let quotes = join_all(
            pools
                .iter()
                .map(|pool| pool.quote(source, token_in, amount_in as i128)),
        )
        .await;

        let mut best: Option<RouterResult> = None;
        for (pool, quote) in pools.iter().zip(quotes) {
            match quote {
                Ok(quote) => {
                    debug!("Пул {} дает {}", pool.id(), quote.amount_out);
                    let better = best
                        .as_ref()
                        .map(|current| quote.amount_out > current.amount_out)
                        .unwrap_or(true);
                    if better {
                        best = Some(RouterResult::new(Arc::clone(pool), quote));
                    }
                }
                Err(e) if e.is_pool_ineligible() => {
                    warn!("Пул {} пропущен: {}", pool.id(), e);
                }
                Err(e) => {
                    warn!("Пул {} пропущен из-за сбоя котировки: {}", pool.id(), e);
                }
            }
        }

        let best = best.ok_or(Error::NoEligiblePool {
            token_in: *token_in,
            token_out: *token_out,
        })?;
        info!(
            "Лучший пул {} ({}): {} -> {}",
            best.pool_id, best.protocol, amount_in, best.amount_out
        );
        Ok(best)
    }
}
