// src/rpc.rs

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, warn};
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_program::pubkey::Pubkey;
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;

use crate::config::Config;
use crate::error::{Result, TransportError};

// Лимит getMultipleAccounts на один запрос
pub const MULTIPLE_ACCOUNTS_CHUNK: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    DataSize(u64),
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl AccountFilter {
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::DataSize(size) => data.len() as u64 == *size,
            AccountFilter::Memcmp { offset, bytes } => data
                .get(*offset..offset + bytes.len())
                .map(|window| window == bytes.as_slice())
                .unwrap_or(false),
        }
    }
}

impl From<&AccountFilter> for RpcFilterType {
    fn from(filter: &AccountFilter) -> Self {
        match filter {
            AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
            AccountFilter::Memcmp { offset, bytes } => {
                RpcFilterType::Memcmp(Memcmp::new_raw_bytes(*offset, bytes.clone()))
            }
        }
    }
}

/// Источник аккаунтов. Отсутствующий аккаунт это `None`, а не ошибка.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Account>>;

    async fn fetch_multiple(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Account>>>;

    async fn search_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Account)>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
        }
    }

    // base · 2^attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// Повторяет `call`, пока ошибка помечена как повторяемая и не исчерпаны попытки.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "{} не удался ({}), повтор {}/{} через {:?}",
                    operation,
                    e,
                    attempt + 1,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    error!("{} не удался после {} повторов: {}", operation, attempt, e);
                }
                return Err(e);
            }
        }
    }
}

// Источник поверх JSON-RPC узла
pub struct RpcAccountSource {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
    retry: RetryPolicy,
}

impl RpcAccountSource {
    pub fn new(client: Arc<RpcClient>, commitment: CommitmentConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            commitment,
            retry,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            config.request_timeout,
            config.commitment,
        );
        Self::new(Arc::new(client), config.commitment, RetryPolicy::from_config(config))
    }

    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }
}

#[async_trait]
impl AccountSource for RpcAccountSource {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Account>> {
        retry_with_backoff(&self.retry, "getAccountInfo", || async move {
            self.client
                .get_account_with_commitment(address, self.commitment)
                .await
                .map(|response| response.value)
                .map_err(|e| TransportError::new("getAccountInfo", e.to_string()).into())
        })
        .await
    }

    async fn fetch_multiple(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        let mut accounts = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MULTIPLE_ACCOUNTS_CHUNK) {
            let fetched = retry_with_backoff(&self.retry, "getMultipleAccounts", || async move {
                self.client
                    .get_multiple_accounts_with_commitment(chunk, self.commitment)
                    .await
                    .map(|response| response.value)
                    .map_err(|e| TransportError::new("getMultipleAccounts", e.to_string()).into())
            })
            .await?;
            accounts.extend(fetched);
        }
        debug!("Получено {} аккаунтов", accounts.len());
        Ok(accounts)
    }

    async fn search_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Account)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters.iter().map(RpcFilterType::from).collect()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        let config = &config;
        retry_with_backoff(&self.retry, "getProgramAccounts", || async move {
            self.client
                .get_program_accounts_with_config(program_id, config.clone())
                .await
                .map_err(|e| TransportError::new("getProgramAccounts", e.to_string()).into())
        })
        .await
    }
}

/// Аккаунты в памяти: снимки состояния, офлайн-котировки и тесты.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountSource {
    accounts: Arc<RwLock<BTreeMap<Pubkey, Account>>>,
}

impl InMemoryAccountSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: Pubkey, account: Account) {
        self.write().insert(address, account);
    }

    // Аккаунт с данными `data`, принадлежащий программе `owner`
    pub fn insert_data(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.insert(
            address,
            Account {
                lamports: 1,
                data,
                owner,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    pub fn remove(&self, address: &Pubkey) -> Option<Account> {
        self.write().remove(address)
    }

    fn get(&self, address: &Pubkey) -> Option<Account> {
        self.read().get(address).cloned()
    }

    // Карта остается целой и после паники другого владельца блокировки
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Pubkey, Account>> {
        self.accounts.read().unwrap_or_else(|poisoned| {
            warn!("Блокировка аккаунтов в памяти отравлена, читаем как есть");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Pubkey, Account>> {
        self.accounts.write().unwrap_or_else(|poisoned| {
            warn!("Блокировка аккаунтов в памяти отравлена, пишем как есть");
            PoisonError::into_inner(poisoned)
        })
    }
}

#[async_trait]
impl AccountSource for InMemoryAccountSource {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Account>> {
        Ok(self.get(address))
    }

    async fn fetch_multiple(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        Ok(addresses.iter().map(|address| self.get(address)).collect())
    }

    async fn search_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Account)>> {
        let accounts = self.read();
        Ok(accounts
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .filter(|(_, account)| filters.iter().all(|filter| filter.matches(&account.data)))
            .map(|(address, account)| (*address, account.clone()))
            .collect())
    }
}
