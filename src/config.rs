// src/config.rs

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use log::{info, warn};
use solana_program::{pubkey, pubkey::Pubkey};
use solana_sdk::commitment_config::CommitmentConfig;

// Программы
pub const WHIRLPOOL_PROGRAM_ID: Pubkey = pubkey!("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc");
pub const TOKEN_PROGRAM_ID: Pubkey = spl_token::ID;
pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
pub const MEMO_PROGRAM_ID: Pubkey = pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

pub const WSOL_MINT: Pubkey = spl_token::native_mint::ID;
pub const USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

// Сиды PDA
pub const TICK_ARRAY_SEED: &[u8] = b"tick_array";
pub const ORACLE_SEED: &[u8] = b"oracle";

// Дискриминаторы аккаунтов и инструкций Whirlpool
pub const WHIRLPOOL_DISCRIMINATOR: [u8; 8] = [63, 149, 209, 12, 225, 128, 99, 9];
pub const TICK_ARRAY_DISCRIMINATOR: [u8; 8] = [69, 97, 189, 190, 110, 7, 66, 187];
pub const SWAP_V2_DISCRIMINATOR: [u8; 8] = [43, 4, 237, 11, 26, 201, 30, 98];

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount_in: u64,
    pub slippage_bps: u16,
    pub user: Option<Pubkey>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: CommitmentConfig::confirmed(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            input_mint: WSOL_MINT,
            output_mint: USDC_MINT,
            amount_in: 1_000_000,
            slippage_bps: 100,
            user: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let rpc_url = env::var("RPC_URL").unwrap_or(defaults.rpc_url);
        let commitment = env_or("RPC_COMMITMENT", defaults.commitment);
        let request_timeout =
            Duration::from_secs(env_or("RPC_TIMEOUT_SECS", defaults.request_timeout.as_secs()));
        let max_retries = env_or("RPC_MAX_RETRIES", defaults.max_retries);
        let retry_base_delay = Duration::from_millis(env_or(
            "RPC_RETRY_BASE_MS",
            defaults.retry_base_delay.as_millis() as u64,
        ));
        let input_mint = env_or("INPUT_MINT", defaults.input_mint);
        let output_mint = env_or("OUTPUT_MINT", defaults.output_mint);
        let amount_in = env_or("AMOUNT_IN", defaults.amount_in);
        let slippage_bps = env_or("SLIPPAGE_BPS", defaults.slippage_bps).min(10_000);
        let user = env::var("USER_PUBKEY")
            .ok()
            .and_then(|raw| match Pubkey::from_str(raw.trim()) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("USER_PUBKEY={} не является адресом: {}", raw, e);
                    None
                }
            });

        Self {
            rpc_url,
            commitment,
            request_timeout,
            max_retries,
            retry_base_delay,
            input_mint,
            output_mint,
            amount_in,
            slippage_bps,
            user,
        }
    }

    // Минимальный выход с учетом проскальзывания
    pub fn min_amount_out(&self, amount_out: u64) -> u64 {
        let bps = 10_000u128 - self.slippage_bps.min(10_000) as u128;
        (amount_out as u128 * bps / 10_000) as u64
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!("Некорректное значение {}={}: {}, используем {:?}", key, raw, e, default);
                default
            }
        },
        Err(_) => default,
    }
}

pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        // .env необязателен
        dotenv::dotenv().ok();
        let config = Config::from_env();
        info!("Конфиг загружен, RPC: {}", config.rpc_url);
        config
    })
}
