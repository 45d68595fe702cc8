// src/markets/whirlpool.rs

use async_trait::async_trait;
use log::{debug, warn};
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use super::instruction::{build_swap_instruction, resolve_direction};
use super::swap::{compute_swap, SwapOutcome, SwapParams};
use super::tick_array::{TickArray, TickArraySequence};
use super::tick_array_bitmap::TickArrayBitmapExtension;
use super::{Pool, ProtocolName};
use crate::config::{TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID, WHIRLPOOL_PROGRAM_ID};
use crate::data::{Quote, TokenPair};
use crate::decoder::{decode_whirlpool, Whirlpool};
use crate::error::{DecodeError, Result, ValidationError};
use crate::pda::{swap_tick_array_start_indexes, tick_array_address};
use crate::rpc::AccountSource;

/// Пул Orca Whirlpool: снимок аккаунта и, если есть, битмап окон тиков.
#[derive(Debug, Clone)]
pub struct WhirlpoolPool {
    state: Whirlpool,
    bitmap_extension: Option<TickArrayBitmapExtension>,
}

impl WhirlpoolPool {
    pub fn new(state: Whirlpool) -> Self {
        Self {
            state,
            bitmap_extension: None,
        }
    }

    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self> {
        Ok(Self::new(decode_whirlpool(data)?.with_address(address)))
    }

    pub fn with_bitmap_extension(mut self, extension: TickArrayBitmapExtension) -> Self {
        self.bitmap_extension = Some(extension);
        self
    }

    pub fn state(&self) -> &Whirlpool {
        &self.state
    }

    // Проверки состояния пула, после которых его можно котировать
    pub fn validate(&self) -> Result<()> {
        let state = &self.state;
        if state.tick_spacing == 0 {
            return Err(ValidationError::ZeroTickSpacing(state.address).into());
        }
        if state.token_mint_a == Pubkey::default()
            || state.token_mint_b == Pubkey::default()
            || state.token_mint_a == state.token_mint_b
        {
            return Err(ValidationError::InvalidPoolMints(state.address).into());
        }
        if state.liquidity == 0 {
            return Err(ValidationError::ZeroLiquidity(state.address).into());
        }
        if state.sqrt_price == 0 {
            return Err(ValidationError::ZeroPrice(state.address).into());
        }
        Ok(())
    }

    // Загружает три окна, по которым пойдет своп. Несозданные окна пустые.
    pub async fn load_tick_arrays(&self, source: &dyn AccountSource, a_to_b: bool) -> Result<TickArraySequence> {
        let state = &self.state;
        let starts = swap_tick_array_start_indexes(state.tick_current_index, state.tick_spacing, a_to_b);

        let mut wanted = Vec::with_capacity(starts.len());
        let mut arrays = Vec::with_capacity(starts.len());
        for start in starts {
            let skip = self
                .bitmap_extension
                .as_ref()
                .map(|extension| !extension.should_fetch(start, state.tick_spacing))
                .unwrap_or(false);
            if skip {
                debug!("Окно {} пула {} не инициализировано по битмапу", start, state.address);
                arrays.push(TickArray::empty(state.address, start));
            } else {
                wanted.push((start, tick_array_address(&state.address, start)?));
            }
        }

        let addresses: Vec<Pubkey> = wanted.iter().map(|(_, address)| *address).collect();
        let accounts = source.fetch_multiple(&addresses).await?;

        for ((start, address), account) in wanted.into_iter().zip(accounts) {
            let array = match account {
                Some(account) => TickArray::decode(&account.data)?,
                None => TickArray::empty(state.address, start),
            };
            if array.whirlpool != state.address || array.start_tick_index != start {
                return Err(DecodeError::UnexpectedTickArray {
                    address,
                    expected_pool: state.address,
                    expected_start: start,
                }
                .into());
            }
            arrays.push(array);
        }

        TickArraySequence::new(arrays, state.tick_spacing)
    }

    // Котировка по уже загруженным окнам, без обращения к сети
    pub fn quote_with_tick_arrays(
        &self,
        sequence: &TickArraySequence,
        input_mint: &Pubkey,
        amount: i128,
        sqrt_price_limit: Option<u128>,
    ) -> Result<Quote> {
        let (a_to_b, params) = self.swap_params(input_mint, amount, sqrt_price_limit)?;
        let outcome = compute_swap(&self.state, sequence, &params)?;
        Ok(self.to_quote(input_mint, a_to_b, &params, &outcome))
    }

    fn swap_params(
        &self,
        input_mint: &Pubkey,
        amount: i128,
        sqrt_price_limit: Option<u128>,
    ) -> Result<(bool, SwapParams)> {
        let a_to_b = resolve_direction(&self.state, input_mint)?;
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        let magnitude =
            u64::try_from(amount.unsigned_abs()).map_err(|_| ValidationError::AmountOutOfRange(amount))?;
        self.validate()?;

        Ok((
            a_to_b,
            SwapParams {
                amount: magnitude,
                sqrt_price_limit,
                a_to_b,
                amount_specified_is_input: amount > 0,
            },
        ))
    }

    fn to_quote(&self, input_mint: &Pubkey, a_to_b: bool, params: &SwapParams, outcome: &SwapOutcome) -> Quote {
        let output_mint = if a_to_b {
            self.state.token_mint_b
        } else {
            self.state.token_mint_a
        };
        let amount = if params.amount_specified_is_input {
            -(outcome.amount_out as i128)
        } else {
            outcome.amount_in as i128 + outcome.fee_amount as i128
        };
        Quote {
            pool: self.state.address,
            input_mint: *input_mint,
            output_mint,
            amount,
            amount_in: outcome.amount_in,
            amount_out: outcome.amount_out,
            fee_amount: outcome.fee_amount,
            sqrt_price: outcome.sqrt_price,
            tick_current_index: outcome.tick_current_index,
        }
    }

    // Программа токена по владельцу аккаунта минта, по умолчанию SPL Token
    async fn token_programs(&self, source: &dyn AccountSource) -> Result<[Pubkey; 2]> {
        let mints = [self.state.token_mint_a, self.state.token_mint_b];
        let accounts = source.fetch_multiple(&mints).await?;
        let mut programs = [TOKEN_PROGRAM_ID; 2];
        for (program, account) in programs.iter_mut().zip(accounts) {
            match account {
                Some(account) if account.owner == TOKEN_2022_PROGRAM_ID => *program = TOKEN_2022_PROGRAM_ID,
                Some(_) => {}
                None => warn!("Минт пула {} не найден, используем SPL Token", self.state.address),
            }
        }
        Ok(programs)
    }
}

#[async_trait]
impl Pool for WhirlpoolPool {
    fn id(&self) -> Pubkey {
        self.state.address
    }

    fn protocol(&self) -> ProtocolName {
        ProtocolName::OrcaWhirlpool
    }

    fn program_id(&self) -> Pubkey {
        WHIRLPOOL_PROGRAM_ID
    }

    fn tokens(&self) -> TokenPair {
        TokenPair::new(self.state.token_mint_a, self.state.token_mint_b)
    }

    async fn quote(&self, source: &dyn AccountSource, input_mint: &Pubkey, amount: i128) -> Result<Quote> {
        // проверки до сетевых запросов
        let (a_to_b, _) = self.swap_params(input_mint, amount, None)?;
        let sequence = self.load_tick_arrays(source, a_to_b).await?;
        let quote = self.quote_with_tick_arrays(&sequence, input_mint, amount, None)?;
        debug!(
            "Котировка пула {}: вход {}, выход {}, комиссия {}",
            self.state.address, quote.amount_in, quote.amount_out, quote.fee_amount
        );
        Ok(quote)
    }

    async fn build_swap_instructions(
        &self,
        source: &dyn AccountSource,
        user: &Pubkey,
        input_mint: &Pubkey,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<Vec<Instruction>> {
        resolve_direction(&self.state, input_mint)?;
        if amount_in == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }

        let token_programs = self.token_programs(source).await?;
        let mints = [self.state.token_mint_a, self.state.token_mint_b];
        let owner_accounts: Vec<Pubkey> = mints
            .iter()
            .zip(token_programs.iter())
            .map(|(mint, program)| get_associated_token_address_with_program_id(user, mint, program))
            .collect();
        let existing = source.fetch_multiple(&owner_accounts).await?;

        let mut instructions = Vec::with_capacity(3);
        for ((mint, program), account) in mints.iter().zip(token_programs.iter()).zip(existing) {
            if account.is_none() {
                debug!("Создаем ATA пользователя {} для минта {}", user, mint);
                instructions.push(create_associated_token_account_idempotent(user, user, mint, program));
            }
        }
        instructions.push(build_swap_instruction(
            &self.state,
            user,
            input_mint,
            amount_in,
            min_amount_out,
            token_programs,
        )?);
        Ok(instructions)
    }
}
