// src/markets/instruction.rs

use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;

use crate::config::{MEMO_PROGRAM_ID, SWAP_V2_DISCRIMINATOR, WHIRLPOOL_PROGRAM_ID};
use crate::decoder::Whirlpool;
use crate::error::{Result, ValidationError};
use crate::math::{MAX_SQRT_PRICE, MIN_SQRT_PRICE};
use crate::pda::{oracle_address, swap_tick_array_addresses};

pub const SWAP_V2_DATA_LEN: usize = 8 + 8 + 8 + 16 + 1 + 1 + 1;
pub const SWAP_V2_ACCOUNTS_LEN: usize = 15;

// Аккаунты swapV2 в порядке программы
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapV2Accounts {
    pub token_program_a: Pubkey,
    pub token_program_b: Pubkey,
    pub memo_program: Pubkey,
    pub token_authority: Pubkey,
    pub whirlpool: Pubkey,
    pub token_mint_a: Pubkey,
    pub token_mint_b: Pubkey,
    pub token_owner_account_a: Pubkey,
    pub token_vault_a: Pubkey,
    pub token_owner_account_b: Pubkey,
    pub token_vault_b: Pubkey,
    pub tick_arrays: [Pubkey; 3],
    pub oracle: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapV2Args {
    pub amount: u64,
    pub other_amount_threshold: u64,
    pub sqrt_price_limit: u128,
    pub amount_specified_is_input: bool,
    pub a_to_b: bool,
}

impl SwapV2Args {
    pub fn data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(SWAP_V2_DATA_LEN);
        data.extend_from_slice(&SWAP_V2_DISCRIMINATOR);
        data.extend_from_slice(&self.amount.to_le_bytes());
        data.extend_from_slice(&self.other_amount_threshold.to_le_bytes());
        data.extend_from_slice(&self.sqrt_price_limit.to_le_bytes());
        data.push(self.amount_specified_is_input as u8);
        data.push(self.a_to_b as u8);
        // remaining_accounts_info: None
        data.push(0);
        data
    }
}

impl SwapV2Accounts {
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        let [tick_array_0, tick_array_1, tick_array_2] = self.tick_arrays;
        vec![
            AccountMeta::new_readonly(self.token_program_a, false),
            AccountMeta::new_readonly(self.token_program_b, false),
            AccountMeta::new_readonly(self.memo_program, false),
            AccountMeta::new_readonly(self.token_authority, true),
            AccountMeta::new(self.whirlpool, false),
            AccountMeta::new_readonly(self.token_mint_a, false),
            AccountMeta::new_readonly(self.token_mint_b, false),
            AccountMeta::new(self.token_owner_account_a, false),
            AccountMeta::new(self.token_vault_a, false),
            AccountMeta::new(self.token_owner_account_b, false),
            AccountMeta::new(self.token_vault_b, false),
            AccountMeta::new(tick_array_0, false),
            AccountMeta::new(tick_array_1, false),
            AccountMeta::new(tick_array_2, false),
            AccountMeta::new(self.oracle, false),
        ]
    }
}

pub fn swap_v2(accounts: &SwapV2Accounts, args: &SwapV2Args) -> Instruction {
    Instruction {
        program_id: WHIRLPOOL_PROGRAM_ID,
        accounts: accounts.to_account_metas(),
        data: args.data(),
    }
}

// Направление свопа по входному минту
pub fn resolve_direction(whirlpool: &Whirlpool, input_mint: &Pubkey) -> Result<bool> {
    if *input_mint == whirlpool.token_mint_a {
        Ok(true)
    } else if *input_mint == whirlpool.token_mint_b {
        Ok(false)
    } else {
        Err(ValidationError::UnknownMint {
            mint: *input_mint,
            pool: whirlpool.address,
        }
        .into())
    }
}

/// Собирает swapV2 с точным входом для пользователя `user`.
///
/// `token_programs` задает программу токена для сторон A и B, от нее
/// зависят адреса ATA пользователя. Лимит цены ставится на границу
/// диапазона, защита от проскальзывания идет через `min_amount_out`.
pub fn build_swap_instruction(
    whirlpool: &Whirlpool,
    user: &Pubkey,
    input_mint: &Pubkey,
    amount_in: u64,
    min_amount_out: u64,
    token_programs: [Pubkey; 2],
) -> Result<Instruction> {
    let a_to_b = resolve_direction(whirlpool, input_mint)?;
    let [token_program_a, token_program_b] = token_programs;

    let accounts = SwapV2Accounts {
        token_program_a,
        token_program_b,
        memo_program: MEMO_PROGRAM_ID,
        token_authority: *user,
        whirlpool: whirlpool.address,
        token_mint_a: whirlpool.token_mint_a,
        token_mint_b: whirlpool.token_mint_b,
        token_owner_account_a: get_associated_token_address_with_program_id(
            user,
            &whirlpool.token_mint_a,
            &token_program_a,
        ),
        token_vault_a: whirlpool.token_vault_a,
        token_owner_account_b: get_associated_token_address_with_program_id(
            user,
            &whirlpool.token_mint_b,
            &token_program_b,
        ),
        token_vault_b: whirlpool.token_vault_b,
        tick_arrays: swap_tick_array_addresses(
            &whirlpool.address,
            whirlpool.tick_current_index,
            whirlpool.tick_spacing,
            a_to_b,
        )?,
        oracle: oracle_address(&whirlpool.address)?,
    };

    let args = SwapV2Args {
        amount: amount_in,
        other_amount_threshold: min_amount_out,
        sqrt_price_limit: if a_to_b { MIN_SQRT_PRICE } else { MAX_SQRT_PRICE },
        amount_specified_is_input: true,
        a_to_b,
    };

    Ok(swap_v2(&accounts, &args))
}
