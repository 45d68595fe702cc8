// src/decoder.rs

use std::str::FromStr;

use log::debug;
use solana_program::pubkey::Pubkey;

use crate::config::WHIRLPOOL_DISCRIMINATOR;
use crate::error::{DecodeError, Result};

pub const WHIRLPOOL_ACCOUNT_SIZE: usize = 653;
pub const NUM_REWARDS: usize = 3;

const REWARD_INFO_SIZE: usize = 32 + 32 + 32 + 16 + 16;

// Поля аккаунта Whirlpool. Смещения считаются от начала данных
// аккаунта вместе с дискриминатором и используются в memcmp-фильтрах.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhirlpoolField {
    Discriminator,
    WhirlpoolsConfig,
    WhirlpoolBump,
    TickSpacing,
    FeeTierIndexSeed,
    FeeRate,
    ProtocolFeeRate,
    Liquidity,
    SqrtPrice,
    TickCurrentIndex,
    ProtocolFeeOwedA,
    ProtocolFeeOwedB,
    TokenMintA,
    TokenVaultA,
    FeeGrowthGlobalA,
    TokenMintB,
    TokenVaultB,
    FeeGrowthGlobalB,
    RewardLastUpdatedTimestamp,
    RewardInfos,
}

impl WhirlpoolField {
    pub const ALL: [WhirlpoolField; 20] = [
        WhirlpoolField::Discriminator,
        WhirlpoolField::WhirlpoolsConfig,
        WhirlpoolField::WhirlpoolBump,
        WhirlpoolField::TickSpacing,
        WhirlpoolField::FeeTierIndexSeed,
        WhirlpoolField::FeeRate,
        WhirlpoolField::ProtocolFeeRate,
        WhirlpoolField::Liquidity,
        WhirlpoolField::SqrtPrice,
        WhirlpoolField::TickCurrentIndex,
        WhirlpoolField::ProtocolFeeOwedA,
        WhirlpoolField::ProtocolFeeOwedB,
        WhirlpoolField::TokenMintA,
        WhirlpoolField::TokenVaultA,
        WhirlpoolField::FeeGrowthGlobalA,
        WhirlpoolField::TokenMintB,
        WhirlpoolField::TokenVaultB,
        WhirlpoolField::FeeGrowthGlobalB,
        WhirlpoolField::RewardLastUpdatedTimestamp,
        WhirlpoolField::RewardInfos,
    ];

    pub const fn size(self) -> usize {
        match self {
            WhirlpoolField::Discriminator => 8,
            WhirlpoolField::WhirlpoolsConfig => 32,
            WhirlpoolField::WhirlpoolBump => 1,
            WhirlpoolField::TickSpacing => 2,
            WhirlpoolField::FeeTierIndexSeed => 2,
            WhirlpoolField::FeeRate => 2,
            WhirlpoolField::ProtocolFeeRate => 2,
            WhirlpoolField::Liquidity => 16,
            WhirlpoolField::SqrtPrice => 16,
            WhirlpoolField::TickCurrentIndex => 4,
            WhirlpoolField::ProtocolFeeOwedA => 8,
            WhirlpoolField::ProtocolFeeOwedB => 8,
            WhirlpoolField::TokenMintA => 32,
            WhirlpoolField::TokenVaultA => 32,
            WhirlpoolField::FeeGrowthGlobalA => 16,
            WhirlpoolField::TokenMintB => 32,
            WhirlpoolField::TokenVaultB => 32,
            WhirlpoolField::FeeGrowthGlobalB => 16,
            WhirlpoolField::RewardLastUpdatedTimestamp => 8,
            WhirlpoolField::RewardInfos => NUM_REWARDS * REWARD_INFO_SIZE,
        }
    }

    pub const fn offset(self) -> usize {
        match self {
            WhirlpoolField::Discriminator => 0,
            WhirlpoolField::WhirlpoolsConfig => 8,
            WhirlpoolField::WhirlpoolBump => 40,
            WhirlpoolField::TickSpacing => 41,
            WhirlpoolField::FeeTierIndexSeed => 43,
            WhirlpoolField::FeeRate => 45,
            WhirlpoolField::ProtocolFeeRate => 47,
            WhirlpoolField::Liquidity => 49,
            WhirlpoolField::SqrtPrice => 65,
            WhirlpoolField::TickCurrentIndex => 81,
            WhirlpoolField::ProtocolFeeOwedA => 85,
            WhirlpoolField::ProtocolFeeOwedB => 93,
            WhirlpoolField::TokenMintA => 101,
            WhirlpoolField::TokenVaultA => 133,
            WhirlpoolField::FeeGrowthGlobalA => 165,
            WhirlpoolField::TokenMintB => 181,
            WhirlpoolField::TokenVaultB => 213,
            WhirlpoolField::FeeGrowthGlobalB => 245,
            WhirlpoolField::RewardLastUpdatedTimestamp => 261,
            WhirlpoolField::RewardInfos => 269,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            WhirlpoolField::Discriminator => "Discriminator",
            WhirlpoolField::WhirlpoolsConfig => "WhirlpoolsConfig",
            WhirlpoolField::WhirlpoolBump => "WhirlpoolBump",
            WhirlpoolField::TickSpacing => "TickSpacing",
            WhirlpoolField::FeeTierIndexSeed => "FeeTierIndexSeed",
            WhirlpoolField::FeeRate => "FeeRate",
            WhirlpoolField::ProtocolFeeRate => "ProtocolFeeRate",
            WhirlpoolField::Liquidity => "Liquidity",
            WhirlpoolField::SqrtPrice => "SqrtPrice",
            WhirlpoolField::TickCurrentIndex => "TickCurrentIndex",
            WhirlpoolField::ProtocolFeeOwedA => "ProtocolFeeOwedA",
            WhirlpoolField::ProtocolFeeOwedB => "ProtocolFeeOwedB",
            WhirlpoolField::TokenMintA => "TokenMintA",
            WhirlpoolField::TokenVaultA => "TokenVaultA",
            WhirlpoolField::FeeGrowthGlobalA => "FeeGrowthGlobalA",
            WhirlpoolField::TokenMintB => "TokenMintB",
            WhirlpoolField::TokenVaultB => "TokenVaultB",
            WhirlpoolField::FeeGrowthGlobalB => "FeeGrowthGlobalB",
            WhirlpoolField::RewardLastUpdatedTimestamp => "RewardLastUpdatedTimestamp",
            WhirlpoolField::RewardInfos => "RewardInfos",
        }
    }
}

impl FromStr for WhirlpoolField {
    type Err = DecodeError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        WhirlpoolField::ALL
            .into_iter()
            .find(|field| field.name() == name)
            .ok_or_else(|| DecodeError::UnknownField(name.to_string()))
    }
}

// Смещение поля по имени, для построения фильтров поиска аккаунтов
pub fn offset_of(field_name: &str) -> Result<usize> {
    Ok(field_name.parse::<WhirlpoolField>()?.offset())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhirlpoolRewardInfo {
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub authority: Pubkey,
    pub emissions_per_second_x64: u128,
    pub growth_global_x64: u128,
}

// Состояние пула Whirlpool
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Whirlpool {
    pub address: Pubkey,
    pub whirlpools_config: Pubkey,
    pub whirlpool_bump: u8,
    pub tick_spacing: u16,
    pub fee_tier_index_seed: [u8; 2],
    pub fee_rate: u16,
    pub protocol_fee_rate: u16,
    pub liquidity: u128,
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    pub protocol_fee_owed_a: u64,
    pub protocol_fee_owed_b: u64,
    pub token_mint_a: Pubkey,
    pub token_vault_a: Pubkey,
    pub fee_growth_global_a: u128,
    pub token_mint_b: Pubkey,
    pub token_vault_b: Pubkey,
    pub fee_growth_global_b: u128,
    pub reward_last_updated_timestamp: u64,
    pub reward_infos: [WhirlpoolRewardInfo; NUM_REWARDS],
}

impl Whirlpool {
    // Адрес не входит в данные аккаунта, его проставляет вызывающий код
    pub fn with_address(mut self, address: Pubkey) -> Self {
        self.address = address;
        self
    }
}

// Последовательное чтение полей фиксированной ширины
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    fn take<const N: usize>(&mut self) -> std::result::Result<[u8; N], DecodeError> {
        let bytes = self
            .data
            .get(self.offset..self.offset + N)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or(DecodeError::BufferTooShort {
                account: "account",
                expected: self.offset + N,
                actual: self.data.len(),
            })?;
        self.offset += N;
        Ok(bytes)
    }

    pub(crate) fn u8(&mut self) -> std::result::Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> std::result::Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub(crate) fn i32(&mut self) -> std::result::Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub(crate) fn u64(&mut self) -> std::result::Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    pub(crate) fn u128(&mut self) -> std::result::Result<u128, DecodeError> {
        Ok(u128::from_le_bytes(self.take()?))
    }

    pub(crate) fn pubkey(&mut self) -> std::result::Result<Pubkey, DecodeError> {
        Ok(Pubkey::new_from_array(self.take()?))
    }

    pub(crate) fn bytes<const N: usize>(&mut self) -> std::result::Result<[u8; N], DecodeError> {
        self.take()
    }
}

pub fn decode_whirlpool(data: &[u8]) -> Result<Whirlpool> {
    if data.len() < WHIRLPOOL_ACCOUNT_SIZE {
        return Err(DecodeError::BufferTooShort {
            account: "Whirlpool",
            expected: WHIRLPOOL_ACCOUNT_SIZE,
            actual: data.len(),
        }
        .into());
    }
    if data[..8] != WHIRLPOOL_DISCRIMINATOR {
        return Err(DecodeError::InvalidDiscriminator { account: "Whirlpool" }.into());
    }

    // Пропускаем дискриминатор
    let mut reader = ByteReader::new(data, WhirlpoolField::WhirlpoolsConfig.offset());

    let whirlpools_config = reader.pubkey()?;
    let whirlpool_bump = reader.u8()?;
    let tick_spacing = reader.u16()?;
    let fee_tier_index_seed = reader.bytes::<2>()?;
    let fee_rate = reader.u16()?;
    let protocol_fee_rate = reader.u16()?;
    let liquidity = reader.u128()?;
    let sqrt_price = reader.u128()?;
    let tick_current_index = reader.i32()?;
    let protocol_fee_owed_a = reader.u64()?;
    let protocol_fee_owed_b = reader.u64()?;
    let token_mint_a = reader.pubkey()?;
    let token_vault_a = reader.pubkey()?;
    let fee_growth_global_a = reader.u128()?;
    let token_mint_b = reader.pubkey()?;
    let token_vault_b = reader.pubkey()?;
    let fee_growth_global_b = reader.u128()?;
    let reward_last_updated_timestamp = reader.u64()?;

    let mut reward_infos = [WhirlpoolRewardInfo::default(); NUM_REWARDS];
    for reward_info in reward_infos.iter_mut() {
        reward_info.mint = reader.pubkey()?;
        reward_info.vault = reader.pubkey()?;
        reward_info.authority = reader.pubkey()?;
        reward_info.emissions_per_second_x64 = reader.u128()?;
        reward_info.growth_global_x64 = reader.u128()?;
    }
    debug_assert_eq!(reader.offset(), WHIRLPOOL_ACCOUNT_SIZE);

    debug!(
        "Decoded whirlpool: spacing={}, fee_rate={}, tick={}",
        tick_spacing, fee_rate, tick_current_index
    );

    Ok(Whirlpool {
        address: Pubkey::default(),
        whirlpools_config,
        whirlpool_bump,
        tick_spacing,
        fee_tier_index_seed,
        fee_rate,
        protocol_fee_rate,
        liquidity,
        sqrt_price,
        tick_current_index,
        protocol_fee_owed_a,
        protocol_fee_owed_b,
        token_mint_a,
        token_vault_a,
        fee_growth_global_a,
        token_mint_b,
        token_vault_b,
        fee_growth_global_b,
        reward_last_updated_timestamp,
        reward_infos,
    })
}

// Обратное кодирование: фикстуры и локальные источники аккаунтов
pub fn encode_whirlpool(pool: &Whirlpool) -> Vec<u8> {
    let mut data = Vec::with_capacity(WHIRLPOOL_ACCOUNT_SIZE);
    data.extend_from_slice(&WHIRLPOOL_DISCRIMINATOR);
    data.extend_from_slice(pool.whirlpools_config.as_ref());
    data.push(pool.whirlpool_bump);
    data.extend_from_slice(&pool.tick_spacing.to_le_bytes());
    data.extend_from_slice(&pool.fee_tier_index_seed);
    data.extend_from_slice(&pool.fee_rate.to_le_bytes());
    data.extend_from_slice(&pool.protocol_fee_rate.to_le_bytes());
    data.extend_from_slice(&pool.liquidity.to_le_bytes());
    data.extend_from_slice(&pool.sqrt_price.to_le_bytes());
    data.extend_from_slice(&pool.tick_current_index.to_le_bytes());
    data.extend_from_slice(&pool.protocol_fee_owed_a.to_le_bytes());
    data.extend_from_slice(&pool.protocol_fee_owed_b.to_le_bytes());
    data.extend_from_slice(pool.token_mint_a.as_ref());
    data.extend_from_slice(pool.token_vault_a.as_ref());
    data.extend_from_slice(&pool.fee_growth_global_a.to_le_bytes());
    data.extend_from_slice(pool.token_mint_b.as_ref());
    data.extend_from_slice(pool.token_vault_b.as_ref());
    data.extend_from_slice(&pool.fee_growth_global_b.to_le_bytes());
    data.extend_from_slice(&pool.reward_last_updated_timestamp.to_le_bytes());
    for reward in pool.reward_infos.iter() {
        data.extend_from_slice(reward.mint.as_ref());
        data.extend_from_slice(reward.vault.as_ref());
        data.extend_from_slice(reward.authority.as_ref());
        data.extend_from_slice(&reward.emissions_per_second_x64.to_le_bytes());
        data.extend_from_slice(&reward.growth_global_x64.to_le_bytes());
    }
    data
}
