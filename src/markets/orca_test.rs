// src/markets/orca_test.rs

// Общий тестовый пул: цена 1.0 (sqrt 2^64), тик 0, шаг 64, комиссия 0.3%.
// Позиции по 5e11 в диапазонах [-2560, 2560] и [-1280, 1280] поверх
// базовой ликвидности, так что при движении цены пересекаются тики ±1280
// и ±2560.

use solana_program::pubkey::Pubkey;

use crate::config::WHIRLPOOL_PROGRAM_ID;
use crate::decoder::{encode_whirlpool, Whirlpool};
use crate::markets::tick_array::{encode_tick_array, TickArray, TickArraySequence};
use crate::markets::whirlpool::WhirlpoolPool;
use crate::pda::{swap_tick_array_start_indexes, tick_array_address};
use crate::rpc::InMemoryAccountSource;

pub(crate) const FIXTURE_LIQUIDITY: u128 = 1_000_000_000_000;

const FIXTURE_TICK_SPACING: u16 = 64;

const FIXTURE_TICKS: [(i32, i128); 4] = [
    (-2560, 500_000_000_000),
    (-1280, 500_000_000_000),
    (1280, -500_000_000_000),
    (2560, -500_000_000_000),
];

const FIXTURE_WINDOWS: [i32; 5] = [-11264, -5632, 0, 5632, 11264];

pub(crate) fn fixture_whirlpool() -> Whirlpool {
    Whirlpool {
        address: Pubkey::new_from_array([9; 32]),
        tick_spacing: FIXTURE_TICK_SPACING,
        fee_rate: 3000,
        liquidity: FIXTURE_LIQUIDITY,
        sqrt_price: 1 << 64,
        tick_current_index: 0,
        token_mint_a: Pubkey::new_from_array([1; 32]),
        token_vault_a: Pubkey::new_from_array([3; 32]),
        token_mint_b: Pubkey::new_from_array([2; 32]),
        token_vault_b: Pubkey::new_from_array([4; 32]),
        ..Default::default()
    }
}

fn fixture_tick_array(pool: &Pubkey, start_tick_index: i32) -> TickArray {
    let mut array = TickArray::empty(*pool, start_tick_index);
    for (tick_index, liquidity_net) in FIXTURE_TICKS {
        if array.contains(tick_index, FIXTURE_TICK_SPACING) {
            array.set_liquidity_net(tick_index, FIXTURE_TICK_SPACING, liquidity_net);
        }
    }
    array
}

// Три окна, которые своп из текущего тика прошел бы в направлении `a_to_b`
pub(crate) fn fixture_sequence(pool: &Whirlpool, a_to_b: bool) -> TickArraySequence {
    let arrays = swap_tick_array_start_indexes(pool.tick_current_index, pool.tick_spacing, a_to_b)
        .into_iter()
        .map(|start| fixture_tick_array(&pool.address, start))
        .collect();
    TickArraySequence::new(arrays, pool.tick_spacing).expect("fixture windows are contiguous")
}

pub(crate) fn fixture_pool() -> WhirlpoolPool {
    WhirlpoolPool::new(fixture_whirlpool())
}

// Аккаунт пула и пять окон вокруг тика 0
pub(crate) fn fixture_source() -> InMemoryAccountSource {
    let pool = fixture_whirlpool();
    let source = InMemoryAccountSource::new();
    source.insert_data(pool.address, WHIRLPOOL_PROGRAM_ID, encode_whirlpool(&pool));
    for start in FIXTURE_WINDOWS {
        let address = tick_array_address(&pool.address, start).expect("tick array address");
        source.insert_data(
            address,
            WHIRLPOOL_PROGRAM_ID,
            encode_tick_array(&fixture_tick_array(&pool.address, start)),
        );
    }
    source
}

mod tests {
    use super::*;
    use crate::data::TokenPair;
    use crate::rpc::{AccountFilter, AccountSource};
    use async_trait::async_trait;
    use solana_sdk::account::Account;
    use crate::decoder::WhirlpoolField;
    use crate::error::{Error, ValidationError};
    use crate::markets::orca::OrcaWhirlpoolProtocol;
    use crate::markets::Protocol;

    #[test]
    fn fixture_windows_carry_expected_ticks() {
        let pool = fixture_whirlpool();
        let down = fixture_sequence(&pool, true);
        let starts: Vec<i32> = down.arrays().iter().map(|array| array.start_tick_index).collect();
        assert_eq!(starts, vec![-11264, -5632, 0]);

        let (next, tick) = down.next_initialized_tick(0, true).unwrap();
        assert_eq!(next, -1280);
        assert_eq!(tick.map(|tick| tick.liquidity_net), Some(500_000_000_000));

        let up = fixture_sequence(&pool, false);
        let (next, tick) = up.next_initialized_tick(0, false).unwrap();
        assert_eq!(next, 1280);
        assert_eq!(tick.map(|tick| tick.liquidity_net), Some(-500_000_000_000));
    }

    #[tokio::test]
    async fn protocol_finds_pools_in_both_mint_orders() {
        let source = fixture_source();
        let state = fixture_whirlpool();

        // тот же рынок с минтами в обратном порядке
        let mut flipped = state.clone();
        flipped.address = Pubkey::new_from_array([8; 32]);
        std::mem::swap(&mut flipped.token_mint_a, &mut flipped.token_mint_b);
        source.insert_data(flipped.address, WHIRLPOOL_PROGRAM_ID, encode_whirlpool(&flipped));

        let protocol = OrcaWhirlpoolProtocol::default();
        let pair = TokenPair::new(state.token_mint_a, state.token_mint_b);
        let pools = protocol.fetch_pools_by_pair(&source, &pair).await.unwrap();
        let ids: Vec<Pubkey> = pools.iter().map(|pool| pool.id()).collect();
        assert_eq!(ids, vec![state.address, flipped.address]);

        let pools = protocol.fetch_pools_by_pair(&source, &pair.reversed()).await.unwrap();
        let ids: Vec<Pubkey> = pools.iter().map(|pool| pool.id()).collect();
        assert_eq!(ids, vec![flipped.address, state.address]);

        let unrelated = TokenPair::new(state.token_mint_a, Pubkey::new_unique());
        assert!(protocol.fetch_pools_by_pair(&source, &unrelated).await.unwrap().is_empty());
    }

    #[test]
    fn pair_filters_target_mint_offsets() {
        let pair = TokenPair::new(Pubkey::new_unique(), Pubkey::new_unique());
        let filters = OrcaWhirlpoolProtocol::pair_filters(&pair);
        assert_eq!(filters.len(), 4);
        assert!(filters.contains(&AccountFilter::DataSize(653)));
        assert!(filters.contains(&AccountFilter::Memcmp {
            offset: 101,
            bytes: pair.token_a.to_bytes().to_vec(),
        }));
        assert!(filters.contains(&AccountFilter::Memcmp {
            offset: WhirlpoolField::TokenMintB.offset(),
            bytes: pair.token_b.to_bytes().to_vec(),
        }));
    }

    // Отдает один аккаунт, прошедший фильтры, но с обрезанными данными
    struct TruncatedSource {
        inner: InMemoryAccountSource,
        broken: Pubkey,
    }

    #[async_trait]
    impl AccountSource for TruncatedSource {
        async fn fetch_account(&self, address: &Pubkey) -> crate::error::Result<Option<Account>> {
            self.inner.fetch_account(address).await
        }

        async fn fetch_multiple(&self, addresses: &[Pubkey]) -> crate::error::Result<Vec<Option<Account>>> {
            self.inner.fetch_multiple(addresses).await
        }

        async fn search_accounts(
            &self,
            program_id: &Pubkey,
            filters: &[AccountFilter],
        ) -> crate::error::Result<Vec<(Pubkey, Account)>> {
            let mut found = self.inner.search_accounts(program_id, filters).await?;
            let broken = Account {
                lamports: 1,
                data: vec![0; 40],
                owner: *program_id,
                executable: false,
                rent_epoch: 0,
            };
            found.insert(0, (self.broken, broken));
            Ok(found)
        }
    }

    #[tokio::test]
    async fn undecodable_accounts_are_skipped() {
        let source = TruncatedSource {
            inner: fixture_source(),
            broken: Pubkey::new_unique(),
        };
        let state = fixture_whirlpool();
        let pair = TokenPair::new(state.token_mint_a, state.token_mint_b);
        let pools = OrcaWhirlpoolProtocol::default()
            .fetch_pools_by_pair(&source, &pair)
            .await
            .unwrap();
        let ids: Vec<Pubkey> = pools.iter().map(|pool| pool.id()).collect();
        assert_eq!(ids, vec![state.address]);
    }

    #[tokio::test]
    async fn fetch_pool_by_id_decodes_or_reports_missing() {
        let source = fixture_source();
        let protocol = OrcaWhirlpoolProtocol::default();
        let state = fixture_whirlpool();

        let pool = protocol.fetch_pool_by_id(&source, &state.address).await.unwrap();
        assert_eq!(pool.tokens(), TokenPair::new(state.token_mint_a, state.token_mint_b));
        let quote = pool.quote(&source, &state.token_mint_b, 1_000_000).await.unwrap();
        assert_eq!(quote.amount_out, 996_999);
        assert_eq!(quote.tick_current_index, 0);

        let missing = Pubkey::new_unique();
        assert!(matches!(
            protocol.fetch_pool_by_id(&source, &missing).await,
            Err(Error::Validation(ValidationError::PoolNotFound(id))) if id == missing
        ));
    }
}
