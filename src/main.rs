// src/main.rs

use std::sync::Arc;

use anyhow::Context;
use log::info;

use whirlroute::config;
use whirlroute::markets::orca::OrcaWhirlpoolProtocol;
use whirlroute::router::Router;
use whirlroute::rpc::RpcAccountSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализируем логгер
    env_logger::init();

    // Инициализируем конфигурацию
    let config = config::get_config();
    info!("Инициализация конфига выполнена");

    let source = Arc::new(RpcAccountSource::from_config(config));
    let router = Router::new(source.clone()).with_protocol(Arc::new(OrcaWhirlpoolProtocol::default()));

    info!(
        "Поиск лучшего пула: {} {} -> {}",
        config.amount_in, config.input_mint, config.output_mint
    );
    let best = router
        .get_best_pool(&config.input_mint, &config.output_mint, config.amount_in)
        .await
        .context("Не удалось выбрать пул")?;
    println!("{}", serde_json::to_string_pretty(&best)?);

    // Инструкции собираем только если задан кошелек
    if let Some(user) = config.user {
        let min_amount_out = config.min_amount_out(best.amount_out);
        let instructions = best
            .pool
            .build_swap_instructions(source.as_ref(), &user, &config.input_mint, config.amount_in, min_amount_out)
            .await
            .context("Не удалось собрать инструкции свопа")?;
        info!(
            "Собрано {} инструкций, минимальный выход {}",
            instructions.len(),
            min_amount_out
        );
        for instruction in &instructions {
            println!("{} ({} аккаунтов)", instruction.program_id, instruction.accounts.len());
        }
    }

    Ok(())
}
