//! Create a bonus and a small batch against the configured API.
//!
//! Run with:
//! `BONUS_API_URL=https://sandbox.toloka.dev/api/v1 BONUS_API_TOKEN=... RUST_LOG=user_bonus_client=debug cargo run --example create_bonus -- <user_id>`

use anyhow::Context;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;
use user_bonus_client::{
    BonusClient, UserBonus, UserBonusCreateRequestParameters, UserBonusesCreateRequestParameters,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let user_id = std::env::args()
        .nth(1)
        .context("usage: create_bonus <user_id>")?;
    let client = BonusClient::from_env()?;

    let bonus = UserBonus::new(&user_id, Decimal::new(150, 2))
        .with_private_comment("demo")
        .with_public_title("EN", "Good Job!")
        .with_public_message("EN", "Ten tasks completed");
    let created = client
        .create_user_bonus(&bonus, UserBonusCreateRequestParameters::default())
        .await?;
    println!("created bonus {:?} for {}", created.id, created.user_id);

    let batch = vec![
        UserBonus::new(&user_id, Decimal::new(50, 2)).without_message(),
        UserBonus::new(&user_id, Decimal::ZERO),
    ];
    let result = client
        .create_user_bonuses(
            &batch,
            UserBonusesCreateRequestParameters::default().with_skip_invalid_items(true),
        )
        .await?;
    for (idx, bonus) in &result.items {
        println!("item {}: created {:?}", idx, bonus.id);
    }
    for (idx, error) in &result.validation_errors {
        println!("item {}: rejected {}", idx, error);
    }

    Ok(())
}
