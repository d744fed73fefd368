//! Roll dice and draw lottery numbers against the live service
//!
//! Usage: `RANDOM_ORG_API_KEY=... cargo run --example generate_integers`

use randrpc::{IntegerRequest, RandomClient, UuidRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,randrpc_client=debug".into()),
        )
        .init();

    let api_key = std::env::var("RANDOM_ORG_API_KEY")?;
    let client = RandomClient::new(api_key)?;

    let dice = client.generate_integers(IntegerRequest::new(6, 1, 6)).await?;
    if let Ok(error) = dice.error() {
        eprintln!("Server refused the request: {}", error);
        return Ok(());
    }
    println!("Dice: {:?}", dice.integers()?);

    let lottery = client
        .generate_integers(IntegerRequest::new(6, 1, 49).replacement(false).signed(true))
        .await?;
    println!("Lottery: {:?}", lottery.integers()?);

    // Signed replies can be checked by the service itself
    let authentic = client
        .verify_signature(lottery.random_object()?, lottery.signature()?)
        .await?;
    println!("Signature authentic: {}", authentic);
    println!("Hashed key: {}", client.hashed_api_key());

    let ids = client.generate_uuids(UuidRequest::new(2)).await?;
    for id in ids.uuids()? {
        println!("UUID: {}", id);
    }

    println!(
        "Bits left: {}, requests left: {}",
        ids.bits_left(),
        ids.requests_left()
    );
    Ok(())
}
