//! Mint an access token for local testing.
//!
//! Usage: `JWT_SECRET=... cargo run --example mint_token -- <user-id> [expiry-seconds]`

use postboard_server::auth::jwt;
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let user_id: Uuid = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("Usage: mint_token <user-id> [expiry-seconds]"))?
        .parse()?;
    let expiry = args.next().map(|v| v.parse()).transpose()?.unwrap_or(3600);

    dotenvy::dotenv().ok();
    let secret = std::env::var("JWT_SECRET")?;

    println!("{}", jwt::generate_access_token(user_id, &secret, expiry)?);
    Ok(())
}
