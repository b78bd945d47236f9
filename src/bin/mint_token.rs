//! Prints an access token signed with the configured JWT secret, for local
//! development against a running service.
//!
//! `mint-token [user-id]`; a fresh user id is generated when none is given.

use anyhow::Context;
use snapmeal::{auth::JwtKeys, config::AppConfig};
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let user_id = match std::env::args().nth(1) {
        Some(raw) => Uuid::parse_str(&raw).with_context(|| format!("invalid user id {raw:?}"))?,
        None => Uuid::new_v4(),
    };

    let token = JwtKeys::new(&config.jwt).sign_access(user_id)?;
    eprintln!("user_id: {user_id}");
    println!("{token}");
    Ok(())
}
