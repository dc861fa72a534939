//! Token helpers

use bech32::Bech32m;
use uuid7::uuid7;

pub const TOKEN_HRP: &str = "token";

// time-ordered random id, bech32m encoded under `hrp`
pub fn new_token(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encoded = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encoded)
}

pub fn new_confirmation_token() -> anyhow::Result<String> {
    new_token(TOKEN_HRP)
}
