//! Thin wrapper around the OS keyring for the tracking-service token.

use crate::error::Result;

const SERVICE: &str = "taskwatch";
const API_TOKEN_KEY: &str = "api_token";

/// Environment variable that overrides the stored token.
pub const API_TOKEN_ENV: &str = "TASKWATCH_API_TOKEN";

pub fn get(key: &str) -> Result<Option<String>> {
    let entry = keyring::Entry::new(SERVICE, key)?;
    match entry.get_password() {
        Ok(pw) => Ok(Some(pw)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE, key)?;
    entry.set_password(value)?;
    Ok(())
}

pub fn delete(key: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE, key)?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Token from `TASKWATCH_API_TOKEN`, else from the keyring.
pub fn api_token() -> Result<Option<String>> {
    if let Some(token) = token_from_env(std::env::var(API_TOKEN_ENV).ok()) {
        return Ok(Some(token));
    }
    get(API_TOKEN_KEY)
}

pub fn store_api_token(token: &str) -> Result<()> {
    set(API_TOKEN_KEY, token.trim())
}

pub fn clear_api_token() -> Result<()> {
    delete(API_TOKEN_KEY)
}

fn token_from_env(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
