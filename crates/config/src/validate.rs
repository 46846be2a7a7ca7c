use {anyhow::bail, secrecy::ExposeSecret, tracing::info};

use crate::schema::LansiteConfig;

const STEAM_API_KEY_LEN: usize = 32;

/// Checks that must pass before the server starts. Any error here is fatal.
pub fn validate_startup(config: &LansiteConfig) -> anyhow::Result<()> {
    let auth = &config.auth;
    if auth.login_with_code || auth.offline_mode {
        info!(
            login_with_code = auth.login_with_code,
            offline_mode = auth.offline_mode,
            "steam login disabled"
        );
        return Ok(());
    }

    let Some(key) = auth.steam_api_key.as_ref() else {
        bail!(
            "missing steam_api_key: add it under [auth] or enable offline_mode / login_with_code"
        );
    };
    let key = key.expose_secret();
    if key.len() != STEAM_API_KEY_LEN || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!(
            "invalid steam_api_key: expected {STEAM_API_KEY_LEN} alphanumeric characters, \
             or enable offline_mode / login_with_code"
        );
    }
    Ok(())
}
