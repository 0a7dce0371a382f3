use anyhow::Context;

/// Where we store secrets in the OS keyring.
///
/// Constant so upgrades don't orphan secrets.
const SERVICE: &str = "voicechat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKey {
    GenerationApiKey,
}

impl SecretKey {
    fn user(self) -> &'static str {
        match self {
            SecretKey::GenerationApiKey => "generation_api_key",
        }
    }
}

fn entry(key: SecretKey) -> anyhow::Result<keyring::Entry> {
    keyring::Entry::new(SERVICE, key.user()).context("create keyring entry")
}

fn get_secret(key: SecretKey) -> anyhow::Result<Option<String>> {
    let entry = entry(key)?;

    match entry.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(anyhow::Error::new(e)).context("get secret"),
    }
}

/// Saves the generation API key for later sessions. Surrounding whitespace
/// from a pasted key is dropped.
pub fn store_api_key(value: &str) -> anyhow::Result<()> {
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("refusing to store an empty API key");
    }
    entry(SecretKey::GenerationApiKey)?
        .set_password(value)
        .context("store API key")?;
    log::info!("API key stored in the keyring");
    Ok(())
}

/// Removing a key that was never stored is not an error.
pub fn forget_api_key() -> anyhow::Result<()> {
    match entry(SecretKey::GenerationApiKey)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)).context("delete API key"),
    }
}

/// Environment first, then the keyring. A keyring that cannot be reached
/// (headless Linux without a secret service) counts as "no key".
pub fn resolve_api_key(env_value: Option<String>) -> String {
    if let Some(v) = env_value.filter(|v| !v.trim().is_empty()) {
        return v;
    }
    match get_secret(SecretKey::GenerationApiKey) {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => {
            log::warn!("keyring unavailable: {e:#}");
            String::new()
        }
    }
}
